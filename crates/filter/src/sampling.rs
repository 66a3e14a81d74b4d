use std::cell::RefCell;
use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng as _};
use tracelog_record::{Record, Severity};

use crate::Filter;

/// Predicate: keeps a record with probability equal to its effective
/// pass-rate. A uniform variate in `[0, 1)` is drawn per record and the
/// record is kept iff the variate is less than the rate (spec §4.5).
///
/// Interior mutability is required because [`Filter::apply`] takes `&self`;
/// mirrors the RNG-holding components elsewhere in this workspace.
pub struct SamplingFilter {
    default_rate: f64,
    overrides: HashMap<Severity, f64>,
    rng: RefCell<StdRng>,
}

impl SamplingFilter {
    /// `default_rate` is clamped to `[0, 1]`.
    #[must_use]
    pub fn new(default_rate: f64) -> Self {
        Self {
            default_rate: default_rate.clamp(0.0, 1.0),
            overrides: HashMap::new(),
            rng: RefCell::new(StdRng::from_os_rng()),
        }
    }

    #[must_use]
    pub fn with_override(mut self, severity: Severity, rate: f64) -> Self {
        self.overrides.insert(severity, rate.clamp(0.0, 1.0));
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = RefCell::new(StdRng::seed_from_u64(seed));
        self
    }

    fn effective_rate(&self, severity: Severity) -> f64 {
        self.overrides.get(&severity).copied().unwrap_or(self.default_rate)
    }
}

impl Filter for SamplingFilter {
    fn apply(&self, record: &mut Record) -> bool {
        let rate = self.effective_rate(record.severity);
        if rate >= 1.0 {
            return true;
        }
        if rate <= 0.0 {
            return false;
        }
        let variate: f64 = self.rng.borrow_mut().random();
        variate < rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_one_always_keeps() {
        let filter = SamplingFilter::new(1.0).with_seed(1);
        let mut record = Record::new(Severity::Debug, "svc", "hi");
        for _ in 0..100 {
            assert!(filter.apply(&mut record));
        }
    }

    #[test]
    fn rate_zero_always_drops() {
        let filter = SamplingFilter::new(0.0).with_seed(1);
        let mut record = Record::new(Severity::Debug, "svc", "hi");
        for _ in 0..100 {
            assert!(!filter.apply(&mut record));
        }
    }

    #[test]
    fn severity_override_takes_precedence_over_default() {
        let filter = SamplingFilter::new(0.0).with_override(Severity::Error, 1.0).with_seed(1);
        let mut info = Record::new(Severity::Info, "svc", "hi");
        let mut error = Record::new(Severity::Error, "svc", "hi");
        assert!(!filter.apply(&mut info));
        assert!(filter.apply(&mut error));
    }

    #[test]
    fn mid_rate_produces_a_mix_over_many_draws() {
        let filter = SamplingFilter::new(0.5).with_seed(42);
        let mut record = Record::new(Severity::Debug, "svc", "hi");
        let kept = (0..10_000).filter(|_| filter.apply(&mut record)).count();
        assert!((4_000..6_000).contains(&kept), "kept={kept}");
    }
}
