use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// The library's own internal diagnostic channel (spec §4.1/§7): this crate
/// cannot depend on a general-purpose logging facade -- it *is* one -- so
/// its own failures are written to stderr, rate-limited to once per distinct
/// message per minute.
pub struct Diagnostics {
    last_seen: Mutex<HashMap<String, Instant>>,
    window: Duration,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self { last_seen: Mutex::new(HashMap::new()), window: Duration::from_secs(60) }
    }
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `message` to stderr unless an identical signature was already
    /// written within the trailing window.
    pub fn report(&self, signature: &str, message: &str) {
        let now = Instant::now();
        let mut seen = self.last_seen.lock();
        let should_emit = match seen.get(signature) {
            Some(&last) => now.duration_since(last) >= self.window,
            None => true,
        };
        if should_emit {
            seen.insert(signature.to_owned(), now);
            eprintln!("tracelog: {message}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_signature_is_suppressed_within_window() {
        let diagnostics = Diagnostics { last_seen: Mutex::new(HashMap::new()), window: Duration::from_secs(60) };
        diagnostics.report("io-error", "first");
        let before = diagnostics.last_seen.lock().get("io-error").copied();
        diagnostics.report("io-error", "second");
        let after = diagnostics.last_seen.lock().get("io-error").copied();
        assert_eq!(before, after);
    }

    #[test]
    fn distinct_signatures_both_emit() {
        let diagnostics = Diagnostics::new();
        diagnostics.report("a", "first");
        diagnostics.report("b", "second");
        assert_eq!(diagnostics.last_seen.lock().len(), 2);
    }

    #[test]
    fn expired_window_allows_a_fresh_emission() {
        let diagnostics = Diagnostics { last_seen: Mutex::new(HashMap::new()), window: Duration::from_millis(10) };
        diagnostics.report("x", "first");
        std::thread::sleep(Duration::from_millis(20));
        let before = diagnostics.last_seen.lock().get("x").copied().unwrap();
        diagnostics.report("x", "second");
        let after = diagnostics.last_seen.lock().get("x").copied().unwrap();
        assert!(after > before);
    }
}
