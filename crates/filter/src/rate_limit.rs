use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use tracelog_record::Record;

use crate::Filter;

type KeyFn = Box<dyn Fn(&Record) -> String + Send + Sync>;

const DEFAULT_KEY_TABLE_CAP: usize = 4096;

/// Predicate: keeps a record iff its key's hit count within the trailing
/// `window` is below `max_per_window` (spec §4.5). The per-key table is
/// LRU-bounded so an unbounded set of distinct keys cannot grow memory
/// without limit; eviction drops the oldest-used key's whole window.
pub struct RateLimitFilter {
    max_per_window: usize,
    window: Duration,
    key_fn: KeyFn,
    table: Mutex<LruCache<String, VecDeque<Instant>>>,
}

impl RateLimitFilter {
    #[must_use]
    pub fn new(
        max_per_window: usize,
        window: Duration,
        key_fn: impl Fn(&Record) -> String + Send + Sync + 'static,
    ) -> Self {
        Self::with_table_capacity(max_per_window, window, key_fn, DEFAULT_KEY_TABLE_CAP)
    }

    #[must_use]
    pub fn with_table_capacity(
        max_per_window: usize,
        window: Duration,
        key_fn: impl Fn(&Record) -> String + Send + Sync + 'static,
        table_capacity: usize,
    ) -> Self {
        let cap = NonZeroUsize::new(table_capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            max_per_window,
            window,
            key_fn: Box::new(key_fn),
            table: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Rate-limit by the record's `(severity, message)` pair -- the
    /// repeated-identical-log-line default.
    #[must_use]
    pub fn by_message(max_per_window: usize, window: Duration) -> Self {
        Self::new(max_per_window, window, |record: &Record| {
            format!("{}:{}", record.severity, record.message)
        })
    }
}

impl Filter for RateLimitFilter {
    fn apply(&self, record: &mut Record) -> bool {
        let key = (self.key_fn)(record);
        let now = Instant::now();
        let mut table = self.table.lock();
        let deque = table.get_or_insert_mut(key, VecDeque::new);
        while let Some(&front) = deque.front() {
            if now.duration_since(front) > self.window {
                deque.pop_front();
            } else {
                break;
            }
        }
        if deque.len() < self.max_per_window {
            deque.push_back(now);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracelog_record::Severity;

    #[test]
    fn admits_up_to_the_limit_then_drops() {
        let filter = RateLimitFilter::by_message(2, Duration::from_secs(60));
        let mut record = Record::new(Severity::Warning, "svc", "retrying");
        assert!(filter.apply(&mut record));
        assert!(filter.apply(&mut record));
        assert!(!filter.apply(&mut record));
    }

    #[test]
    fn distinct_keys_have_independent_windows() {
        let filter = RateLimitFilter::by_message(1, Duration::from_secs(60));
        let mut a = Record::new(Severity::Warning, "svc", "a");
        let mut b = Record::new(Severity::Warning, "svc", "b");
        assert!(filter.apply(&mut a));
        assert!(filter.apply(&mut b));
        assert!(!filter.apply(&mut a));
    }

    #[test]
    fn window_expiry_admits_again() {
        let filter = RateLimitFilter::by_message(1, Duration::from_millis(20));
        let mut record = Record::new(Severity::Warning, "svc", "retrying");
        assert!(filter.apply(&mut record));
        assert!(!filter.apply(&mut record));
        std::thread::sleep(Duration::from_millis(30));
        assert!(filter.apply(&mut record));
    }

    #[test]
    fn small_table_capacity_evicts_lru_key() {
        let filter = RateLimitFilter::with_table_capacity(1, Duration::from_secs(60), |r: &Record| r.message.clone(), 1);
        let mut a = Record::new(Severity::Warning, "svc", "a");
        let mut b = Record::new(Severity::Warning, "svc", "b");
        assert!(filter.apply(&mut a));
        assert!(filter.apply(&mut b));
        // "a"'s window was evicted when "b" pushed the table past capacity 1.
        assert!(filter.apply(&mut a));
    }
}
