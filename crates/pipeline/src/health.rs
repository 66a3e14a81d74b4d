use std::sync::atomic::{AtomicU64, Ordering};

/// A sink's lock-free health surface (spec §4.1): counted failures that are
/// never raised to producers. Readers use a relaxed load; no stronger
/// synchronization is promised or required.
#[derive(Debug, Default)]
pub struct Health {
    dropped: AtomicU64,
    failed: AtomicU64,
    lost_on_shutdown: AtomicU64,
}

impl Health {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_lost_on_shutdown(&self, count: u64) {
        self.lost_on_shutdown.fetch_add(count, Ordering::Relaxed);
    }

    /// Records dropped because the queue was full (or a block-with-deadline
    /// submit timed out).
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Serializer or writer failures observed by the consumer.
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Records still queued when the shutdown deadline elapsed.
    #[must_use]
    pub fn lost_on_shutdown(&self) -> u64 {
        self.lost_on_shutdown.load(Ordering::Relaxed)
    }
}
