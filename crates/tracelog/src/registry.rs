use std::collections::HashMap;
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::{Mutex, RwLock};
use tracelog_sink::Sink;

use crate::Logger;

/// Process-wide registry of named loggers and the sinks they've attached,
/// used for global shutdown at process exit (spec §4.6, §9).
///
/// The spec's originating runtime hooks sink cleanup to interpreter exit via
/// weak references so a live sink never keeps the process alive on its own.
/// The natural substitute in a standalone Rust binary is an explicit,
/// awaited shutdown trigger; [`shutdown_on_ctrl_c`] wires that trigger to
/// Ctrl-C, and the weak references still ensure a sink that has already been
/// dropped by its owner is simply skipped rather than resurrected.
pub struct LoggerRegistry {
    loggers: RwLock<HashMap<String, Arc<Logger>>>,
    sinks: Mutex<Vec<Weak<dyn Sink>>>,
}

impl std::fmt::Debug for LoggerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerRegistry")
            .field("loggers", &self.loggers.read().len())
            .field("sinks", &self.sinks.lock().len())
            .finish()
    }
}

impl Default for LoggerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self { loggers: RwLock::new(HashMap::new()), sinks: Mutex::new(Vec::new()) }
    }

    /// The process-wide singleton registry.
    pub fn global() -> &'static Arc<LoggerRegistry> {
        static GLOBAL: OnceLock<Arc<LoggerRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(LoggerRegistry::new()))
    }

    pub fn register_logger(&self, logger: Arc<Logger>) {
        self.loggers.write().insert(logger.name().to_owned(), logger);
    }

    #[must_use]
    pub fn logger(&self, name: &str) -> Option<Arc<Logger>> {
        self.loggers.read().get(name).cloned()
    }

    pub fn register_sink(&self, sink: &Arc<dyn Sink>) {
        let mut sinks = self.sinks.lock();
        sinks.retain(|weak| weak.strong_count() > 0);
        sinks.push(Arc::downgrade(sink));
    }

    /// Flush and close every still-live registered sink. Safe to call more
    /// than once; sinks whose owner already dropped them are skipped.
    pub fn shutdown_all(&self) {
        let sinks: Vec<Arc<dyn Sink>> =
            self.sinks.lock().iter().filter_map(Weak::upgrade).collect();
        for sink in sinks {
            sink.flush();
            sink.close();
        }
    }

    /// Waits for Ctrl-C, then flushes and closes every registered sink.
    /// Intended to be spawned as a background task in binaries that embed
    /// this crate (the idiomatic-Rust counterpart to the originating
    /// runtime's weak-reference exit hook).
    pub async fn shutdown_on_ctrl_c(self: &Arc<Self>) {
        if tokio::signal::ctrl_c().await.is_ok() {
            self.shutdown_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracelog_pipeline::{Health, ShutdownReport};
    use tracelog_record::{Record, Severity};

    struct CountingSink {
        closed: AtomicUsize,
        health: Health,
    }

    impl Sink for CountingSink {
        fn submit(&self, _record: Record) -> bool {
            true
        }
        fn flush(&self) {}
        fn close(&self) -> ShutdownReport {
            self.closed.fetch_add(1, Ordering::SeqCst);
            ShutdownReport { already_shut_down: false, timed_out: false }
        }
        fn set_threshold(&self, _threshold: Severity) {}
        fn set_serializer(&self, _serializer: Box<dyn tracelog_serialize::Serializer>) {}
        fn health(&self) -> &Health {
            &self.health
        }
    }

    #[test]
    fn shutdown_all_closes_live_sinks() {
        let registry = LoggerRegistry::new();
        let concrete = Arc::new(CountingSink { closed: AtomicUsize::new(0), health: Health::new() });
        let sink: Arc<dyn Sink> = Arc::clone(&concrete) as Arc<dyn Sink>;
        registry.register_sink(&sink);
        drop(sink);
        registry.shutdown_all();
        assert_eq!(concrete.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropped_sink_is_skipped_on_shutdown() {
        let registry = LoggerRegistry::new();
        {
            let sink: Arc<dyn Sink> =
                Arc::new(CountingSink { closed: AtomicUsize::new(0), health: Health::new() });
            registry.register_sink(&sink);
        }
        registry.shutdown_all();
        assert_eq!(registry.sinks.lock().iter().filter(|w| w.strong_count() > 0).count(), 0);
    }

    #[test]
    fn logger_lookup_round_trips_by_name() {
        let registry = LoggerRegistry::new();
        let logger = Arc::new(Logger::builder("svc").build().unwrap());
        registry.register_logger(Arc::clone(&logger));
        assert!(registry.logger("svc").is_some());
        assert!(registry.logger("missing").is_none());
    }
}
