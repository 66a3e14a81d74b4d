use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};

use parking_lot::RwLock;
use tracelog_filter::Filter;
use tracelog_pipeline::Diagnostics;
use tracelog_record::{ExceptionInfo, Record, Severity, SourceLocation, Value};
use tracelog_sink::Sink;

/// Error building a [`Logger`].
#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    #[error("invalid logger configuration: {reason}")]
    InvalidConfig { reason: String },
}

/// Point-in-time counters for one [`Logger`] (carried over from the
/// originating system's per-logger metrics; §4.1 only names the three
/// pipeline-level health counters, this adds the emit-path equivalents).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoggerMetrics {
    pub emitted: u64,
    pub filtered: u64,
    pub below_threshold: u64,
}

#[derive(Default)]
struct Counters {
    emitted: AtomicU64,
    filtered: AtomicU64,
    below_threshold: AtomicU64,
}

/// A named logger: threshold, attached sinks, filter chain, and the
/// auto-trace-injection flag (spec §3, §4.6).
pub struct Logger {
    name: String,
    threshold: AtomicU8,
    auto_trace: AtomicBool,
    sinks: RwLock<Vec<std::sync::Arc<dyn Sink>>>,
    filters: RwLock<Vec<Box<dyn Filter>>>,
    diagnostics: Diagnostics,
    counters: Counters,
}

/// Builder for [`Logger`]. Obtain via [`Logger::builder`].
pub struct LoggerBuilder {
    name: String,
    threshold: Severity,
    auto_trace: bool,
    sinks: Vec<std::sync::Arc<dyn Sink>>,
    filters: Vec<Box<dyn Filter>>,
}

impl std::fmt::Debug for LoggerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerBuilder")
            .field("name", &self.name)
            .field("threshold", &self.threshold)
            .field("auto_trace", &self.auto_trace)
            .field("sinks", &self.sinks.len())
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl Logger {
    #[must_use]
    pub fn builder(name: impl Into<String>) -> LoggerBuilder {
        LoggerBuilder {
            name: name.into(),
            threshold: Severity::Info,
            auto_trace: true,
            sinks: Vec::new(),
            filters: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_threshold(&self, threshold: Severity) {
        self.threshold.store(threshold as u8, Ordering::Relaxed);
    }

    #[must_use]
    pub fn threshold(&self) -> Severity {
        match self.threshold.load(Ordering::Relaxed) {
            0 => Severity::Debug,
            1 => Severity::Info,
            2 => Severity::Warning,
            3 => Severity::Error,
            _ => Severity::Critical,
        }
    }

    pub fn attach_sink(&self, sink: std::sync::Arc<dyn Sink>) {
        self.sinks.write().push(sink);
    }

    pub fn add_filter(&self, filter: Box<dyn Filter>) {
        self.filters.write().push(filter);
    }

    /// A snapshot of this logger's emit-path counters (spec's carried-over
    /// `metrics.py` feature). Lock-free, same as [`tracelog_pipeline::Health`].
    #[must_use]
    pub fn metrics(&self) -> LoggerMetrics {
        LoggerMetrics {
            emitted: self.counters.emitted.load(Ordering::Relaxed),
            filtered: self.counters.filtered.load(Ordering::Relaxed),
            below_threshold: self.counters.below_threshold.load(Ordering::Relaxed),
        }
    }

    /// The emit pipeline (spec §4.6): threshold check, record construction,
    /// trace injection, filter chain, then fan-out to every attached sink
    /// whose own threshold admits the record. Never panics or propagates --
    /// failures anywhere in steps 3-6 are reported to the fallback
    /// diagnostic channel instead.
    #[track_caller]
    pub fn log(&self, severity: Severity, message: impl Into<String>, fields: &[(&str, Value)]) {
        if !severity.admits(self.threshold()) {
            self.counters.below_threshold.fetch_add(1, Ordering::Relaxed);
            return;
        }
        let message = message.into();
        let location = *panic::Location::caller();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.emit(severity, message, fields, None, Some(location));
        }));
        if result.is_err() {
            self.diagnostics.report("emit-panic", &format!("logger {:?}: emit pipeline panicked", self.name));
        }
    }

    /// Like [`Logger::log`], attaching an [`ExceptionInfo`].
    #[track_caller]
    pub fn log_exception(
        &self,
        severity: Severity,
        message: impl Into<String>,
        exception: ExceptionInfo,
        fields: &[(&str, Value)],
    ) {
        if !severity.admits(self.threshold()) {
            self.counters.below_threshold.fetch_add(1, Ordering::Relaxed);
            return;
        }
        let message = message.into();
        let location = *panic::Location::caller();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.emit(severity, message, fields, Some(exception), Some(location));
        }));
        if result.is_err() {
            self.diagnostics.report("emit-panic", &format!("logger {:?}: emit pipeline panicked", self.name));
        }
    }

    fn emit(
        &self,
        severity: Severity,
        message: String,
        fields: &[(&str, Value)],
        exception: Option<ExceptionInfo>,
        location: Option<std::panic::Location<'_>>,
    ) {
        let mut record = Record::new(severity, &self.name, message);
        if let Some(loc) = location {
            record = record.with_location(SourceLocation::new(loc.file().to_owned(), loc.line()));
        }
        if let Some(exc) = exception {
            record = record.with_exception(exc);
        }
        for (key, value) in fields {
            record = record.with_field((*key).to_owned(), value.clone());
        }
        if self.auto_trace.load(Ordering::Relaxed) {
            if let Some(trace) = tracelog_trace::current() {
                record = record.with_trace(trace);
            }
        }

        for filter in self.filters.read().iter() {
            let kept = panic::catch_unwind(AssertUnwindSafe(|| filter.apply(&mut record))).unwrap_or(true);
            if !kept {
                self.counters.filtered.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }

        for sink in self.sinks.read().iter() {
            sink.submit(record.clone());
        }
        self.counters.emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(Severity::Debug, message, &[]);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(Severity::Info, message, &[]);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(Severity::Warning, message, &[]);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(Severity::Error, message, &[]);
    }

    pub fn critical(&self, message: impl Into<String>) {
        self.log(Severity::Critical, message, &[]);
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("threshold", &self.threshold())
            .field("sinks", &self.sinks.read().len())
            .finish_non_exhaustive()
    }
}

impl LoggerBuilder {
    #[must_use]
    pub fn threshold(mut self, threshold: Severity) -> Self {
        self.threshold = threshold;
        self
    }

    #[must_use]
    pub fn auto_trace(mut self, enabled: bool) -> Self {
        self.auto_trace = enabled;
        self
    }

    #[must_use]
    pub fn sink(mut self, sink: std::sync::Arc<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Box<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// # Errors
    ///
    /// Returns [`LoggerError::InvalidConfig`] if `name` is empty.
    pub fn build(self) -> Result<Logger, LoggerError> {
        if self.name.trim().is_empty() {
            return Err(LoggerError::InvalidConfig { reason: "logger name must not be empty".to_owned() });
        }
        Ok(Logger {
            name: self.name,
            threshold: AtomicU8::new(self.threshold as u8),
            auto_trace: AtomicBool::new(self.auto_trace),
            sinks: RwLock::new(self.sinks),
            filters: RwLock::new(self.filters),
            diagnostics: Diagnostics::new(),
            counters: Counters::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use tracelog_pipeline::{Health, ShutdownReport};

    struct CountingSink {
        count: AtomicUsize,
        health: Health,
    }

    impl Sink for CountingSink {
        fn submit(&self, _record: Record) -> bool {
            self.count.fetch_add(1, Ordering::SeqCst);
            true
        }
        fn flush(&self) {}
        fn close(&self) -> ShutdownReport {
            ShutdownReport { already_shut_down: false, timed_out: false }
        }
        fn set_threshold(&self, _threshold: Severity) {}
        fn set_serializer(&self, _serializer: Box<dyn tracelog_serialize::Serializer>) {}
        fn health(&self) -> &Health {
            &self.health
        }
    }

    #[test]
    fn below_threshold_records_never_reach_sinks() {
        let sink = Arc::new(CountingSink { count: AtomicUsize::new(0), health: Health::new() });
        let logger = Logger::builder("svc")
            .threshold(Severity::Warning)
            .sink(Arc::clone(&sink))
            .build()
            .unwrap();
        logger.debug("ignored");
        logger.info("also ignored");
        assert_eq!(sink.count.load(Ordering::SeqCst), 0);
        logger.warning("counted");
        assert_eq!(sink.count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn metrics_track_emitted_filtered_and_below_threshold() {
        struct DropAll;
        impl Filter for DropAll {
            fn apply(&self, _record: &mut Record) -> bool {
                false
            }
        }
        let sink = Arc::new(CountingSink { count: AtomicUsize::new(0), health: Health::new() });
        let logger = Logger::builder("svc")
            .threshold(Severity::Warning)
            .sink(Arc::clone(&sink))
            .build()
            .unwrap();
        logger.debug("below threshold");
        logger.warning("emitted");
        logger.add_filter(Box::new(DropAll));
        logger.warning("now filtered");

        let metrics = logger.metrics();
        assert_eq!(metrics.below_threshold, 1);
        assert_eq!(metrics.emitted, 1);
        assert_eq!(metrics.filtered, 1);
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(Logger::builder("  ").build().is_err());
    }

    #[test]
    fn record_reaches_every_attached_sink() {
        let a = Arc::new(CountingSink { count: AtomicUsize::new(0), health: Health::new() });
        let b = Arc::new(CountingSink { count: AtomicUsize::new(0), health: Health::new() });
        let logger = Logger::builder("svc").sink(Arc::clone(&a)).sink(Arc::clone(&b)).build().unwrap();
        logger.info("hi");
        assert_eq!(a.count.load(Ordering::SeqCst), 1);
        assert_eq!(b.count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn predicate_filter_can_drop_a_record() {
        struct DropAll;
        impl Filter for DropAll {
            fn apply(&self, _record: &mut Record) -> bool {
                false
            }
        }
        let sink = Arc::new(CountingSink { count: AtomicUsize::new(0), health: Health::new() });
        let logger =
            Logger::builder("svc").sink(Arc::clone(&sink)).filter(Box::new(DropAll)).build().unwrap();
        logger.info("dropped by filter");
        assert_eq!(sink.count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_filter_defaults_to_keep() {
        struct PanickingFilter;
        impl Filter for PanickingFilter {
            fn apply(&self, _record: &mut Record) -> bool {
                panic!("boom");
            }
        }
        let sink = Arc::new(CountingSink { count: AtomicUsize::new(0), health: Health::new() });
        let logger = Logger::builder("svc")
            .sink(Arc::clone(&sink))
            .filter(Box::new(PanickingFilter))
            .build()
            .unwrap();
        logger.info("survives panicking filter");
        assert_eq!(sink.count.load(Ordering::SeqCst), 1);
    }
}
