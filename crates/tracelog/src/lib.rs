//! Structured, trace-aware logging for Rust service processes.
//!
//! This crate is the single-import facade over the six subsidiary crates
//! that make up the library: record/value model, distributed trace
//! context, serializers, filters, the async pipeline, and concrete sinks.
//! Most applications only need [`Logger`] and a handful of sink
//! constructors; the subsidiary crates remain directly usable for callers
//! who want to assemble their own pipeline.

mod logger;
mod registry;

pub use logger::{Logger, LoggerBuilder, LoggerError, LoggerMetrics};
pub use registry::LoggerRegistry;

pub use tracelog_filter::{Filter, RateLimitFilter, RedactError, RedactFilter, SamplingFilter};
pub use tracelog_pipeline::{
    Diagnostics, Health, OverflowPolicy, Pipeline, PipelineConfig, PipelineConfigBuilder,
    PipelineConfigError, ShutdownReport, Writer,
};
pub use tracelog_record::{ExceptionInfo, ParseSeverityError, Record, Severity, SourceLocation, Value};
pub use tracelog_serialize::{
    CompactSerializer, JsonSerializer, PrettySerializer, Serializer, TimestampFormat, RESERVED_KEYS,
};
pub use tracelog_sink::{
    ConsoleSink, ConsoleSinkConfig, ConsoleStream, RotatingFileConfig, RotatingFileConfigError,
    RotatingFileSink, Sink,
};
pub use tracelog_trace::{
    current, scoped, with_task_scope, Carrier, Scope, ScopeInputs, TraceContext, HEADER_CORRELATION_ID,
    HEADER_PARENT_SPAN_ID, HEADER_SESSION_ID, HEADER_SPAN_ID, HEADER_TRACE_ID,
};

use std::sync::Arc;

impl Logger {
    /// A logger with a single stdout/stderr-split console sink attached,
    /// registered with the global registry. Returns the logger and the sink
    /// so the caller can flush/close it explicitly, or rely on
    /// [`LoggerRegistry::shutdown_on_ctrl_c`].
    #[must_use]
    pub fn console_only(name: impl Into<String>, threshold: Severity) -> (Arc<Logger>, Vec<Arc<dyn Sink>>) {
        let sink: Arc<dyn Sink> =
            Arc::new(ConsoleSink::new(ConsoleSinkConfig { threshold, ..ConsoleSinkConfig::default() }));
        let logger = Arc::new(
            Logger::builder(name)
                .threshold(threshold)
                .sink(Arc::clone(&sink))
                .build()
                .expect("non-empty logger name"),
        );
        let registry = LoggerRegistry::global();
        registry.register_logger(Arc::clone(&logger));
        registry.register_sink(&sink);
        (logger, vec![sink])
    }

    /// A logger with a single rotating-file sink attached.
    ///
    /// # Errors
    ///
    /// Returns [`RotatingFileConfigError`] if the log file cannot be opened.
    pub fn file_only(
        name: impl Into<String>,
        config: RotatingFileConfig,
    ) -> Result<(Arc<Logger>, Vec<Arc<dyn Sink>>), RotatingFileConfigError> {
        let threshold = config.threshold;
        let sink: Arc<dyn Sink> = Arc::new(RotatingFileSink::open(config)?);
        let logger = Arc::new(
            Logger::builder(name)
                .threshold(threshold)
                .sink(Arc::clone(&sink))
                .build()
                .expect("non-empty logger name"),
        );
        let registry = LoggerRegistry::global();
        registry.register_logger(Arc::clone(&logger));
        registry.register_sink(&sink);
        Ok((logger, vec![sink]))
    }

    /// A logger with both a console sink and a rotating-file sink attached.
    ///
    /// # Errors
    ///
    /// Returns [`RotatingFileConfigError`] if the log file cannot be opened.
    pub fn dual(
        name: impl Into<String>,
        threshold: Severity,
        file_config: RotatingFileConfig,
    ) -> Result<(Arc<Logger>, Vec<Arc<dyn Sink>>), RotatingFileConfigError> {
        let name = name.into();
        let console: Arc<dyn Sink> =
            Arc::new(ConsoleSink::new(ConsoleSinkConfig { threshold, ..ConsoleSinkConfig::default() }));
        let file: Arc<dyn Sink> = Arc::new(RotatingFileSink::open(file_config)?);
        let logger = Arc::new(
            Logger::builder(name)
                .threshold(threshold)
                .sink(Arc::clone(&console))
                .sink(Arc::clone(&file))
                .build()
                .expect("non-empty logger name"),
        );
        let registry = LoggerRegistry::global();
        registry.register_logger(Arc::clone(&logger));
        registry.register_sink(&console);
        registry.register_sink(&file);
        Ok((logger, vec![console, file]))
    }
}
