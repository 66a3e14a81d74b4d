use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracelog_trace::TraceContext;

use crate::severity::Severity;
use crate::value::Value;

/// Where a log call originated, captured via `#[track_caller]` at the call
/// site (spec §3: `SourceLocation`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub function: Option<String>,
}

impl SourceLocation {
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self { file: file.into(), line, function: None }
    }

    #[must_use]
    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }
}

/// A captured exception/error, flattened to its three display-stable parts
/// (spec §3: `ExceptionInfo`). `traceback` is whatever chain-of-causes text
/// the caller wants attached; it is never reconstructed by this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionInfo {
    pub type_name: String,
    pub message: String,
    pub traceback: Option<String>,
}

impl ExceptionInfo {
    #[must_use]
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { type_name: type_name.into(), message: message.into(), traceback: None }
    }

    #[must_use]
    pub fn with_traceback(mut self, traceback: impl Into<String>) -> Self {
        self.traceback = Some(traceback.into());
        self
    }

    /// Build from any `std::error::Error`, walking `source()` into `traceback`.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let type_name = std::any::type_name_of_val(err).to_owned();
        let message = err.to_string();
        let mut traceback = String::new();
        let mut source = err.source();
        while let Some(cause) = source {
            traceback.push_str("caused by: ");
            traceback.push_str(&cause.to_string());
            traceback.push('\n');
            source = cause.source();
        }
        let traceback = if traceback.is_empty() { None } else { Some(traceback) };
        Self { type_name, message, traceback }
    }
}

/// One structured log event (spec §3: `Record`).
///
/// `created_at` is a monotonic instant used for latency-sensitive comparisons
/// within the process (e.g. pipeline queue age); `timestamp` is the wall-clock
/// UTC moment recorded in serialized output.
#[derive(Debug, Clone)]
pub struct Record {
    pub created_at: Instant,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub logger_name: String,
    pub message: String,
    pub location: Option<SourceLocation>,
    pub exception: Option<ExceptionInfo>,
    pub fields: BTreeMap<String, Value>,
    pub trace: Option<TraceContext>,
}

impl Record {
    #[must_use]
    pub fn new(severity: Severity, logger_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            created_at: Instant::now(),
            timestamp: Utc::now(),
            severity,
            logger_name: logger_name.into(),
            message: message.into(),
            location: None,
            exception: None,
            fields: BTreeMap::new(),
            trace: None,
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    #[must_use]
    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }

    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = (String, Value)>) -> Self {
        self.fields.extend(fields);
        self
    }

    #[must_use]
    pub fn with_trace(mut self, trace: TraceContext) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Age of this record relative to now, using the monotonic clock.
    #[must_use]
    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Inner;
    impl std::fmt::Display for Inner {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "inner failure")
        }
    }
    impl std::error::Error for Inner {}

    #[derive(Debug)]
    struct Outer(Inner);
    impl std::fmt::Display for Outer {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "outer failure")
        }
    }
    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn builder_sets_all_optional_parts() {
        let record = Record::new(Severity::Error, "svc.orders", "payment failed")
            .with_location(SourceLocation::new("orders.rs", 42))
            .with_field("order_id", 7)
            .with_trace(TraceContext::root());

        assert_eq!(record.severity, Severity::Error);
        assert_eq!(record.logger_name, "svc.orders");
        assert!(record.location.is_some());
        assert_eq!(record.fields.get("order_id"), Some(&Value::Int(7)));
        assert!(record.trace.is_some());
    }

    #[test]
    fn exception_from_error_walks_source_chain() {
        let err = Outer(Inner);
        let info = ExceptionInfo::from_error(&err);
        assert_eq!(info.message, "outer failure");
        assert!(info.traceback.unwrap().contains("inner failure"));
    }

    #[test]
    fn exception_from_error_without_source_has_no_traceback() {
        let info = ExceptionInfo::from_error(&Inner);
        assert!(info.traceback.is_none());
    }

    #[test]
    fn age_is_non_negative_and_grows() {
        let record = Record::new(Severity::Info, "svc", "hello");
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(record.age() >= std::time::Duration::from_millis(5));
    }
}
