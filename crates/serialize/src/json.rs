use chrono::SecondsFormat;
use serde_json::{Map, Value as Json};
use tracelog_record::Record;

use crate::{resolve_service, Serializer, RESERVED_KEYS};

/// How [`JsonSerializer`] renders `Record::timestamp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampFormat {
    /// ISO 8601 with microsecond precision and a trailing `Z` (default).
    #[default]
    Iso8601,
    /// Unix seconds, rendered as a JSON string to avoid floating-point drift.
    UnixSeconds,
}

/// One JSON object per record, newline-delimited when written by a sink.
///
/// Schema: see spec §4.4. Never fails -- unrepresentable field values degrade
/// to their `Display` string via [`tracelog_record::Value::from_display`]
/// upstream, and non-finite floats degrade again at the `serde_json`
/// boundary (see `tracelog_record::Value`'s `From` impl).
#[derive(Debug, Clone, Default)]
pub struct JsonSerializer {
    timestamp_format: TimestampFormat,
}

impl JsonSerializer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }
}

impl Serializer for JsonSerializer {
    fn clone_box(&self) -> Box<dyn Serializer> {
        Box::new(self.clone())
    }

    fn serialize(&self, record: &Record, service: &str) -> Vec<u8> {
        let mut obj = Map::new();

        let timestamp = match self.timestamp_format {
            TimestampFormat::Iso8601 => {
                Json::String(record.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true))
            }
            TimestampFormat::UnixSeconds => Json::String(record.timestamp.timestamp().to_string()),
        };
        obj.insert("timestamp".to_owned(), timestamp);
        obj.insert("level".to_owned(), Json::String(record.severity.name().to_owned()));
        obj.insert("service".to_owned(), Json::String(resolve_service(record, service).to_owned()));
        obj.insert("message".to_owned(), Json::String(record.message.clone()));

        if let Some(trace) = &record.trace {
            obj.insert("trace_id".to_owned(), Json::String(trace.trace_id.clone()));
            obj.insert("span_id".to_owned(), Json::String(trace.span_id.clone()));
            if let Some(parent) = &trace.parent_span_id {
                obj.insert("parent_span_id".to_owned(), Json::String(parent.clone()));
            }
            if let Some(correlation) = &trace.correlation_id {
                obj.insert("correlation_id".to_owned(), Json::String(correlation.clone()));
            }
            if let Some(session) = &trace.session_id {
                obj.insert("session_id".to_owned(), Json::String(session.clone()));
            }
        }

        for (key, value) in &record.fields {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            obj.insert(key.clone(), value.clone().into());
        }

        if let Some(exception) = &record.exception {
            let mut exc = Map::new();
            exc.insert("type".to_owned(), Json::String(exception.type_name.clone()));
            exc.insert("message".to_owned(), Json::String(exception.message.clone()));
            exc.insert(
                "traceback".to_owned(),
                exception.traceback.clone().map_or(Json::Null, Json::String),
            );
            obj.insert("exception".to_owned(), Json::Object(exc));
        }

        serde_json::to_vec(&Json::Object(obj)).unwrap_or_else(|_| b"{}".to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracelog_record::{ExceptionInfo, Severity};

    #[test]
    fn basic_record_has_mandatory_keys() {
        let record = Record::new(Severity::Info, "svc.orders", "hello").with_field("k", 1);
        let bytes = JsonSerializer::new().serialize(&record, "svc.orders");
        let json: Json = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["level"], "INFO");
        assert_eq!(json["service"], "svc.orders");
        assert_eq!(json["message"], "hello");
        assert_eq!(json["k"], 1);
    }

    #[test]
    fn empty_service_falls_back_to_logger_name() {
        let record = Record::new(Severity::Info, "svc.orders", "hello");
        let bytes = JsonSerializer::new().serialize(&record, "");
        let json: Json = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["service"], "svc.orders");
    }

    #[test]
    fn reserved_field_name_does_not_clobber_mandatory_key() {
        let record = Record::new(Severity::Info, "svc", "hi").with_field("level", "sneaky");
        let bytes = JsonSerializer::new().serialize(&record, "svc");
        let json: Json = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["level"], "INFO");
    }

    #[test]
    fn trace_fields_are_top_level_when_present() {
        let record = Record::new(Severity::Info, "svc", "hi")
            .with_trace(tracelog_trace::TraceContext::root());
        let bytes = JsonSerializer::new().serialize(&record, "svc");
        let json: Json = serde_json::from_slice(&bytes).unwrap();
        assert!(json["trace_id"].is_string());
        assert!(json["span_id"].is_string());
        assert!(json.get("parent_span_id").is_none());
    }

    #[test]
    fn exception_becomes_nested_object() {
        let record = Record::new(Severity::Error, "svc", "boom")
            .with_exception(ExceptionInfo::new("IoError", "disk full"));
        let bytes = JsonSerializer::new().serialize(&record, "svc");
        let json: Json = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["exception"]["type"], "IoError");
        assert_eq!(json["exception"]["message"], "disk full");
    }

    #[test]
    fn non_ascii_message_is_preserved_not_escaped() {
        let record = Record::new(Severity::Info, "svc", "caf\u{e9}");
        let bytes = JsonSerializer::new().serialize(&record, "svc");
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("caf\u{e9}"));
    }

    #[test]
    fn unix_seconds_format_renders_as_string() {
        let record = Record::new(Severity::Info, "svc", "hi");
        let bytes = JsonSerializer::new()
            .with_timestamp_format(TimestampFormat::UnixSeconds)
            .serialize(&record, "svc");
        let json: Json = serde_json::from_slice(&bytes).unwrap();
        assert!(json["timestamp"].is_string());
    }
}
