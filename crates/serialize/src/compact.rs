use std::fmt::Write as _;

use tracelog_record::Record;

use crate::{resolve_service, Serializer, RESERVED_KEYS};

/// Space-separated tokens, no timestamp, no color: the lowest-byte serializer
/// (spec §4.4). Intended for high-volume sinks where every byte counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompactSerializer;

impl CompactSerializer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Serializer for CompactSerializer {
    fn clone_box(&self) -> Box<dyn Serializer> {
        Box::new(*self)
    }

    fn serialize(&self, record: &Record, service: &str) -> Vec<u8> {
        let mut line = String::new();
        let _ = write!(
            line,
            "{} {} {}",
            record.severity.name(),
            resolve_service(record, service),
            record.message
        );
        for (key, value) in &record.fields {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            let _ = write!(line, " {key}={value}");
        }
        line.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracelog_record::Severity;

    #[test]
    fn no_timestamp_or_separators() {
        let record = Record::new(Severity::Info, "svc", "hi").with_field("k", 1);
        let bytes = CompactSerializer::new().serialize(&record, "svc");
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "INFO svc hi k=1");
    }

    #[test]
    fn never_contains_ansi_escapes() {
        let record = Record::new(Severity::Critical, "svc", "down");
        let bytes = CompactSerializer::new().serialize(&record, "svc");
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains('\u{1b}'));
    }
}
