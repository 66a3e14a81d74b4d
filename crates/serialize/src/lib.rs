//! Byte-sequence serializers for [`Record`](tracelog_record::Record): JSON,
//! colored human-readable, and a low-byte compact form.

mod compact;
mod json;
mod pretty;

pub use compact::CompactSerializer;
pub use json::{JsonSerializer, TimestampFormat};
pub use pretty::PrettySerializer;

use tracelog_record::Record;

/// The standard record attributes a structured field must not collide with
/// when promoted to a top-level key (spec §4.4).
pub const RESERVED_KEYS: &[&str] = &[
    "timestamp",
    "level",
    "service",
    "message",
    "trace_id",
    "span_id",
    "parent_span_id",
    "correlation_id",
    "session_id",
    "exception",
];

/// Converts one [`Record`] into the bytes a sink writes.
///
/// Implementations must never fail: anything that cannot be represented
/// degrades to its string form rather than erroring (spec §4.4, §7).
pub trait Serializer: Send + Sync {
    /// `service` is the caller-resolved name -- either a configured service
    /// name or, absent one, the record's own `logger_name`.
    fn serialize(&self, record: &Record, service: &str) -> Vec<u8>;

    /// Clones this serializer behind a fresh box, so the same configured
    /// instance can be handed to more than one sink pipeline at once.
    fn clone_box(&self) -> Box<dyn Serializer>;
}

fn resolve_service<'a>(record: &'a Record, service: &'a str) -> &'a str {
    if service.is_empty() {
        &record.logger_name
    } else {
        service
    }
}
