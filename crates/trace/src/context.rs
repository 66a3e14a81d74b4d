use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::Rng as _;

/// Distributed-tracing identifiers and baggage attached to one operation.
///
/// Within a single trace, every `span_id` is unique; a child span copies
/// `trace_id` (and the optional correlation/session ids) from its parent and
/// sets `parent_span_id` to the parent's `span_id` (spec §3).
#[derive(Debug, Clone, PartialEq)]
pub struct TraceContext {
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub correlation_id: Option<String>,
    pub session_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub extra: BTreeMap<String, String>,
}

impl TraceContext {
    /// Construct a fresh root context: new `trace_id` and `span_id`, no parent.
    #[must_use]
    pub fn root() -> Self {
        Self {
            trace_id: generate_id(),
            span_id: generate_id(),
            parent_span_id: None,
            correlation_id: None,
            session_id: None,
            started_at: Utc::now(),
            extra: BTreeMap::new(),
        }
    }

    /// Derive a child span: shares `trace_id`, `correlation_id`, `session_id`,
    /// and a shallow copy of `extra`; sets `parent_span_id` to `self.span_id`;
    /// generates a fresh `span_id`.
    #[must_use]
    pub fn child_span(&self) -> Self {
        Self {
            trace_id: self.trace_id.clone(),
            span_id: generate_id(),
            parent_span_id: Some(self.span_id.clone()),
            correlation_id: self.correlation_id.clone(),
            session_id: self.session_id.clone(),
            started_at: Utc::now(),
            extra: self.extra.clone(),
        }
    }
}

/// 16 lowercase hex characters sourced from a cryptographically seeded PRNG.
///
/// Uniqueness is guaranteed only within this process's lifetime; collisions
/// across processes are permitted (spec §4.2 -- trace_id is not a global id).
#[must_use]
pub fn generate_id() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 8] = rng.random();
    bytes.iter().fold(String::with_capacity(16), |mut s, b| {
        use std::fmt::Write as _;
        let _ = write!(s, "{b:02x}");
        s
    })
}
