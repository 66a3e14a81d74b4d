use std::collections::BTreeMap;

use crate::context::{generate_id, TraceContext};

/// Canonical outbound header names (spec §4.2 / §6).
pub const HEADER_TRACE_ID: &str = "X-Trace-Id";
pub const HEADER_SPAN_ID: &str = "X-Span-Id";
pub const HEADER_PARENT_SPAN_ID: &str = "X-Parent-Span-Id";
pub const HEADER_CORRELATION_ID: &str = "X-Correlation-Id";
pub const HEADER_SESSION_ID: &str = "X-Session-Id";

/// A process-external carrier for trace propagation: an opaque string-to-string
/// mapping, typically request/response headers.
///
/// Reads are case-insensitive; writes always use the canonical capitalization
/// in [`HEADER_TRACE_ID`] and friends. Unknown keys are ignored; a missing
/// `X-Trace-Id` never fails extraction -- it falls back to a fresh identifier.
pub type Carrier = BTreeMap<String, String>;

impl TraceContext {
    /// Serialize to an outbound carrier using the fixed header names.
    #[must_use]
    pub fn to_carrier(&self) -> Carrier {
        let mut carrier = Carrier::new();
        carrier.insert(HEADER_TRACE_ID.to_owned(), self.trace_id.clone());
        carrier.insert(HEADER_SPAN_ID.to_owned(), self.span_id.clone());
        if let Some(parent) = &self.parent_span_id {
            carrier.insert(HEADER_PARENT_SPAN_ID.to_owned(), parent.clone());
        }
        if let Some(correlation) = &self.correlation_id {
            carrier.insert(HEADER_CORRELATION_ID.to_owned(), correlation.clone());
        }
        if let Some(session) = &self.session_id {
            carrier.insert(HEADER_SESSION_ID.to_owned(), session.clone());
        }
        carrier
    }

    /// Extract a new context from an inbound carrier.
    ///
    /// The inbound `span_id`, if any, becomes the new context's
    /// `parent_span_id`; a fresh `span_id` is always generated for the new
    /// context (it represents a new, local span caused by the inbound
    /// request, not a resumption of the remote one). A missing `trace_id`
    /// produces a fresh one rather than failing (spec §4.2).
    #[must_use]
    pub fn from_carrier(carrier: &Carrier) -> Self {
        let lookup = |name: &str| -> Option<String> {
            carrier
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.clone())
        };

        let trace_id = lookup(HEADER_TRACE_ID).unwrap_or_else(generate_id);
        let parent_span_id = lookup(HEADER_SPAN_ID);
        let correlation_id = lookup(HEADER_CORRELATION_ID);
        let session_id = lookup(HEADER_SESSION_ID);

        Self {
            trace_id,
            span_id: generate_id(),
            parent_span_id,
            correlation_id,
            session_id,
            started_at: chrono::Utc::now(),
            extra: BTreeMap::new(),
        }
    }
}
