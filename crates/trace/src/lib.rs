//! Distributed trace context: identifiers, propagation carriers, and the
//! ambient scope that lets a process thread or task pick up "the current
//! trace" without explicit plumbing.

mod carrier;
mod context;
mod scope;

pub use carrier::{
    Carrier, HEADER_CORRELATION_ID, HEADER_PARENT_SPAN_ID, HEADER_SESSION_ID, HEADER_SPAN_ID,
    HEADER_TRACE_ID,
};
pub use context::{generate_id, TraceContext};
pub use scope::{current, scoped, with_task_scope, Scope, ScopeInputs};
