//! Crosscutting record filters: redaction, sampling, and rate limiting.

mod rate_limit;
mod redact;
mod sampling;

pub use rate_limit::RateLimitFilter;
pub use redact::{RedactError, RedactFilter};
pub use sampling::SamplingFilter;

use tracelog_record::Record;

/// A crosscutting transform attached to a facade or a sink.
///
/// A *transformer* mutates `record` in place and always returns `true`. A
/// *predicate* leaves `record` untouched and returns `false` to drop it.
/// Filter order is declaration order (spec §4.5); a panic inside `apply`
/// is caught by the caller and treated as "keep unchanged" (spec §7).
pub trait Filter: Send + Sync {
    fn apply(&self, record: &mut Record) -> bool;
}
