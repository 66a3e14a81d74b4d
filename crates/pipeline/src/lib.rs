//! The async log pipeline: a bounded per-sink queue, one dedicated consumer
//! thread, overflow policies, two-phase shutdown, and lock-free health
//! counters. This is the generic machinery every concrete sink in
//! `tracelog-sink` is built on top of.

mod config;
mod diagnostics;
mod health;
mod pipeline;
mod writer;

pub use config::{OverflowPolicy, PipelineConfig, PipelineConfigBuilder, PipelineConfigError};
pub use diagnostics::Diagnostics;
pub use health::Health;
pub use pipeline::{Pipeline, ShutdownReport};
pub use writer::Writer;
