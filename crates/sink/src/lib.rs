//! Concrete sinks: console (stdout/stderr split) and a rotating file with
//! optional gzip archival. Both are built on [`tracelog_pipeline::Pipeline`];
//! this crate contributes the [`tracelog_pipeline::Writer`] implementations
//! and the public [`Sink`] facade each one is wrapped behind.

mod console;
mod rotating_file;

pub use console::{ConsoleSink, ConsoleSinkConfig, ConsoleStream};
pub use rotating_file::{RotatingFileConfig, RotatingFileConfigError, RotatingFileSink};

use tracelog_pipeline::{Health, ShutdownReport};
use tracelog_record::{Record, Severity};
use tracelog_serialize::Serializer;

/// The capability set every sink exposes to the facade (spec §4.3).
pub trait Sink: Send + Sync {
    fn submit(&self, record: Record) -> bool;
    fn flush(&self);
    fn close(&self) -> ShutdownReport;
    fn set_threshold(&self, threshold: Severity);
    fn set_serializer(&self, serializer: Box<dyn Serializer>);
    fn health(&self) -> &Health;
}
