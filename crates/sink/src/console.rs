use std::io::{self, Write};

use tracelog_pipeline::{Health, Pipeline, PipelineConfig, ShutdownReport, Writer};
use tracelog_record::{Record, Severity};
use tracelog_serialize::{JsonSerializer, Serializer};

use crate::Sink;

/// Which stream a non-split [`ConsoleSink`] writes everything to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleStream {
    Stdout,
    Stderr,
}

struct StreamWriter {
    stream: ConsoleStream,
}

impl Writer for StreamWriter {
    fn write_record(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut line = Vec::with_capacity(bytes.len() + 1);
        line.extend_from_slice(bytes);
        line.push(b'\n');
        match self.stream {
            ConsoleStream::Stdout => io::stdout().write_all(&line),
            ConsoleStream::Stderr => io::stderr().write_all(&line),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.stream {
            ConsoleStream::Stdout => io::stdout().flush(),
            ConsoleStream::Stderr => io::stderr().flush(),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        // stdout/stderr are process-owned; there is nothing to close.
        Ok(())
    }
}

/// Configuration for [`ConsoleSink::new`].
#[derive(Debug, Clone)]
pub struct ConsoleSinkConfig {
    pub threshold: Severity,
    pub split_by_severity: bool,
    pub stream_when_not_split: ConsoleStream,
    pub pipeline: PipelineConfig,
}

impl Default for ConsoleSinkConfig {
    fn default() -> Self {
        Self {
            threshold: Severity::Debug,
            split_by_severity: true,
            stream_when_not_split: ConsoleStream::Stdout,
            pipeline: PipelineConfig::builder().build().expect("default pipeline config is valid"),
        }
    }
}

/// Two streams, stdout and stderr; routes by severity when `split_by_severity`
/// is set (records >= ERROR go to stderr), otherwise everything goes to one
/// configured stream (spec §4.3).
pub struct ConsoleSink {
    split_by_severity: bool,
    primary: Pipeline,
    stderr: Option<Pipeline>,
}

impl ConsoleSink {
    #[must_use]
    pub fn new(config: ConsoleSinkConfig) -> Self {
        let split_by_severity = config.split_by_severity;
        let threshold = config.threshold;
        let primary_stream =
            if split_by_severity { ConsoleStream::Stdout } else { config.stream_when_not_split };
        let primary = Pipeline::start(
            StreamWriter { stream: primary_stream },
            Box::new(JsonSerializer::new()),
            "console",
            threshold,
            config.pipeline.clone(),
        );
        let stderr = split_by_severity.then(|| {
            Pipeline::start(
                StreamWriter { stream: ConsoleStream::Stderr },
                Box::new(JsonSerializer::new()) as Box<dyn Serializer>,
                "console",
                threshold,
                config.pipeline,
            )
        });
        Self { split_by_severity, primary, stderr }
    }
}

impl Sink for ConsoleSink {
    fn submit(&self, record: Record) -> bool {
        if self.split_by_severity && record.severity >= Severity::Error {
            if let Some(stderr) = &self.stderr {
                return stderr.submit(record);
            }
        }
        self.primary.submit(record)
    }

    fn flush(&self) {
        self.primary.flush();
        if let Some(stderr) = &self.stderr {
            stderr.flush();
        }
    }

    fn close(&self) -> ShutdownReport {
        let primary = self.primary.shutdown();
        if let Some(stderr) = &self.stderr {
            let secondary = stderr.shutdown();
            return ShutdownReport {
                already_shut_down: primary.already_shut_down && secondary.already_shut_down,
                timed_out: primary.timed_out || secondary.timed_out,
            };
        }
        primary
    }

    fn set_threshold(&self, threshold: Severity) {
        self.primary.set_threshold(threshold);
        if let Some(stderr) = &self.stderr {
            stderr.set_threshold(threshold);
        }
    }

    fn set_serializer(&self, serializer: Box<dyn Serializer>) {
        if let Some(stderr) = &self.stderr {
            stderr.set_serializer(serializer.clone_box());
        }
        self.primary.set_serializer(serializer);
    }

    fn health(&self) -> &Health {
        self.primary.health()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_split_sink_accepts_every_severity() {
        let sink = ConsoleSink::new(ConsoleSinkConfig {
            split_by_severity: false,
            ..ConsoleSinkConfig::default()
        });
        assert!(sink.submit(Record::new(Severity::Debug, "svc", "hi")));
        assert!(sink.submit(Record::new(Severity::Critical, "svc", "bye")));
        sink.close();
    }

    #[test]
    fn split_sink_routes_high_severity_to_stderr_pipeline() {
        let sink = ConsoleSink::new(ConsoleSinkConfig::default());
        assert!(sink.submit(Record::new(Severity::Error, "svc", "oops")));
        assert!(sink.stderr.is_some());
        sink.close();
    }

    #[test]
    fn threshold_below_error_drops_debug_records() {
        let sink = ConsoleSink::new(ConsoleSinkConfig::default());
        sink.set_threshold(Severity::Warning);
        assert!(sink.submit(Record::new(Severity::Debug, "svc", "ignored")));
        sink.flush();
        sink.close();
    }

    #[test]
    fn close_is_idempotent() {
        let sink = ConsoleSink::new(ConsoleSinkConfig::default());
        let first = sink.close();
        let second = sink.close();
        assert!(!first.already_shut_down);
        assert!(second.already_shut_down);
    }
}
