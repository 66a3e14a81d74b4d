use std::fmt::Write as _;

use tracelog_record::{Record, Severity};

use crate::{resolve_service, Serializer, RESERVED_KEYS};

const RESET: &str = "\u{1b}[0m";

fn color_for(severity: Severity) -> &'static str {
    match severity {
        Severity::Debug => "\u{1b}[36m",    // cyan
        Severity::Info => "\u{1b}[32m",     // green
        Severity::Warning => "\u{1b}[33m",  // yellow
        Severity::Error => "\u{1b}[31m",    // red
        Severity::Critical => "\u{1b}[35m", // magenta
    }
}

/// One human-readable line per record, optionally ANSI-colored by severity.
///
/// Layout: `HH:MM:SS │ LEVEL(8) │ service(15) │ message │ k1=v1 k2=v2 …`
/// (spec §4.4). An exception, when present, is appended as additional lines
/// carrying its rendered traceback.
#[derive(Debug, Clone)]
pub struct PrettySerializer {
    color: bool,
}

impl Default for PrettySerializer {
    fn default() -> Self {
        Self { color: true }
    }
}

impl PrettySerializer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }
}

impl Serializer for PrettySerializer {
    fn clone_box(&self) -> Box<dyn Serializer> {
        Box::new(self.clone())
    }

    fn serialize(&self, record: &Record, service: &str) -> Vec<u8> {
        let mut line = String::new();

        let time = record.timestamp.format("%H:%M:%S");
        let level = format!("{:<8}", record.severity.name());
        let level = if self.color {
            format!("{}{}{}", color_for(record.severity), level, RESET)
        } else {
            level
        };
        let service = format!("{:<15}", resolve_service(record, service));

        let _ = write!(line, "{time} │ {level} │ {service} │ {}", record.message);

        for (key, value) in &record.fields {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            let _ = write!(line, " {key}={value}");
        }

        if let Some(exception) = &record.exception {
            let _ = write!(line, "\n  {}: {}", exception.type_name, exception.message);
            if let Some(traceback) = &exception.traceback {
                for tb_line in traceback.lines() {
                    let _ = write!(line, "\n  {tb_line}");
                }
            }
        }

        line.into_bytes()
    }
}
