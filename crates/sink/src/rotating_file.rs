use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tracelog_pipeline::{Health, Pipeline, PipelineConfig, ShutdownReport, Writer};
use tracelog_record::{Record, Severity};
use tracelog_serialize::{JsonSerializer, Serializer};

use crate::Sink;

/// Error constructing a [`RotatingFileSink`].
#[derive(Debug, thiserror::Error)]
pub enum RotatingFileConfigError {
    #[error("failed to open log file {path}: {source}")]
    Open { path: PathBuf, #[source] source: io::Error },
}

/// Configuration for [`RotatingFileSink::open`].
#[derive(Debug, Clone)]
pub struct RotatingFileConfig {
    pub path: PathBuf,
    /// Size trigger in bytes. `<= 0` disables rotation.
    pub max_bytes: u64,
    /// Archived-generation retention cap. `0` disables retention (each
    /// rotation truncates in place instead of keeping numbered backups).
    pub backup_count: usize,
    pub compress: bool,
    pub threshold: Severity,
    pub pipeline: PipelineConfig,
}

impl RotatingFileConfig {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_bytes: 10 * 1024 * 1024,
            backup_count: 5,
            compress: false,
            threshold: Severity::Debug,
            pipeline: PipelineConfig::builder().build().expect("default pipeline config is valid"),
        }
    }
}

fn segment_path(base: &Path, generation: usize, gz: bool) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{generation}"));
    if gz {
        name.push(".gz");
    }
    PathBuf::from(name)
}

fn existing_segment(base: &Path, generation: usize) -> Option<(PathBuf, bool)> {
    let plain = segment_path(base, generation, false);
    if plain.exists() {
        return Some((plain, false));
    }
    let gz = segment_path(base, generation, true);
    if gz.exists() {
        return Some((gz, true));
    }
    None
}

/// The [`Writer`] for a rotating file sink: owns the active handle, the byte
/// counter, and the rotation algorithm (spec §4.3). Runs exclusively on the
/// pipeline's single consumer thread, so no internal locking is required --
/// that invariant (one writer, one thread) is what the generic `Pipeline`
/// guarantees around every concrete writer.
pub struct RotatingFileWriter {
    path: PathBuf,
    file: File,
    byte_counter: u64,
    max_bytes: u64,
    backup_count: usize,
    compress: bool,
}

impl RotatingFileWriter {
    /// # Errors
    ///
    /// Returns [`RotatingFileConfigError::Open`] if the active file cannot be opened.
    pub fn open(config: &RotatingFileConfig) -> Result<Self, RotatingFileConfigError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)
            .map_err(|source| RotatingFileConfigError::Open { path: config.path.clone(), source })?;
        let byte_counter = file.metadata().map(|m| m.len()).unwrap_or(0);
        Ok(Self {
            path: config.path.clone(),
            file,
            byte_counter,
            max_bytes: config.max_bytes,
            backup_count: config.backup_count,
            compress: config.compress,
        })
    }

    fn reopen(&mut self) -> io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.byte_counter = file.metadata().map(|m| m.len()).unwrap_or(0);
        self.file = file;
        Ok(())
    }

    /// Promote the active file to generation 1 (gzipped if `compress` is set),
    /// shift older generations up by one, and enforce the retention cap.
    fn rotate(&mut self) -> io::Result<()> {
        let _ = self.file.flush();

        if self.backup_count == 0 {
            self.file = OpenOptions::new().create(true).write(true).truncate(true).open(&self.path)?;
            self.byte_counter = 0;
            return Ok(());
        }

        for generation in (1..self.backup_count).rev() {
            if let Some((src, was_gz)) = existing_segment(&self.path, generation) {
                let dest = segment_path(&self.path, generation + 1, was_gz);
                let stale = segment_path(&self.path, generation + 1, !was_gz);
                let _ = fs::remove_file(&stale);
                fs::rename(&src, &dest)?;
            }
        }

        if self.compress {
            let dest = segment_path(&self.path, 1, true);
            let mut input = File::open(&self.path)?;
            let output = File::create(&dest)?;
            let mut encoder = GzEncoder::new(output, Compression::default());
            io::copy(&mut input, &mut encoder)?;
            encoder.finish()?;
            fs::remove_file(&self.path)?;
        } else {
            let dest = segment_path(&self.path, 1, false);
            fs::rename(&self.path, &dest)?;
        }

        for gz in [false, true] {
            let _ = fs::remove_file(segment_path(&self.path, self.backup_count, gz));
        }

        self.reopen()
    }
}

impl Writer for RotatingFileWriter {
    fn write_record(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.max_bytes > 0 {
            let would_be = self.byte_counter + bytes.len() as u64 + 1;
            if would_be > self.max_bytes {
                if let Err(err) = self.rotate() {
                    // Best-effort: the record that triggered rotation must
                    // still land somewhere. Try to reopen and write anyway.
                    let _ = err;
                    self.reopen()?;
                }
            }
        }

        if self.file.write_all(bytes).and_then(|()| self.file.write_all(b"\n")).is_err() {
            self.reopen()?;
            self.file.write_all(bytes)?;
            self.file.write_all(b"\n")?;
        }
        self.byte_counter += bytes.len() as u64 + 1;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Size-triggered rotating file sink with optional gzip archival and a
/// fixed retention cap (spec §4.3, §6).
pub struct RotatingFileSink {
    pipeline: Pipeline,
}

impl RotatingFileSink {
    /// # Errors
    ///
    /// Returns [`RotatingFileConfigError::Open`] if the active file cannot be opened.
    pub fn open(config: RotatingFileConfig) -> Result<Self, RotatingFileConfigError> {
        let threshold = config.threshold;
        let pipeline_config = config.pipeline.clone();
        let writer = RotatingFileWriter::open(&config)?;
        let pipeline = Pipeline::start(
            writer,
            Box::new(JsonSerializer::new()) as Box<dyn Serializer>,
            "file",
            threshold,
            pipeline_config,
        );
        Ok(Self { pipeline })
    }
}

impl Sink for RotatingFileSink {
    fn submit(&self, record: Record) -> bool {
        self.pipeline.submit(record)
    }

    fn flush(&self) {
        self.pipeline.flush();
    }

    fn close(&self) -> ShutdownReport {
        self.pipeline.shutdown()
    }

    fn set_threshold(&self, threshold: Severity) {
        self.pipeline.set_threshold(threshold);
    }

    fn set_serializer(&self, serializer: Box<dyn Serializer>) {
        self.pipeline.set_serializer(serializer);
    }

    fn health(&self) -> &Health {
        self.pipeline.health()
    }
}
