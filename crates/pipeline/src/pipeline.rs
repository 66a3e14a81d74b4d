use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, RwLock};
use tracelog_record::{Record, Severity};
use tracelog_serialize::Serializer;

use crate::config::{OverflowPolicy, PipelineConfig};
use crate::diagnostics::Diagnostics;
use crate::health::Health;
use crate::writer::Writer;

enum Message {
    Record(Record),
    Flush(SyncSender<()>),
    Shutdown,
}

/// Outcome of a [`Pipeline::shutdown`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// `true` if a prior call already completed shutdown; this call was a no-op.
    pub already_shut_down: bool,
    /// `true` if the consumer did not finish draining within the configured deadline.
    pub timed_out: bool,
}

/// A bounded hand-off queue plus its single dedicated consumer thread, the
/// two-phase shutdown protocol, and the sink's lock-free health counters
/// (spec §4.1). Generic over the concrete [`Writer`] so the console and
/// rotating-file sinks in `tracelog-sink` share this whole machinery.
pub struct Pipeline {
    sender: SyncSender<Message>,
    closing: Arc<AtomicBool>,
    shutdown_started: AtomicBool,
    consumer: Mutex<Option<JoinHandle<()>>>,
    done: Arc<(Mutex<bool>, Condvar)>,
    health: Arc<Health>,
    config: PipelineConfig,
    coalesce: Arc<Mutex<HashMap<String, Record>>>,
    serializer: Arc<RwLock<Box<dyn Serializer>>>,
    threshold: Arc<AtomicU8>,
}

impl Pipeline {
    /// Spawn the consumer thread and return a handle.
    ///
    /// `writer` is moved onto the dedicated consumer thread; producers never
    /// touch it directly, only through [`Pipeline::submit`].
    pub fn start<W: Writer + 'static>(
        mut writer: W,
        serializer: Box<dyn Serializer>,
        service: impl Into<String>,
        threshold: Severity,
        config: PipelineConfig,
    ) -> Self {
        let (sender, receiver) = mpsc::sync_channel::<Message>(config.capacity + 1);
        let closing = Arc::new(AtomicBool::new(false));
        let health = Arc::new(Health::new());
        let done = Arc::new((Mutex::new(false), Condvar::new()));
        let coalesce: Arc<Mutex<HashMap<String, Record>>> = Arc::new(Mutex::new(HashMap::new()));
        let serializer = Arc::new(RwLock::new(serializer));
        let threshold = Arc::new(AtomicU8::new(threshold as u8));
        let service = service.into();

        let thread_health = Arc::clone(&health);
        let thread_done = Arc::clone(&done);
        let thread_coalesce = Arc::clone(&coalesce);
        let thread_serializer = Arc::clone(&serializer);
        let flush_every = config.flush_every;

        let handle = std::thread::Builder::new()
            .name("tracelog-sink-consumer".to_owned())
            .spawn(move || {
                let diagnostics = Diagnostics::new();
                let mut since_flush = 0usize;
                let write_one = |writer: &mut W, record: &Record, since_flush: &mut usize| {
                    let bytes = thread_serializer.read().serialize(record, &service);
                    if let Err(err) = writer.write_record(&bytes) {
                        thread_health.record_failure();
                        diagnostics.report("writer-write", &format!("write failed: {err}"));
                        return;
                    }
                    *since_flush += 1;
                    if *since_flush >= flush_every {
                        if let Err(err) = writer.flush() {
                            thread_health.record_failure();
                            diagnostics.report("writer-flush", &format!("flush failed: {err}"));
                        }
                        *since_flush = 0;
                    }
                };

                'consume: loop {
                    match receiver.recv() {
                        Ok(Message::Record(record)) => write_one(&mut writer, &record, &mut since_flush),
                        Ok(Message::Flush(ack)) => {
                            let _ = writer.flush();
                            let _ = ack.send(());
                        }
                        Ok(Message::Shutdown) | Err(_) => break 'consume,
                    }
                    if let Some(record) = {
                        let mut table = thread_coalesce.lock();
                        let key = table.keys().next().cloned();
                        key.and_then(|k| table.remove(&k))
                    } {
                        write_one(&mut writer, &record, &mut since_flush);
                    }
                }

                let mut remaining = 0u64;
                while let Ok(message) = receiver.try_recv() {
                    if matches!(message, Message::Record(_)) {
                        remaining += 1;
                    }
                }
                remaining += thread_coalesce.lock().len() as u64;
                thread_coalesce.lock().clear();
                if remaining > 0 {
                    thread_health.record_lost_on_shutdown(remaining);
                }

                for _ in 0..3 {
                    let _ = writer.flush();
                    std::thread::sleep(Duration::from_millis(10));
                }
                let _ = writer.close();

                let (lock, cvar) = &*thread_done;
                *lock.lock() = true;
                cvar.notify_all();
            })
            .expect("spawning the sink consumer thread");

        Self {
            sender,
            closing,
            shutdown_started: AtomicBool::new(false),
            consumer: Mutex::new(Some(handle)),
            done,
            health,
            config,
            coalesce,
            serializer,
            threshold,
        }
    }

    #[must_use]
    pub fn health(&self) -> &Health {
        &self.health
    }

    pub fn set_threshold(&self, threshold: Severity) {
        self.threshold.store(threshold as u8, Ordering::Relaxed);
    }

    #[must_use]
    pub fn threshold(&self) -> Severity {
        match self.threshold.load(Ordering::Relaxed) {
            0 => Severity::Debug,
            1 => Severity::Info,
            2 => Severity::Warning,
            3 => Severity::Error,
            _ => Severity::Critical,
        }
    }

    pub fn set_serializer(&self, serializer: Box<dyn Serializer>) {
        *self.serializer.write() = serializer;
    }

    /// Enqueue `record`, applying the configured [`OverflowPolicy`] if the
    /// queue is at capacity. Returns `false` if the record was dropped.
    pub fn submit(&self, record: Record) -> bool {
        if self.closing.load(Ordering::Acquire) {
            self.health.record_drop();
            return false;
        }
        if !record.severity.admits(self.threshold()) {
            return true;
        }

        match self.config.overflow_policy {
            OverflowPolicy::DropNewest => match self.sender.try_send(Message::Record(record)) {
                Ok(()) => true,
                Err(_) => {
                    self.health.record_drop();
                    false
                }
            },
            OverflowPolicy::Block { deadline } => {
                let start = Instant::now();
                let mut message = Message::Record(record);
                loop {
                    match self.sender.try_send(message) {
                        Ok(()) => return true,
                        Err(TrySendError::Disconnected(_)) => {
                            self.health.record_drop();
                            return false;
                        }
                        Err(TrySendError::Full(returned)) => {
                            if start.elapsed() >= deadline {
                                self.health.record_drop();
                                return false;
                            }
                            message = returned;
                            std::thread::sleep(Duration::from_millis(1));
                        }
                    }
                }
            }
            OverflowPolicy::CoalesceBySignature => match self.sender.try_send(Message::Record(record)) {
                Ok(()) => true,
                Err(TrySendError::Full(Message::Record(record))) => {
                    let signature = format!("{}:{}", record.severity, record.logger_name);
                    let mut table = self.coalesce.lock();
                    if table.insert(signature, record).is_some() {
                        self.health.record_drop();
                    }
                    true
                }
                Err(_) => {
                    self.health.record_drop();
                    false
                }
            },
        }
    }

    /// Signal the consumer to flush the underlying writer and wait for it to do so.
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = mpsc::sync_channel(1);
        if self.sender.try_send(Message::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv_timeout(self.config.shutdown_deadline);
        }
    }

    /// Two-phase shutdown (spec §4.1). Idempotent: a second call is a no-op.
    pub fn shutdown(&self) -> ShutdownReport {
        if self.shutdown_started.swap(true, Ordering::AcqRel) {
            return ShutdownReport { already_shut_down: true, timed_out: false };
        }

        self.closing.store(true, Ordering::Release);
        if self.sender.try_send(Message::Shutdown).is_err() {
            let _ = self.sender.send(Message::Shutdown);
        }

        let (lock, cvar) = &*self.done;
        let mut done = lock.lock();
        let deadline = self.config.shutdown_deadline;
        let start = Instant::now();
        while !*done {
            let remaining = deadline.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                break;
            }
            let result = cvar.wait_for(&mut done, remaining);
            if result.timed_out() {
                break;
            }
        }

        if let Some(handle) = self.consumer.lock().take() {
            if *done {
                let _ = handle.join();
            }
        }

        ShutdownReport { already_shut_down: false, timed_out: !*done }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("closing", &self.closing.load(Ordering::Relaxed))
            .field("threshold", &self.threshold())
            .finish_non_exhaustive()
    }
}
