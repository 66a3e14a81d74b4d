use std::io;

/// The byte sink at the bottom of a pipeline: a console stream, a rotating
/// file, or any future sink implementation (spec §4.3 calls this "the
/// underlying writer"). Implementors own their own I/O discipline; this
/// crate only owns queueing, scheduling, and shutdown around them.
pub trait Writer: Send {
    fn write_record(&mut self, bytes: &[u8]) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
    fn close(&mut self) -> io::Result<()>;
}
