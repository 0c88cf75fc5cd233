//! Staging buffer in front of the sink
//!
//! A fixed-capacity byte buffer owned exclusively by the drainer. Small
//! payloads accumulate here and reach the sink in batches; payloads at or
//! above the staging capacity bypass it entirely. A failed flush keeps the
//! unwritten bytes in place so a later flush can still deliver and reset the
//! buffer.
//!
//! The sink is called only from this module. Panics from a misbehaving sink
//! are caught and converted into `io::Error` so they cannot take the drainer
//! thread (and the queue behind it) down with them.

use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};

/// Fixed-capacity batch buffer wrapping the downstream sink
pub(crate) struct Staging<W> {
    sink: W,
    buf: Vec<u8>,
    capacity: usize,
}

impl<W: Write> Staging<W> {
    pub(crate) fn new(sink: W, capacity: usize) -> Self {
        Self {
            sink,
            buf: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Bytes currently buffered
    #[inline]
    pub(crate) fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Space left before the buffer is full
    #[inline]
    pub(crate) fn available(&self) -> usize {
        self.capacity - self.buf.len()
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Buffer a payload; the caller has already ensured it fits
    pub(crate) fn append(&mut self, payload: &[u8]) {
        debug_assert!(payload.len() <= self.available());
        self.buf.extend_from_slice(payload);
    }

    /// Write a payload straight to the sink, bypassing the buffer
    pub(crate) fn write_direct(&mut self, payload: &[u8]) -> io::Result<()> {
        let mut written = 0;
        while written < payload.len() {
            match sink_write(&mut self.sink, &payload[written..]) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "sink accepted no bytes",
                    ));
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Write all buffered bytes to the sink and empty the buffer
    ///
    /// On error the bytes the sink did not take stay buffered, so the next
    /// flush attempt picks up exactly where this one failed.
    pub(crate) fn flush(&mut self) -> io::Result<()> {
        let mut written = 0;
        while written < self.buf.len() {
            match sink_write(&mut self.sink, &self.buf[written..]) {
                Ok(0) => {
                    self.buf.drain(..written);
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "sink accepted no bytes",
                    ));
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    self.buf.drain(..written);
                    return Err(e);
                }
            }
        }
        self.buf.clear();
        Ok(())
    }
}

/// Call the sink, converting a panic into an error
fn sink_write<W: Write>(sink: &mut W, chunk: &[u8]) -> io::Result<usize> {
    match panic::catch_unwind(AssertUnwindSafe(|| sink.write(chunk))) {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(
            io::ErrorKind::Other,
            "sink panicked during write",
        )),
    }
}

#[cfg(test)]
#[path = "staging_test.rs"]
mod staging_test;
