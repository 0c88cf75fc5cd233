//! Helper sinks
//!
//! `NullSink` discards everything it is given. Useful as the downstream end
//! in benchmarks and latency tests where only the producer path matters.

use std::io::{self, Write};

/// Sink that accepts and discards all bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl Write for NullSink {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
