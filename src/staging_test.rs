//! Tests for the staging buffer

use std::io::{self, Write};

use crate::staging::Staging;

/// Sink that fails every write
struct FaultySink;

impl Write for FaultySink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "sink unavailable"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink that takes at most `limit` bytes per write call
struct TricklingSink {
    limit: usize,
}

impl Write for TricklingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len().min(self.limit))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink that panics on every write
struct PanickySink;

impl Write for PanickySink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        panic!("sink exploded");
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_append_tracks_buffered_and_available() {
    let mut staging = Staging::new(Vec::new(), 100);
    assert_eq!(staging.buffered(), 0);
    assert_eq!(staging.available(), 100);
    assert_eq!(staging.capacity(), 100);

    staging.append(b"hello");
    assert_eq!(staging.buffered(), 5);
    assert_eq!(staging.available(), 95);
}

#[test]
fn test_flush_writes_and_empties() {
    let mut staging = Staging::new(Vec::new(), 100);
    staging.append(b"hello");
    staging.append(b"world");

    staging.flush().unwrap();

    assert_eq!(staging.buffered(), 0);
    assert_eq!(staging.available(), 100);
}

#[test]
fn test_flush_on_empty_is_a_no_op() {
    let mut staging = Staging::new(FaultySink, 100);
    staging.flush().unwrap();
}

#[test]
fn test_failed_flush_keeps_bytes() {
    let mut staging = Staging::new(FaultySink, 100);
    staging.append(b"hello");

    assert!(staging.flush().is_err());
    assert_eq!(staging.buffered(), 5);

    // Still reported failed, still holding the bytes
    assert!(staging.flush().is_err());
    assert_eq!(staging.buffered(), 5);
}

#[test]
fn test_flush_handles_partial_writes() {
    let mut staging = Staging::new(TricklingSink { limit: 3 }, 100);
    staging.append(b"helloworld");

    staging.flush().unwrap();
    assert_eq!(staging.buffered(), 0);
}

#[test]
fn test_write_direct_bypasses_buffer() {
    let mut staging = Staging::new(Vec::new(), 10);
    staging.append(b"abc");

    staging.write_direct(b"0123456789abcdef").unwrap();

    // Buffered bytes are untouched by a direct write
    assert_eq!(staging.buffered(), 3);
}

#[test]
fn test_panicking_sink_becomes_error() {
    let mut staging = Staging::new(PanickySink, 100);

    let err = staging.write_direct(b"boom").unwrap_err();
    assert!(err.to_string().contains("panicked"));

    staging.append(b"more");
    assert!(staging.flush().is_err());
    assert_eq!(staging.buffered(), 4);
}
