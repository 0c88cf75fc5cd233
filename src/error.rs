//! Error types for the async writer
//!
//! Producer-visible failures only. Sink and flush failures are asynchronous
//! and travel through the [`Callback`](crate::Callback) instead of the
//! producer's return value.

use std::io;

use thiserror::Error;

/// Errors surfaced to callers of [`AsyncWriter::write`](crate::AsyncWriter::write)
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The writer has been stopped; no further writes are accepted
    #[error("async writer is closed")]
    Closed,
}

/// Result type for writer operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Closed => io::Error::new(io::ErrorKind::BrokenPipe, err),
        }
    }
}
