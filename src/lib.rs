//! drainpipe - non-blocking writer for slow byte sinks
//!
//! Sits between synchronous byte producers (loggers, encoders, anything that
//! calls `write`) and a slow downstream sink. Producers pay for a buffer copy
//! and a lock-free queue push; a single background thread absorbs the sink's
//! latency, batching payloads through a fixed-capacity staging buffer.
//!
//! # Architecture
//!
//! ```text
//! [Producer threads] --write--> [BufferPool] --BytesMut--> [MPSC queue]
//!                                                              |
//!                                             [Drainer thread] pop
//!                                                              |
//!                                                  [Staging buffer] --flush--> [Sink]
//! ```
//!
//! - Per-producer byte order is preserved end to end; the sink sees the
//!   concatenation of payloads in dequeue order.
//! - Producers never block on the sink. Sink failures are reported through a
//!   [`Callback`], never to the producer.
//! - [`stop`](AsyncWriter::stop) (or dropping the writer) drains everything
//!   already accepted before the sink is released.
//!
//! # Example
//!
//! ```
//! use drainpipe::{AsyncWriter, Config};
//!
//! let writer = AsyncWriter::new(Vec::<u8>::new(), Config::new());
//!
//! writer.write(b"hello ").unwrap();
//! writer.write(b"world").unwrap();
//!
//! // Delivers both payloads to the sink before returning
//! writer.stop();
//! ```
//!
//! The writer also implements [`std::io::Write`] (for `AsyncWriter` and
//! `&AsyncWriter`), so it drops into any logger that writes to a standard
//! writer.

/// Pooled payload buffers, classed by size
pub mod buffer_pool;

/// Write-failure notification trait
pub mod callback;

/// Coarse shared timestamp
pub mod clock;

/// Writer configuration
pub mod config;

/// Producer-visible errors
pub mod error;

/// Handoff queue contract and the default lock-free implementation
pub mod queue;

/// Helper sinks
pub mod sink;

/// Shared running/last-drain state
pub mod status;

mod drainer;
mod staging;
mod writer;

pub use callback::{Callback, NoopCallback};
pub use config::{
    Config, DEFAULT_BUFFER_SIZE, DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_IDLE_TIMEOUT,
};
pub use error::{Error, Result};
pub use queue::{LockFreeQueue, Queue};
pub use sink::NullSink;
pub use writer::AsyncWriter;
