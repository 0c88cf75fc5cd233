//! Writer configuration
//!
//! Immutable parameter bundle built with chained `with_*` calls. Every field
//! has a usable default; zero values are coerced back to the defaults when
//! the writer is constructed, so a mis-filled config degrades to the default
//! behavior instead of a pathological one.
//!
//! # Example
//!
//! ```ignore
//! let config = Config::new()
//!     .with_buffer_size(8 * 1024)
//!     .with_idle_timeout(Duration::from_secs(2))
//!     .with_callback(MyCallback);
//!
//! let writer = AsyncWriter::new(sink, config);
//! ```

use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;

use crate::callback::{Callback, NoopCallback};
use crate::queue::{LockFreeQueue, Queue};

/// Default staging buffer capacity in bytes
pub const DEFAULT_BUFFER_SIZE: usize = 2048;

/// Default drainer idle-state poll period
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(500);

/// Default idle duration before a non-empty staging buffer is flushed
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Tunables for [`AsyncWriter`](crate::AsyncWriter)
#[derive(Clone)]
pub struct Config {
    buffer_size: usize,
    heartbeat_interval: Duration,
    idle_timeout: Duration,
    callback: Arc<dyn Callback>,
    queue: Arc<dyn Queue>,
}

impl Config {
    /// Create a config with all defaults
    pub fn new() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            callback: Arc::new(NoopCallback),
            queue: Arc::new(LockFreeQueue::<BytesMut>::new()),
        }
    }

    /// Set the staging buffer capacity; zero falls back to the default
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Set the drainer's idle poll period
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set how long staging may sit idle before it is auto-flushed
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the write-failure callback
    #[must_use]
    pub fn with_callback(mut self, callback: impl Callback + 'static) -> Self {
        self.callback = Arc::new(callback);
        self
    }

    /// Replace the handoff queue implementation
    #[must_use]
    pub fn with_queue(mut self, queue: impl Queue + 'static) -> Self {
        self.queue = Arc::new(queue);
        self
    }

    /// Staging buffer capacity in bytes
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Drainer idle-state poll period
    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    /// Idle duration before a non-empty staging buffer is flushed
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    pub(crate) fn callback(&self) -> Arc<dyn Callback> {
        Arc::clone(&self.callback)
    }

    pub(crate) fn queue(&self) -> Arc<dyn Queue> {
        Arc::clone(&self.queue)
    }

    /// Coerce zero-valued fields back to their defaults
    pub(crate) fn normalized(mut self) -> Self {
        if self.buffer_size == 0 {
            self.buffer_size = DEFAULT_BUFFER_SIZE;
        }
        if self.heartbeat_interval.is_zero() {
            self.heartbeat_interval = DEFAULT_HEARTBEAT_INTERVAL;
        }
        if self.idle_timeout.is_zero() {
            self.idle_timeout = DEFAULT_IDLE_TIMEOUT;
        }
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("buffer_size", &self.buffer_size)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}
