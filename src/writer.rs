//! Producer-facing writer facade
//!
//! `AsyncWriter` is the public entry point: `write` copies the payload into a
//! pooled buffer and pushes it onto the queue, `stop` shuts the background
//! drainer down and delivers everything still in flight. The write path never
//! touches the sink, so a slow sink costs producers a push and a memcpy, not
//! an I/O wait.

use std::io::{self, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{bounded, Sender};
use parking_lot::Mutex;

use crate::buffer_pool::BufferPool;
use crate::clock::Clock;
use crate::config::Config;
use crate::drainer::Drainer;
use crate::error::{Error, Result};
use crate::queue::Queue;
use crate::staging::Staging;
use crate::status::Status;

/// Asynchronous writer in front of a slow byte sink
///
/// Producers on any number of threads call [`write`](Self::write); a single
/// background thread drains the queue and batches into the sink. Dropping the
/// writer stops it.
///
/// # Example
///
/// ```
/// use drainpipe::{AsyncWriter, Config};
///
/// let writer = AsyncWriter::new(Vec::<u8>::new(), Config::new());
/// writer.write(b"hello").unwrap();
/// writer.stop();
/// ```
pub struct AsyncWriter<W: Write + Send + 'static> {
    queue: Arc<dyn Queue>,
    pool: Arc<BufferPool>,
    status: Arc<Status>,
    cancel: Sender<()>,
    worker: Mutex<Option<JoinHandle<Drainer<W>>>>,
}

impl<W: Write + Send + 'static> AsyncWriter<W> {
    /// Create a writer and start its drainer thread
    pub fn new(sink: W, config: Config) -> Self {
        let config = config.normalized();

        let queue = config.queue();
        let pool = Arc::new(BufferPool::new());
        let status = Arc::new(Status::new());
        let clock = Arc::new(Clock::new());

        status.set_last_drain_at(clock.now_ms());
        status.set_running(true);

        let (cancel, cancel_rx) = bounded(1);
        let drainer = Drainer::new(
            Arc::clone(&queue),
            Arc::clone(&pool),
            Arc::clone(&status),
            clock,
            config.callback(),
            Staging::new(sink, config.buffer_size()),
            cancel_rx,
            config.heartbeat_interval(),
            config.idle_timeout(),
        );

        let worker = thread::Builder::new()
            .name("drainpipe-drainer".into())
            .spawn(move || drainer.run())
            .expect("failed to spawn drainer thread");

        Self {
            queue,
            pool,
            status,
            cancel,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Enqueue a payload for asynchronous delivery
    ///
    /// Returns the payload length on success. An empty payload is accepted
    /// and enqueues nothing. Fails only with [`Error::Closed`] after
    /// [`stop`](Self::stop); sink failures surface through the configured
    /// [`Callback`](crate::Callback) instead.
    pub fn write(&self, payload: &[u8]) -> Result<usize> {
        if !self.status.is_running() {
            return Err(Error::Closed);
        }
        if payload.is_empty() {
            return Ok(0);
        }

        let mut buf = self.pool.acquire(payload.len());
        buf.extend_from_slice(payload);
        self.queue.push(buf);

        Ok(payload.len())
    }

    /// Stop the writer and deliver everything already accepted
    ///
    /// Flips the running flag, cancels the drainer, waits for it to drain the
    /// queue and final-flush staging, then sweeps up anything enqueued during
    /// the handover. Idempotent: later calls return immediately.
    pub fn stop(&self) {
        let mut slot = self.worker.lock();
        let Some(worker) = slot.take() else {
            return;
        };

        self.status.set_running(false);
        let _ = self.cancel.send(());

        match worker.join() {
            Ok(mut drainer) => drainer.finish(),
            Err(_) => tracing::error!("drainer thread panicked"),
        }
    }

    /// Approximate number of payloads waiting in the queue
    pub fn queued(&self) -> i64 {
        self.queue.len()
    }
}

impl AsyncWriter<io::Stdout> {
    /// Writer draining to standard output
    pub fn stdout(config: Config) -> Self {
        Self::new(io::stdout(), config)
    }
}

impl<W: Write + Send + 'static> Write for AsyncWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        AsyncWriter::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<W: Write + Send + 'static> Write for &AsyncWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        AsyncWriter::write(*self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<W: Write + Send + 'static> Drop for AsyncWriter<W> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<W: Write + Send + 'static> std::fmt::Debug for AsyncWriter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncWriter")
            .field("running", &self.status.is_running())
            .field("queued", &self.queue.len())
            .finish()
    }
}
