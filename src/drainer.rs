//! Background drainer
//!
//! The single consumer side of the writer: pops payload buffers off the
//! queue, batches them through the staging buffer, and returns every buffer
//! to the pool. The loop has three states:
//!
//! - **Active**: the queue has payloads; pop and process without sleeping.
//! - **Idle**: the queue is empty; wait on the heartbeat ticker and flush
//!   staging once it has sat untouched for the idle timeout.
//! - **Stopping**: cancellation observed; drain the remainder, final-flush,
//!   exit.
//!
//! Sink failures are never fatal here. A lost payload is reported exactly
//! once through the callback and the loop moves on to the next buffer.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use crossbeam::channel::{tick, Receiver};
use crossbeam::select;

use crate::buffer_pool::BufferPool;
use crate::callback::Callback;
use crate::clock::Clock;
use crate::queue::Queue;
use crate::staging::Staging;
use crate::status::Status;

/// How often the shared coarse clock is refreshed
const CLOCK_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Queue consumer and staging owner, run on a dedicated thread
pub(crate) struct Drainer<W: Write> {
    queue: Arc<dyn Queue>,
    pool: Arc<BufferPool>,
    status: Arc<Status>,
    clock: Arc<Clock>,
    callback: Arc<dyn Callback>,
    staging: Staging<W>,
    cancel: Receiver<()>,
    heartbeat_interval: Duration,
    idle_timeout_ms: i64,
}

impl<W: Write> Drainer<W> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        queue: Arc<dyn Queue>,
        pool: Arc<BufferPool>,
        status: Arc<Status>,
        clock: Arc<Clock>,
        callback: Arc<dyn Callback>,
        staging: Staging<W>,
        cancel: Receiver<()>,
        heartbeat_interval: Duration,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            queue,
            pool,
            status,
            clock,
            callback,
            staging,
            cancel,
            heartbeat_interval,
            idle_timeout_ms: idle_timeout.as_millis() as i64,
        }
    }

    /// Run until cancelled, then hand the drainer back for the final pass
    pub(crate) fn run(mut self) -> Self {
        tracing::debug!(
            staging_capacity = self.staging.capacity(),
            heartbeat_ms = self.heartbeat_interval.as_millis() as u64,
            idle_timeout_ms = self.idle_timeout_ms,
            "drainer started"
        );

        let cancel = self.cancel.clone();
        let heartbeat = tick(self.heartbeat_interval);
        let clock_tick = tick(CLOCK_TICK_INTERVAL);

        loop {
            if let Some(payload) = self.queue.pop() {
                self.execute(payload);
                continue;
            }

            select! {
                recv(cancel) -> _ => {
                    self.drain_remaining();
                    self.final_flush();
                    tracing::debug!("drainer stopped");
                    return self;
                }
                recv(heartbeat) -> _ => self.maybe_idle_flush(),
                recv(clock_tick) -> _ => self.clock.tick(),
            }
        }
    }

    /// Deliver one payload buffer and return it to the pool
    fn execute(&mut self, payload: BytesMut) {
        self.status.set_last_drain_at(self.clock.now_ms());

        if !payload.is_empty() {
            if let Err(reason) = self.stage(&payload) {
                tracing::warn!(len = payload.len(), error = %reason, "payload lost to sink failure");
                self.callback.on_write_failed(Some(&payload), &reason);
            }
        }

        self.pool.release(payload);
    }

    /// Route a payload into staging or straight to the sink
    fn stage(&mut self, payload: &[u8]) -> std::io::Result<()> {
        if payload.len() > self.staging.available()
            && self.staging.buffered() > 0
            && self.staging.flush().is_err()
        {
            // Staging keeps its bytes; route this payload around it
            return self.staging.write_direct(payload);
        }

        if payload.len() >= self.staging.capacity() {
            return self.staging.write_direct(payload);
        }

        self.staging.append(payload);
        Ok(())
    }

    /// Flush staging if it has sat non-empty past the idle timeout
    fn maybe_idle_flush(&mut self) {
        if self.staging.buffered() == 0 {
            return;
        }

        let now = self.clock.now_ms();
        if now - self.status.last_drain_at() < self.idle_timeout_ms {
            return;
        }

        if let Err(reason) = self.staging.flush() {
            tracing::warn!(error = %reason, "idle flush failed");
            self.callback.on_write_failed(None, &reason);
        }
        self.status.set_last_drain_at(now);
    }

    /// Pop and deliver everything still queued
    pub(crate) fn drain_remaining(&mut self) {
        while let Some(payload) = self.queue.pop() {
            self.execute(payload);
        }
    }

    /// Flush staging at shutdown, reporting a failure through the callback
    fn final_flush(&mut self) {
        if let Err(reason) = self.staging.flush() {
            tracing::warn!(error = %reason, "final flush failed");
            self.callback.on_write_failed(None, &reason);
        }
    }

    /// Last pass on the stopping thread, after the worker has exited
    ///
    /// Catches payloads enqueued between the running-flag flip and the
    /// worker's cancellation check. On the normal path staging is already
    /// empty and the flush is a no-op.
    pub(crate) fn finish(&mut self) {
        self.drain_remaining();
        if let Err(reason) = self.staging.flush() {
            tracing::warn!(error = %reason, "flush during stop failed");
        }
    }
}
