//! Producer-to-drainer handoff queue
//!
//! The queue is the only structure both sides mutate. Producers must never
//! block on each other or on the drainer, so the default implementation is a
//! lock-free linked queue; anything honoring the [`Queue`] contract can be
//! swapped in through [`Config::with_queue`](crate::Config::with_queue).

use bytes::BytesMut;

mod lockfree;

pub use lockfree::LockFreeQueue;

/// Unbounded multi-producer / single-consumer queue of payload buffers
///
/// # Contract
///
/// - `push` must not fail and must not block on other producers or the
///   consumer: wait-free uncontended, at worst lock-free under contention.
/// - `pop` is only called from the drainer thread and must not block.
/// - `len` is advisory and may be approximate under concurrent updates.
/// - Per-producer FIFO: payloads pushed by one thread are popped in the order
///   that thread pushed them. No total order across producers is promised.
pub trait Queue: Send + Sync {
    /// Append a payload buffer; ownership transfers to the queue
    fn push(&self, payload: BytesMut);

    /// Take the oldest queued buffer, or `None` when the queue is empty
    fn pop(&self) -> Option<BytesMut>;

    /// Approximate number of queued buffers
    fn len(&self) -> i64;

    /// Whether the queue currently looks empty (advisory, like `len`)
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
