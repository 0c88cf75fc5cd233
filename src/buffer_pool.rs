//! Size-classed pool of payload buffers
//!
//! Every `write` copies its payload into a pooled `BytesMut` before handing it
//! to the queue, and the drainer returns the buffer after the bytes reach the
//! staging buffer. Pooling keeps the hot path free of per-write allocation
//! once the working set is warm.
//!
//! # Size classes
//!
//! Buffers are shelved by capacity into three classes (1 KiB, 8 KiB, 32 KiB).
//! `acquire` serves a request from the smallest class that fits, falling back
//! to a larger shelf before allocating. Buffers that grew past the oversize
//! limit are dropped on release so a burst of huge payloads cannot pin memory
//! forever.
//!
//! Each shelf keeps its own reuse/allocation counters, so [`PoolStats`] shows
//! which classes the workload actually exercises.
//!
//! # Example
//!
//! ```ignore
//! let pool = BufferPool::new();
//!
//! let mut buf = pool.acquire(payload.len());
//! buf.extend_from_slice(payload);
//! // ... hand off, then later:
//! pool.release(buf);
//! ```

use std::sync::atomic::{AtomicI64, Ordering};

use bytes::BytesMut;
use crossbeam::queue::ArrayQueue;

/// Shelf capacities, smallest first
pub const SIZE_CLASSES: [usize; 3] = [1024, 8 * 1024, 32 * 1024];

/// Buffers retained per size class
const SHELF_DEPTH: usize = 128;

/// Buffers whose capacity grew beyond this are never pooled
const OVERSIZE_LIMIT: usize = 64 * 1024;

/// One size class: its buffers plus its traffic counters
struct Shelf {
    slots: ArrayQueue<BytesMut>,
    capacity: usize,
    reused: AtomicI64,
    allocated: AtomicI64,
    shelved: AtomicI64,
}

impl Shelf {
    fn new(capacity: usize) -> Self {
        Self {
            slots: ArrayQueue::new(SHELF_DEPTH),
            capacity,
            reused: AtomicI64::new(0),
            allocated: AtomicI64::new(0),
            shelved: AtomicI64::new(0),
        }
    }
}

/// Lock-free pool of reusable `BytesMut` buffers
///
/// `acquire` and `release` are O(1) lock-free shelf operations; allocation
/// only happens on a shelf miss.
pub struct BufferPool {
    shelves: [Shelf; 3],
    oversize_allocs: AtomicI64,
    discarded: AtomicI64,
}

impl BufferPool {
    /// Create an empty pool; buffers are allocated lazily on first use
    pub fn new() -> Self {
        Self {
            shelves: [
                Shelf::new(SIZE_CLASSES[0]),
                Shelf::new(SIZE_CLASSES[1]),
                Shelf::new(SIZE_CLASSES[2]),
            ],
            oversize_allocs: AtomicI64::new(0),
            discarded: AtomicI64::new(0),
        }
    }

    /// Get an empty buffer with capacity of at least `size_hint` bytes
    ///
    /// Serves from the smallest fitting shelf, trying larger shelves before
    /// allocating. Oversize requests always allocate and are never pooled on
    /// the way back.
    pub fn acquire(&self, size_hint: usize) -> BytesMut {
        let Some(class) = class_for_hint(size_hint) else {
            self.oversize_allocs.fetch_add(1, Ordering::Relaxed);
            return BytesMut::with_capacity(size_hint);
        };

        for shelf in &self.shelves[class..] {
            if let Some(buf) = shelf.slots.pop() {
                shelf.reused.fetch_add(1, Ordering::Relaxed);
                return buf;
            }
        }

        let shelf = &self.shelves[class];
        shelf.allocated.fetch_add(1, Ordering::Relaxed);
        BytesMut::with_capacity(shelf.capacity)
    }

    /// Clear a buffer and put it back on its shelf
    ///
    /// Buffers below the smallest class or above the oversize limit are
    /// dropped, as is anything arriving at a full shelf.
    pub fn release(&self, mut buf: BytesMut) {
        buf.clear();

        let capacity = buf.capacity();
        if capacity <= OVERSIZE_LIMIT {
            if let Some(class) = class_for_capacity(capacity) {
                let shelf = &self.shelves[class];
                if shelf.slots.push(buf).is_ok() {
                    shelf.shelved.fetch_add(1, Ordering::Relaxed);
                    return;
                }
            }
        }

        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Total buffers currently shelved across all classes
    pub fn shelved(&self) -> usize {
        self.shelves.iter().map(|shelf| shelf.slots.len()).sum()
    }

    /// Counter snapshot for observability
    pub fn stats(&self) -> PoolStats {
        let mut classes = [ClassStats::default(); 3];
        for (stats, shelf) in classes.iter_mut().zip(&self.shelves) {
            stats.reused = shelf.reused.load(Ordering::Relaxed);
            stats.allocated = shelf.allocated.load(Ordering::Relaxed);
            stats.shelved = shelf.shelved.load(Ordering::Relaxed);
        }

        PoolStats {
            classes,
            oversize_allocs: self.oversize_allocs.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("shelved", &self.shelved())
            .field("stats", &self.stats())
            .finish()
    }
}

/// Smallest class whose capacity covers `hint`, or `None` for oversize hints
#[inline]
fn class_for_hint(hint: usize) -> Option<usize> {
    SIZE_CLASSES.iter().position(|&cap| hint <= cap)
}

/// Largest class a buffer of `capacity` can serve, or `None` if undersized
#[inline]
fn class_for_capacity(capacity: usize) -> Option<usize> {
    SIZE_CLASSES.iter().rposition(|&cap| cap <= capacity)
}

/// Traffic through one size class
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassStats {
    /// Acquires served from this shelf
    pub reused: i64,

    /// Acquires for this class that had to allocate
    pub allocated: i64,

    /// Buffers returned to this shelf
    pub shelved: i64,
}

/// Point-in-time view of pool traffic, by size class
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolStats {
    /// Per-class counters, indexed like [`SIZE_CLASSES`]
    pub classes: [ClassStats; 3],

    /// Acquires too large for any class; these allocate exactly
    pub oversize_allocs: i64,

    /// Buffers dropped on release (oversize, undersized, or full shelf)
    pub discarded: i64,
}

impl PoolStats {
    /// Acquires across all classes, shelved and allocated alike
    pub fn total_acquires(&self) -> i64 {
        let classed: i64 = self
            .classes
            .iter()
            .map(|class| class.reused + class.allocated)
            .sum();
        classed + self.oversize_allocs
    }

    /// Fraction of acquires served without allocating (1.0 when unused)
    pub fn reuse_rate(&self) -> f64 {
        let total = self.total_acquires();
        if total == 0 {
            return 1.0;
        }
        let reused: i64 = self.classes.iter().map(|class| class.reused).sum();
        reused as f64 / total as f64
    }
}

#[cfg(test)]
#[path = "buffer_pool_test.rs"]
mod buffer_pool_test;
