//! Lock-free unbounded MPSC queue
//!
//! A Michael-Scott linked queue: a singly linked list with atomic head and
//! tail pointers and a sentinel node separating consumed from consumable
//! nodes. Producers attach a node by CAS'ing the tail's `next` pointer (the
//! linearization point) and then swing the tail forward with a best-effort
//! CAS; a lagging tail is repaired by whichever operation observes it next.
//! The consumer swings the head to the next node and takes that node's value,
//! making the node the new sentinel.
//!
//! Retired sentinels are reclaimed through `crossbeam::epoch`, which keeps
//! the push path free of locks and reference-count traffic. Head and tail
//! live on their own cache lines so producer and consumer traffic do not
//! false-share.

use std::fmt;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::{AtomicI64, Ordering};

use bytes::BytesMut;
use crossbeam::epoch::{self, Atomic, Owned, Shared};
use crossbeam::utils::CachePadded;

use crate::queue::Queue;

/// One link in the queue
///
/// The value slot is vacant (`MaybeUninit`) while the node serves as the
/// sentinel: the sentinel's value has either never existed (initial node) or
/// has already been moved out by the pop that installed it.
struct Node<T> {
    value: MaybeUninit<T>,
    next: Atomic<Node<T>>,
}

impl<T> Node<T> {
    fn sentinel() -> Self {
        Self {
            value: MaybeUninit::uninit(),
            next: Atomic::null(),
        }
    }

    fn new(value: T) -> Self {
        Self {
            value: MaybeUninit::new(value),
            next: Atomic::null(),
        }
    }
}

/// Unbounded lock-free queue with a non-blocking producer path
///
/// Many threads may `push` concurrently; `pop` is intended for a single
/// consumer but stays safe if misused concurrently (it CASes the head).
pub struct LockFreeQueue<T> {
    head: CachePadded<Atomic<Node<T>>>,
    tail: CachePadded<Atomic<Node<T>>>,
    length: AtomicI64,
}

// Safety: nodes are only dereferenced under an epoch guard, values move
// across threads exactly once (push to pop), and all shared mutation goes
// through atomics.
unsafe impl<T: Send> Send for LockFreeQueue<T> {}
unsafe impl<T: Send> Sync for LockFreeQueue<T> {}

impl<T> LockFreeQueue<T> {
    /// Create an empty queue
    pub fn new() -> Self {
        let queue = Self {
            head: CachePadded::new(Atomic::null()),
            tail: CachePadded::new(Atomic::null()),
            length: AtomicI64::new(0),
        };

        // Both pointers start at a shared sentinel
        unsafe {
            let guard = epoch::unprotected();
            let sentinel = Owned::new(Node::sentinel()).into_shared(guard);
            queue.head.store(sentinel, Ordering::Relaxed);
            queue.tail.store(sentinel, Ordering::Relaxed);
        }

        queue
    }

    /// Append a value to the tail
    ///
    /// Wait-free when uncontended; under contention retries only when another
    /// producer won the tail race, so some producer always makes progress.
    pub fn push(&self, value: T) {
        let guard = &epoch::pin();
        let new = Owned::new(Node::new(value)).into_shared(guard);

        loop {
            let tail = self.tail.load(Ordering::Acquire, guard);
            let tail_ref = unsafe { tail.deref() };
            let next = tail_ref.next.load(Ordering::Acquire, guard);

            if !next.is_null() {
                // Tail is lagging; repair it and retry
                let _ = self.tail.compare_exchange(
                    tail,
                    next,
                    Ordering::Release,
                    Ordering::Relaxed,
                    guard,
                );
                continue;
            }

            if tail_ref
                .next
                .compare_exchange(
                    Shared::null(),
                    new,
                    Ordering::Release,
                    Ordering::Relaxed,
                    guard,
                )
                .is_ok()
            {
                // Linked; the tail swing is best-effort
                let _ = self.tail.compare_exchange(
                    tail,
                    new,
                    Ordering::Release,
                    Ordering::Relaxed,
                    guard,
                );
                self.length.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
    }

    /// Take the oldest value, or `None` when the queue is empty
    pub fn pop(&self) -> Option<T> {
        let guard = &epoch::pin();

        loop {
            let head = self.head.load(Ordering::Acquire, guard);
            let head_ref = unsafe { head.deref() };
            let next = head_ref.next.load(Ordering::Acquire, guard);

            let next_ref = match unsafe { next.as_ref() } {
                Some(node) => node,
                None => return None,
            };

            // Never retire a sentinel the tail still points at: push a
            // lagging tail past it first
            let tail = self.tail.load(Ordering::Acquire, guard);
            if head == tail {
                let _ = self.tail.compare_exchange(
                    tail,
                    next,
                    Ordering::Release,
                    Ordering::Relaxed,
                    guard,
                );
            }

            if self
                .head
                .compare_exchange(head, next, Ordering::Release, Ordering::Relaxed, guard)
                .is_ok()
            {
                // The next node is the new sentinel; its value moves out here,
                // exactly once
                let value = unsafe { ptr::read(next_ref.value.as_ptr()) };
                unsafe { guard.defer_destroy(head) };
                self.length.fetch_sub(1, Ordering::Relaxed);
                return Some(value);
            }
        }
    }

    /// Approximate number of queued values
    pub fn len(&self) -> i64 {
        self.length.load(Ordering::Relaxed).max(0)
    }

    /// Whether the queue currently looks empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for LockFreeQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for LockFreeQueue<T> {
    fn drop(&mut self) {
        unsafe {
            let guard = epoch::unprotected();

            // First node is the sentinel; its value slot is vacant
            let mut node = self.head.load(Ordering::Relaxed, guard);
            let mut vacant = true;

            while !node.is_null() {
                let mut owned = node.into_owned();
                node = owned.next.load(Ordering::Relaxed, guard);
                if !vacant {
                    ptr::drop_in_place(owned.value.as_mut_ptr());
                }
                vacant = false;
            }
        }
    }
}

impl<T> fmt::Debug for LockFreeQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockFreeQueue")
            .field("length", &self.len())
            .finish()
    }
}

impl Queue for LockFreeQueue<BytesMut> {
    #[inline]
    fn push(&self, payload: BytesMut) {
        LockFreeQueue::push(self, payload);
    }

    #[inline]
    fn pop(&self) -> Option<BytesMut> {
        LockFreeQueue::pop(self)
    }

    #[inline]
    fn len(&self) -> i64 {
        LockFreeQueue::len(self)
    }
}

#[cfg(test)]
#[path = "lockfree_test.rs"]
mod lockfree_test;
