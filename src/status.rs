//! Shared writer status
//!
//! Two independent atomic fields shared between the producer-facing facade and
//! the drainer. Producers only read `running`; the drainer owns
//! `last_drain_at`. The fields are never inspected as a consistent pair.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

/// Running flag plus the drainer's last-activity timestamp
#[derive(Debug, Default)]
pub struct Status {
    running: AtomicBool,
    last_drain_at: AtomicI64,
}

impl Status {
    /// Create a stopped status with no recorded drain activity
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            last_drain_at: AtomicI64::new(0),
        }
    }

    /// Whether the writer is accepting payloads
    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    /// Unix-ms timestamp of the drainer's most recent activity
    #[inline]
    pub fn last_drain_at(&self) -> i64 {
        self.last_drain_at.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_last_drain_at(&self, at_ms: i64) {
        self.last_drain_at.store(at_ms, Ordering::Relaxed);
    }
}
