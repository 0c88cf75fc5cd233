//! Coarse shared clock
//!
//! The write path wants a timestamp without paying for a syscall per call.
//! The drainer stores the current unix-ms time into an atomic roughly once a
//! second; readers get the last stored value with a single relaxed load.
//! Idle-flush decisions are the only consumer, and they tolerate seconds of
//! skew.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Millisecond clock updated periodically by the drainer
#[derive(Debug)]
pub struct Clock {
    millis: AtomicI64,
}

impl Clock {
    /// Create a clock seeded with the current time
    pub fn new() -> Self {
        Self {
            millis: AtomicI64::new(unix_ms()),
        }
    }

    /// Last stored timestamp in unix milliseconds
    #[inline]
    pub fn now_ms(&self) -> i64 {
        self.millis.load(Ordering::Relaxed)
    }

    /// Store the current time; called from the drainer's tick loop
    #[inline]
    pub fn tick(&self) {
        self.millis.store(unix_ms(), Ordering::Relaxed);
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn unix_ms() -> i64 {
    Utc::now().timestamp_millis()
}
