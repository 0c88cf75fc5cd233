//! Write-failure notification
//!
//! The drainer never fails the producer when the sink misbehaves; it keeps
//! going and reports each lost payload exactly once through this callback.

use std::io;

/// Receiver for asynchronous write failures
///
/// Invoked on the drainer thread. `content` holds the payload that could not
/// be delivered, or `None` when an idle flush of the staging buffer failed.
/// The slice is only valid for the duration of the call; implementations that
/// need the bytes longer must copy them.
pub trait Callback: Send + Sync {
    /// Called once for each payload (or idle flush) the sink rejected
    fn on_write_failed(&self, content: Option<&[u8]>, reason: &io::Error);
}

/// Default callback that discards all notifications
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCallback;

impl Callback for NoopCallback {
    fn on_write_failed(&self, _content: Option<&[u8]>, _reason: &io::Error) {}
}
