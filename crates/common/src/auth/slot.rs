//! Single-resolution result slot
//!
//! Hands exactly one value from a producer (the loopback callback handler)
//! to exactly one consumer (the coordinator waiting with a deadline). The
//! first call to [`ResultSlot::resolve`] wins; later calls are refused and
//! observable only through their `false` return value.

use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::oneshot;

/// Why [`ResultWaiter::wait`] returned without a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WaitError {
    /// Deadline passed before the slot was resolved
    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    /// Producer side dropped without resolving
    #[error("result slot dropped without a value")]
    Abandoned,
}

/// Producer half: resolves at most once
#[derive(Debug)]
pub struct ResultSlot<T> {
    sender: Mutex<Option<oneshot::Sender<T>>>,
}

/// Consumer half: consumed by a single bounded wait
#[derive(Debug)]
pub struct ResultWaiter<T> {
    receiver: oneshot::Receiver<T>,
}

/// Create a connected slot/waiter pair.
#[must_use]
pub fn result_slot<T>() -> (ResultSlot<T>, ResultWaiter<T>) {
    let (sender, receiver) = oneshot::channel();
    (ResultSlot { sender: Mutex::new(Some(sender)) }, ResultWaiter { receiver })
}

impl<T> ResultSlot<T> {
    /// Deliver `value` if nothing has been delivered yet.
    ///
    /// Returns `true` for the first caller only. The value is dropped when
    /// the waiter has already given up.
    pub fn resolve(&self, value: T) -> bool {
        let Some(sender) = self.sender.lock().take() else {
            return false;
        };
        // A closed receiver means the waiter timed out; the slot is spent
        // either way.
        let _ = sender.send(value);
        true
    }

    /// Whether a value has already been delivered (or attempted).
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.sender.lock().is_none()
    }
}

impl<T> ResultWaiter<T> {
    /// Wait for the slot to resolve, at most `timeout`.
    ///
    /// # Errors
    /// - [`WaitError::TimedOut`] when the deadline passes first
    /// - [`WaitError::Abandoned`] when the producer is dropped unresolved
    pub async fn wait(self, timeout: Duration) -> Result<T, WaitError> {
        match tokio::time::timeout(timeout, self.receiver).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(WaitError::Abandoned),
            Err(_) => Err(WaitError::TimedOut(timeout)),
        }
    }
}
