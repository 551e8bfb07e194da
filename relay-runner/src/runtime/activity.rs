//! Activity-side context

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{debug, warn};

/// Handed to each activity attempt
///
/// Carries the attempt number, the liveness channel and the attempt's
/// cancellation token.
#[derive(Debug, Clone)]
pub struct ActivityContext {
    name: Arc<str>,
    attempt: u32,
    heartbeats: UnboundedSender<Value>,
    beats: Arc<AtomicU64>,
    cancel: CancellationToken,
}

impl ActivityContext {
    pub(crate) fn new(
        name: &str,
        attempt: u32,
        heartbeats: UnboundedSender<Value>,
        beats: Arc<AtomicU64>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            name: Arc::from(name),
            attempt,
            heartbeats,
            beats,
            cancel,
        }
    }

    /// Context that is not attached to a runtime
    ///
    /// Heartbeats land in the returned receiver. Useful for driving an
    /// activity directly.
    pub fn detached(name: &str) -> (Self, UnboundedReceiver<Value>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let ctx = Self::new(
            name,
            1,
            tx,
            Arc::new(AtomicU64::new(0)),
            CancellationToken::new(),
        );
        (ctx, rx)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 1-based attempt number
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Reports liveness with the given progress details
    pub fn heartbeat<T: Serialize>(&self, details: &T) {
        let details = match serde_json::to_value(details) {
            Ok(value) => value,
            Err(e) => {
                warn!(activity = %self.name, "Heartbeat details are not serializable: {}", e);
                Value::Null
            }
        };

        let count = self.beats.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(activity = %self.name, attempt = self.attempt, count, "Heartbeat");

        // The watchdog is gone once the attempt has been abandoned
        let _ = self.heartbeats.send(details);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves when the attempt is cancelled
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    /// Cancels this attempt
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_heartbeats_reach_receiver() {
        let (ctx, mut rx) = ActivityContext::detached("await_completion");
        ctx.heartbeat(&"queued");
        ctx.heartbeat(&serde_json::json!({"status": "in_progress"}));

        assert_eq!(rx.try_recv().unwrap(), Value::from("queued"));
        assert_eq!(rx.try_recv().unwrap()["status"], "in_progress");
        assert!(rx.try_recv().is_err());
        assert_eq!(ctx.attempt(), 1);
    }

    #[test]
    fn test_cancel() {
        let (ctx, _rx) = ActivityContext::detached("resolve");
        assert!(!ctx.is_cancelled());
        ctx.cancel();
        assert!(ctx.is_cancelled());
    }
}
