//! Session identity and lifecycle tracking.
//!
//! # Responsibilities
//! - Number sessions per protocol for log correlation
//! - Count open sessions
//! - Let shutdown wait for sessions to drain

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::observability::metrics;
use crate::protocol::StreamProtocol;

/// Identifies one stream session in logs, e.g. `dict-42`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId {
    protocol: StreamProtocol,
    seq: u64,
}

impl SessionId {
    pub fn new(protocol: StreamProtocol, seq: u64) -> Self {
        Self { protocol, seq }
    }

    pub fn protocol(&self) -> StreamProtocol {
        self.protocol
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.protocol, self.seq)
    }
}

/// Shared count of open sessions across every stream listener.
///
/// Clones share one count and one id sequence.
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    active: Arc<watch::Sender<u64>>,
    next_seq: Arc<AtomicU64>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        let (active, _) = watch::channel(0);
        Self {
            active: Arc::new(active),
            next_seq: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Record a new session. Returns a guard that releases it on drop.
    pub fn track(&self, protocol: StreamProtocol) -> ConnectionGuard {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.active.send_modify(|n| *n += 1);
        metrics::session_opened(protocol);
        ConnectionGuard {
            active: Arc::clone(&self.active),
            id: SessionId::new(protocol, seq),
        }
    }

    /// Sessions currently open.
    pub fn active_count(&self) -> u64 {
        *self.active.borrow()
    }

    /// Wait until every session has closed or `timeout` elapses.
    ///
    /// Returns `true` when fully drained.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let mut rx = self.active.subscribe();
        let drained = match tokio::time::timeout(timeout, rx.wait_for(|n| *n == 0)).await {
            Ok(result) => result.is_ok(),
            Err(_) => false,
        };
        drained
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Held by a session task for as long as the session runs.
#[derive(Debug)]
pub struct ConnectionGuard {
    active: Arc<watch::Sender<u64>>,
    id: SessionId,
}

impl ConnectionGuard {
    pub fn id(&self) -> SessionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active.send_modify(|n| *n = n.saturating_sub(1));
        metrics::session_closed(self.id.protocol);
        tracing::trace!(session = %self.id, "Session released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential_per_tracker() {
        let tracker = ConnectionTracker::new();
        let a = tracker.track(StreamProtocol::Socketmap);
        let b = tracker.clone().track(StreamProtocol::Dict);
        assert_eq!(a.id().to_string(), "socketmap-1");
        assert_eq!(b.id().to_string(), "dict-2");
        assert_eq!(b.id().protocol(), StreamProtocol::Dict);
    }

    #[test]
    fn guards_keep_count() {
        let tracker = ConnectionTracker::new();
        let first = tracker.track(StreamProtocol::Socketmap);
        let second = tracker.clone().track(StreamProtocol::Dict);
        assert_eq!(tracker.active_count(), 2);

        drop(first);
        assert_eq!(tracker.active_count(), 1);
        drop(second);
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test]
    async fn drain_waits_for_guards() {
        let tracker = ConnectionTracker::new();
        let guard = tracker.track(StreamProtocol::Dict);
        assert!(!tracker.drain(Duration::from_millis(20)).await);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            drop(guard);
        });
        assert!(tracker.drain(Duration::from_secs(2)).await);
    }
}
