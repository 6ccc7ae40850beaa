//! Status broadcast: best-effort fan-out of health snapshots
//!
//! A thin wrapper over a tokio broadcast channel. Publishing pushes the
//! current snapshot to every live subscriber; delivery is at-most-once
//! with no acknowledgment and no backpressure. Subscribers that fall
//! behind or disconnect are dropped by the channel, never waited on,
//! and a publish with no subscribers is not an error.
//!
//! Subscribers only see snapshots published after they join; anyone
//! needing the current state immediately should read it from the
//! monitor's shared health map first.

use crate::origin::HealthSnapshot;
use tokio::sync::broadcast;

/// Channel capacity: snapshots are small and stale ones are worthless,
/// so a short buffer is enough before laggards start losing frames.
const CHANNEL_CAPACITY: usize = 64;

/// Fan-out handle for health snapshots
#[derive(Debug, Clone)]
pub struct StatusBroadcast {
    tx: broadcast::Sender<HealthSnapshot>,
}

impl StatusBroadcast {
    /// Create a broadcast channel with the default capacity
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Open a new subscription
    pub fn subscribe(&self) -> broadcast::Receiver<HealthSnapshot> {
        self.tx.subscribe()
    }

    /// Push a snapshot to every live subscriber
    ///
    /// Best-effort: send errors (no live subscribers) are swallowed.
    pub fn publish(&self, snapshot: HealthSnapshot) {
        let _ = self.tx.send(snapshot);
    }

    /// Number of currently live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for StatusBroadcast {
    fn default() -> Self {
        Self::new()
    }
}
