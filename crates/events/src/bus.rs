//! In-process change bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`ChangeBus`] fans [`ChangeNotice`]s out to every subscriber. It is
//! designed to be shared via `Arc<ChangeBus>` across the application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// ChangeNotice
// ---------------------------------------------------------------------------

/// A table changed. Carries no row data: subscribers re-fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeNotice {
    /// Table that changed, e.g. `"events"`.
    pub table: String,

    /// `INSERT`, `UPDATE`, `DELETE`, or empty when unknown.
    pub operation: String,

    /// When the notice was received (UTC).
    pub received_at: DateTime<Utc>,
}

impl ChangeNotice {
    pub fn new(table: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            operation: operation.into(),
            received_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// ChangeBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out change bus.
///
/// # Usage
///
/// ```rust
/// use ensemble_events::bus::{ChangeBus, ChangeNotice};
///
/// let bus = ChangeBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(ChangeNotice::new("events", "INSERT"));
/// ```
pub struct ChangeBus {
    sender: broadcast::Sender<ChangeNotice>,
}

impl ChangeBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed notices are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a notice to all current subscribers.
    ///
    /// If there are no active subscribers the notice is silently dropped.
    pub fn publish(&self, notice: ChangeNotice) {
        // Ignore the SendError -- it only means there are zero receivers.
        let _ = self.sender.send(notice);
    }

    /// Subscribe to all notices published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotice> {
        self.sender.subscribe()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = ChangeBus::default();
        let mut rx = bus.subscribe();

        bus.publish(ChangeNotice::new("events", "UPDATE"));

        let received = rx.recv().await.expect("should receive the notice");
        assert_eq!(received.table, "events");
        assert_eq!(received.operation, "UPDATE");
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_notice() {
        let bus = ChangeBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(ChangeNotice::new("events", "DELETE"));

        let n1 = rx1.recv().await.expect("subscriber 1 should receive");
        let n2 = rx2.recv().await.expect("subscriber 2 should receive");
        assert_eq!(n1, n2);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = ChangeBus::default();
        bus.publish(ChangeNotice::new("events", "INSERT"));
    }
}
