//! Transport-agnostic broker link abstractions.
//!
//! The badge session manager only talks to these traits, so tests can swap
//! the MQTT link for an in-memory one.

use async_trait::async_trait;

use crate::error::BrokerError;

/// One live connection to a message broker.
///
/// Implementations must release their connection in [`close`](Self::close)
/// and also when dropped without being closed.
#[async_trait]
pub trait MessageLink: Send + Sync {
    /// Whether the broker connection is currently up.
    fn is_healthy(&self) -> bool;

    /// Publish `body` on `topic` with at-least-once delivery and no retention.
    async fn publish(&self, topic: &str, body: &str) -> Result<(), BrokerError>;

    /// Disconnect and stop reconnecting. Idempotent.
    async fn close(&self);
}

/// Opens new [`MessageLink`]s, one per caller.
#[async_trait]
pub trait LinkConnector: Send + Sync {
    async fn open(&self) -> Result<Box<dyn MessageLink>, BrokerError>;
}
