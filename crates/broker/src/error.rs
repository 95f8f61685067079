/// Errors raised by the broker link.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// The configured broker URL could not be understood.
    #[error("Invalid broker address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// The link is not currently connected to the broker.
    #[error("Broker link is not connected")]
    NotConnected,

    /// The publish request could not be queued.
    #[error("Publish failed: {0}")]
    Publish(String),

    /// The link has already been closed.
    #[error("Broker link is closed")]
    Closed,
}
