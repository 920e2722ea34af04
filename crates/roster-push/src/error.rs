use thiserror::Error;

/// Errors that can occur in the push delivery layer.
#[derive(Debug, Error)]
pub enum PushError {
    /// VAPID key material is missing or unusable.
    #[error("Push configuration error: {0}")]
    Config(String),

    /// Building the VAPID signature or message envelope failed.
    #[error("Push message build failed: {0}")]
    MessageBuild(String),

    /// The push endpoint rejected or failed the delivery attempt.
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// A delivery attempt exceeded its time budget.
    #[error("Delivery timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// The notification payload could not be serialized.
    #[error("Payload serialization failed: {0}")]
    Payload(#[from] serde_json::Error),

    /// Reading or pruning subscriptions failed.
    #[error(transparent)]
    Store(#[from] roster_store::StoreError),
}

pub type Result<T> = std::result::Result<T, PushError>;
