//! Error types for the delivery pipeline.
//!
//! A failed delivery is not an error: it is a ledger record with
//! `success = false`. These types cover the setup and lookup steps that
//! can stop a dispatch before any delivery is attempted.

/// The HTTP client could not be constructed.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// reqwest rejected the client configuration.
    #[error("failed to build delivery http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// A dispatch could not resolve its subscribers.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The registry lookup failed.
    #[error("subscription lookup failed: {0}")]
    Registry(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    /// The blocking lookup task panicked or was cancelled.
    #[error("subscription lookup task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
