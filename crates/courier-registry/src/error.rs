//! Error types for the subscription registry.

use courier_types::ValidationError;

/// Errors that can occur during registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The subscription request was malformed. Nothing was stored.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A database operation failed.
    #[error("registry database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No pooled connection was available.
    #[error("registry connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// A stored row could not be decoded.
    #[error("corrupt subscription row: {0}")]
    Corrupt(String),
}
