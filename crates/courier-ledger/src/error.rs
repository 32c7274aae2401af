//! Error types for the delivery ledger.

/// Errors that can occur during ledger operations.
///
/// A failed write breaks the audit guarantee for that attempt, so callers
/// must surface it rather than swallow it.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// A database operation failed.
    #[error("ledger database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No pooled connection was available.
    #[error("ledger connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// JSON serialization or deserialization failed.
    #[error("ledger serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row could not be decoded.
    #[error("corrupt delivery record: {0}")]
    Corrupt(String),
}
