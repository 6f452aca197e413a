//! Error types for store operations.

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated (duplicate listing id, email taken)
    #[error("{0}")]
    Conflict(String),

    /// A record failed validation before it was stored
    #[error("invalid record: {0}")]
    Invalid(String),

    /// A stored record could not be decoded
    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}
