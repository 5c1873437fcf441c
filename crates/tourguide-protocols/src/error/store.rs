//! Key-value store errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Storage quota exceeded for key: {0}")]
    QuotaExceeded(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}
