//! Tour source errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Tour definitions unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid tour definition: {0}")]
    InvalidDefinition(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
