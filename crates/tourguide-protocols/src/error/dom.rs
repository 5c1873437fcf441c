//! DOM provider errors.

use thiserror::Error;

use crate::dom::NodeId;

#[derive(Debug, Error)]
pub enum DomError {
    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Node detached from document: {0}")]
    Detached(NodeId),

    #[error("Style computation failed: {0}")]
    StyleUnavailable(String),

    #[error("Listener error: {0}")]
    Listener(String),
}

impl DomError {
    pub fn invalid_selector(selector: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
            message: message.into(),
        }
    }
}
