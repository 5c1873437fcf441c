//! Snapshot loading errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Duplicate node id: {0}")]
    DuplicateNode(u64),

    #[error("Node {node} references unknown parent {parent}")]
    UnknownParent { node: u64, parent: u64 },

    #[error("Node {node} appears before its parent {parent}")]
    OutOfOrder { node: u64, parent: u64 },
}
