//! Key-value persistence protocol definitions.

use crate::error::StoreError;

/// Generic get/set store for tour outcomes.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<serde_json::Value>;

    fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError>;

    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Read a boolean flag; anything other than `true` counts as unset.
    fn get_bool(&self, key: &str) -> bool {
        matches!(self.get(key), Some(serde_json::Value::Bool(true)))
    }
}
