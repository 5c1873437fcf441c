//! Telemetry protocol definitions.

use std::collections::HashMap;

/// Event property map.
pub type Properties = HashMap<String, serde_json::Value>;

/// Fire-and-forget analytics sink. Must never block orchestration.
pub trait Telemetry: Send + Sync {
    fn capture(&self, event: &str, properties: Properties);

    /// Write properties onto the current user's profile.
    fn set_person_properties(&self, _properties: Properties) {}
}
