//! Configuration for the tour manager.

use serde::{Deserialize, Serialize};

use tourguide_runloop::PollConfig;

/// Tour manager configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerConfig {
    #[serde(default)]
    pub poll: PollConfig,

    /// Fuzzy resolver precision for steps that do not set one.
    #[serde(default = "default_precision")]
    pub default_precision: f64,

    /// Prepended to every persisted key.
    #[serde(default)]
    pub key_prefix: String,

    #[serde(default = "default_telemetry_enabled")]
    pub telemetry_enabled: bool,
}

fn default_precision() -> f64 {
    tourguide_resolver::DEFAULT_PRECISION
}

fn default_telemetry_enabled() -> bool {
    true
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            poll: PollConfig::default(),
            default_precision: default_precision(),
            key_prefix: String::new(),
            telemetry_enabled: default_telemetry_enabled(),
        }
    }
}
