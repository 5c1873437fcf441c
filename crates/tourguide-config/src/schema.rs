//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use tourguide_runloop::PollConfig;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub poll: PollConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Element resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Precision for fuzzy descriptors that carry none. 1.0 searches only the
    /// most specific selector group, 0.0 searches all of them.
    #[serde(default = "default_precision")]
    pub default_precision: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            default_precision: default_precision(),
        }
    }
}

fn default_precision() -> f64 {
    1.0
}

/// Outcome persistence settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Prepended to every persisted key.
    #[serde(default)]
    pub key_prefix: String,
}

/// Analytics settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
        }
    }
}

fn default_telemetry_enabled() -> bool {
    true
}

/// Log output settings. `RUST_LOG` takes precedence over `level`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `pretty` or `json`.
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for daily-rotated log files. Console only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}
