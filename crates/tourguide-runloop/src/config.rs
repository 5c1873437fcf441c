//! Configuration for the poll loop.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Poll loop configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Interval between ticks in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Suspend ticking while the host page is hidden.
    #[serde(default = "default_pause_when_hidden")]
    pub pause_when_hidden: bool,
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_pause_when_hidden() -> bool {
    true
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            pause_when_hidden: default_pause_when_hidden(),
        }
    }
}

impl PollConfig {
    /// Config ticking every `interval`.
    pub fn every(interval: Duration) -> Self {
        Self {
            interval_ms: interval.as_millis() as u64,
            ..Self::default()
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
