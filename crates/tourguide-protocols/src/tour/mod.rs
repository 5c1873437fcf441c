//! Tour definitions.
//!
//! Tours are authored elsewhere and fetched wholesale from a [`TourSource`].
//! They are immutable once fetched.
//!
//! [`TourSource`]: crate::source::TourSource

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod auto_data;
mod step;

pub use auto_data::*;
pub use step::*;

/// An authored sequence of steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tour {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Category used for wait-period bookkeeping.
    #[serde(default = "default_tour_type")]
    pub tour_type: String,

    #[serde(default)]
    pub steps: Vec<Step>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub conditions: Conditions,

    /// Element whose click manually activates this tour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_selector: Option<String>,

    #[serde(default)]
    pub display_frequency: DisplayFrequency,
}

fn default_tour_type() -> String {
    "product_tour".to_string()
}

impl Tour {
    pub fn new(id: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            tour_type: default_tour_type(),
            steps,
            start_date: None,
            end_date: None,
            conditions: Conditions::default(),
            trigger_selector: None,
            display_frequency: DisplayFrequency::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_trigger_selector(mut self, selector: impl Into<String>) -> Self {
        self.trigger_selector = Some(selector.into());
        self
    }

    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn with_dates(
        mut self,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> Self {
        self.start_date = start_date;
        self.end_date = end_date;
        self
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn is_last_step(&self, index: usize) -> bool {
        index + 1 >= self.steps.len()
    }

    /// Whether this tour is opt-in by click rather than auto-shown.
    pub fn has_trigger(&self) -> bool {
        self.trigger_selector
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }
}

/// Auto-start conditions. All declared conditions are ANDed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default)]
    pub url_match_type: UrlMatchType,

    /// Selector that must be present on the page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_flag_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_period: Option<WaitPeriod>,
}

/// How [`Conditions::url`] is compared against the current location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlMatchType {
    Exact,
    #[default]
    #[serde(alias = "icontains")]
    Contains,
    Regex,
}

/// Minimum quiet period since any tour of the listed types was last shown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitPeriod {
    pub days: u32,
    #[serde(default)]
    pub tour_types: Vec<String>,
}

/// Whether prior outcomes suppress future auto-starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayFrequency {
    /// Stop showing once completed or dismissed.
    #[default]
    UntilInteracted,
    Always,
}

#[cfg(test)]
#[path = "tour_tests.rs"]
mod tests;
