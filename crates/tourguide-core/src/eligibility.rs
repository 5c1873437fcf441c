//! Auto-start eligibility.
//!
//! Every declared condition must hold for a tour to start on its own. Checks
//! run cheapest first and stop at the first failure, which is returned so
//! callers can log or report it.

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use tourguide_protocols::{
    DisplayFrequency, DomProvider, FeatureFlags, KeyValueStore, Tour, UrlMatchType,
};

use crate::keys::OutcomeKeys;

/// Why a tour may not auto-start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Ineligibility {
    #[error("tour has no steps")]
    NoSteps,

    #[error("start date {0} is in the future")]
    NotStarted(DateTime<Utc>),

    #[error("end date {0} has passed")]
    Ended(DateTime<Utc>),

    #[error("current URL does not match '{0}'")]
    UrlMismatch(String),

    #[error("URL pattern '{0}' is not a valid regex")]
    InvalidUrlPattern(String),

    #[error("page selector '{0}' is absent")]
    SelectorAbsent(String),

    #[error("already completed")]
    Completed,

    #[error("already dismissed")]
    Dismissed,

    #[error("linked flag '{0}' is not enabled")]
    FlagDisabled(String),

    #[error("a '{tour_type}' tour was shown less than {days} day(s) ago")]
    WaitPeriod { tour_type: String, days: u32 },
}

/// Everything eligibility reads from the outside world.
pub struct EligibilityContext<'a> {
    pub dom: &'a dyn DomProvider,
    pub store: &'a dyn KeyValueStore,
    pub flags: &'a dyn FeatureFlags,
    pub keys: &'a OutcomeKeys,
    pub now: DateTime<Utc>,
}

impl EligibilityContext<'_> {
    pub fn is_eligible(&self, tour: &Tour) -> bool {
        match self.check(tour) {
            Ok(()) => true,
            Err(reason) => {
                debug!("Tour {} not eligible: {}", tour.id, reason);
                false
            }
        }
    }

    pub fn check(&self, tour: &Tour) -> Result<(), Ineligibility> {
        if tour.steps.is_empty() {
            return Err(Ineligibility::NoSteps);
        }
        self.check_dates(tour)?;
        self.check_url(tour)?;
        self.check_selector(tour)?;
        self.check_outcomes(tour)?;
        self.check_flag(tour)?;
        self.check_wait_period(tour)
    }

    fn check_dates(&self, tour: &Tour) -> Result<(), Ineligibility> {
        if let Some(start) = tour.start_date.filter(|start| *start > self.now) {
            return Err(Ineligibility::NotStarted(start));
        }
        if let Some(end) = tour.end_date.filter(|end| *end < self.now) {
            return Err(Ineligibility::Ended(end));
        }
        Ok(())
    }

    fn check_url(&self, tour: &Tour) -> Result<(), Ineligibility> {
        let Some(pattern) = tour.conditions.url.as_deref().filter(|u| !u.is_empty()) else {
            return Ok(());
        };
        let current = self.dom.current_url();
        let matched = match tour.conditions.url_match_type {
            UrlMatchType::Exact => current == pattern,
            UrlMatchType::Contains => current.to_lowercase().contains(&pattern.to_lowercase()),
            UrlMatchType::Regex => Regex::new(pattern)
                .map_err(|_| Ineligibility::InvalidUrlPattern(pattern.to_string()))?
                .is_match(&current),
        };
        if matched {
            Ok(())
        } else {
            Err(Ineligibility::UrlMismatch(pattern.to_string()))
        }
    }

    fn check_selector(&self, tour: &Tour) -> Result<(), Ineligibility> {
        let Some(selector) = tour.conditions.selector.as_deref().filter(|s| !s.trim().is_empty())
        else {
            return Ok(());
        };
        match self.dom.query_selector(selector) {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(Ineligibility::SelectorAbsent(selector.to_string())),
            Err(e) => {
                debug!("Page selector '{}' for tour {} failed: {}", selector, tour.id, e);
                Err(Ineligibility::SelectorAbsent(selector.to_string()))
            }
        }
    }

    fn check_outcomes(&self, tour: &Tour) -> Result<(), Ineligibility> {
        if tour.display_frequency == DisplayFrequency::Always {
            return Ok(());
        }
        if self.store.get_bool(&self.keys.completed(&tour.id)) {
            return Err(Ineligibility::Completed);
        }
        if self.store.get_bool(&self.keys.dismissed(&tour.id)) {
            return Err(Ineligibility::Dismissed);
        }
        Ok(())
    }

    fn check_flag(&self, tour: &Tour) -> Result<(), Ineligibility> {
        match tour.conditions.linked_flag_key.as_deref() {
            Some(key) if self.flags.get_flag(key) != Some(true) => {
                Err(Ineligibility::FlagDisabled(key.to_string()))
            }
            _ => Ok(()),
        }
    }

    /// An empty type list means the tour's own type.
    fn check_wait_period(&self, tour: &Tour) -> Result<(), Ineligibility> {
        let Some(wait) = tour.conditions.wait_period.as_ref().filter(|w| w.days > 0) else {
            return Ok(());
        };
        let own = [tour.tour_type.clone()];
        let types = if wait.tour_types.is_empty() {
            &own[..]
        } else {
            &wait.tour_types[..]
        };
        let window = Duration::days(i64::from(wait.days));

        for tour_type in types {
            let Some(seen) = self.last_seen(tour_type) else {
                continue;
            };
            if self.now - seen < window {
                return Err(Ineligibility::WaitPeriod {
                    tour_type: tour_type.clone(),
                    days: wait.days,
                });
            }
        }
        Ok(())
    }

    fn last_seen(&self, tour_type: &str) -> Option<DateTime<Utc>> {
        let key = self.keys.last_seen(tour_type);
        let raw = self.store.get(&key)?;
        let parsed = raw
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        if parsed.is_none() {
            debug!("Ignoring unreadable {}: {}", key, raw);
        }
        parsed
    }
}

#[cfg(test)]
#[path = "eligibility_tests.rs"]
mod tests;
