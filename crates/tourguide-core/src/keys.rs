//! Persisted outcome keys.

/// Builds the keys tour outcomes are stored under.
#[derive(Debug, Clone, Default)]
pub struct OutcomeKeys {
    prefix: String,
}

impl OutcomeKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn completed(&self, tour_id: &str) -> String {
        format!("{}completed_{}", self.prefix, tour_id)
    }

    pub fn dismissed(&self, tour_id: &str) -> String {
        format!("{}dismissed_{}", self.prefix, tour_id)
    }

    pub fn last_seen(&self, tour_type: &str) -> String {
        format!("{}lastSeen_{}", self.prefix, tour_type)
    }
}

/// Person property marking a tour as completed on the user's profile.
pub fn completion_marker(tour_id: &str) -> String {
    format!("tour_completed_{}", tour_id)
}
