//! Feature flag protocol definitions.

/// Evaluates linked feature flags.
pub trait FeatureFlags: Send + Sync {
    /// `None` when the flag is unknown or not yet loaded.
    fn get_flag(&self, key: &str) -> Option<bool>;
}
