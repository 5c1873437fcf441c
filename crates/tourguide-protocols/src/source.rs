//! Tour source protocol definitions.

use async_trait::async_trait;

use crate::error::SourceError;
use crate::tour::Tour;

/// Supplies the current candidate tours.
///
/// Implementations may serve a cached or stale list; each call's result is
/// treated as authoritative for one poll tick.
#[async_trait]
pub trait TourSource: Send + Sync {
    async fn tours(&self) -> Result<Vec<Tour>, SourceError>;
}
