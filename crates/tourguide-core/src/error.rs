//! Error types for tour orchestration.

use thiserror::Error;

use tourguide_protocols::{SourceError, StoreError};
use tourguide_runloop::PollError;

/// Errors surfaced by [`TourManager`](crate::TourManager) entry points.
///
/// Poll ticks never return these; they log and carry on.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Tour not found: {0}")]
    TourNotFound(String),

    #[error("Tour {0} is already active")]
    TourActive(String),

    #[error("No tour is active")]
    NoActiveTour,

    #[error("Tour {tour_id} failed validation on {failures} step(s)")]
    ValidationFailed { tour_id: String, failures: usize },

    #[error("Tour {0} has no steps")]
    EmptyTour(String),

    #[error("Tour source error: {0}")]
    Source(#[from] SourceError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Poll loop error: {0}")]
    Poll(#[from] PollError),
}
