//! The active-tour slot.

use std::sync::Arc;

use tourguide_protocols::{DismissReason, RenderReason, Tour};

/// Where the single active tour is in its lifecycle.
///
/// `Completed` and `Dismissed` are held only while their side effects run;
/// the manager always returns to `Idle` afterwards.
#[derive(Debug, Clone, Default)]
pub enum TourState {
    #[default]
    Idle,
    Validating {
        tour: Arc<Tour>,
        render_reason: RenderReason,
    },
    Showing {
        tour: Arc<Tour>,
        step_index: usize,
        render_reason: RenderReason,
    },
    Completed {
        tour: Arc<Tour>,
    },
    Dismissed {
        tour: Arc<Tour>,
        reason: DismissReason,
    },
}

impl TourState {
    pub fn is_idle(&self) -> bool {
        matches!(self, TourState::Idle)
    }

    pub fn tour(&self) -> Option<&Arc<Tour>> {
        match self {
            TourState::Idle => None,
            TourState::Validating { tour, .. }
            | TourState::Showing { tour, .. }
            | TourState::Completed { tour }
            | TourState::Dismissed { tour, .. } => Some(tour),
        }
    }

    pub fn tour_id(&self) -> Option<&str> {
        self.tour().map(|t| t.id.as_str())
    }

    pub fn step_index(&self) -> Option<usize> {
        match self {
            TourState::Showing { step_index, .. } => Some(*step_index),
            _ => None,
        }
    }

    /// Whether this is `Showing` the given step of the given tour.
    pub fn is_showing(&self, tour_id: &str, index: usize) -> bool {
        matches!(
            self,
            TourState::Showing { tour, step_index, .. }
                if tour.id == tour_id && *step_index == index
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            TourState::Idle => "idle",
            TourState::Validating { .. } => "validating",
            TourState::Showing { .. } => "showing",
            TourState::Completed { .. } => "completed",
            TourState::Dismissed { .. } => "dismissed",
        }
    }
}
