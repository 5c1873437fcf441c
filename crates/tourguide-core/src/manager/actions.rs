use std::sync::Weak;

use serde_json::Value;

use tourguide_protocols::{DismissReason, StepActions};

use super::ManagerInner;

/// Renderer callbacks bound to one step of one tour.
///
/// Holds the manager weakly; calls after the manager is dropped, or after
/// the step has moved on, do nothing.
pub(super) struct StepHandle {
    inner: Weak<ManagerInner>,
    tour_id: String,
    step_index: usize,
}

impl StepHandle {
    pub(super) fn new(inner: Weak<ManagerInner>, tour_id: &str, step_index: usize) -> Self {
        Self {
            inner,
            tour_id: tour_id.to_string(),
            step_index,
        }
    }
}

impl StepActions for StepHandle {
    fn next(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.advance(&self.tour_id, self.step_index, None);
        }
    }

    fn previous(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.retreat(&self.tour_id, self.step_index);
        }
    }

    fn dismiss(&self, reason: DismissReason) {
        if let Some(inner) = self.inner.upgrade() {
            inner.dismiss(&self.tour_id, self.step_index, reason);
        }
    }

    fn submit_survey(&self, response: Value) {
        if let Some(inner) = self.inner.upgrade() {
            inner.advance(&self.tour_id, self.step_index, Some(response));
        }
    }
}
