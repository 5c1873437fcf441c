//! Renderer protocol definitions.
//!
//! Drawing tooltips, banners and surveys is the renderer's business. The
//! orchestrator only tells it what to show and receives user intent back
//! through [`StepActions`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dom::NodeId;
use crate::tour::{Step, Tour};

/// Why a tour started rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderReason {
    /// Passed eligibility on a poll tick.
    Auto,
    /// The tour's trigger element was clicked.
    Trigger,
    /// Shown programmatically.
    Api,
}

impl RenderReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderReason::Auto => "auto",
            RenderReason::Trigger => "trigger",
            RenderReason::Api => "api",
        }
    }
}

impl fmt::Display for RenderReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a tour ended without completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DismissReason {
    UserClickedSkip,
    UserClickedOutside,
    EscapeKey,
    /// The step's element could not be resolved at render time.
    ElementUnavailable,
    Api,
}

impl DismissReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DismissReason::UserClickedSkip => "user_clicked_skip",
            DismissReason::UserClickedOutside => "user_clicked_outside",
            DismissReason::EscapeKey => "escape_key",
            DismissReason::ElementUnavailable => "element_unavailable",
            DismissReason::Api => "api",
        }
    }

    /// Whether the user chose to leave the tour.
    pub fn is_user_initiated(&self) -> bool {
        !matches!(self, DismissReason::ElementUnavailable | DismissReason::Api)
    }
}

impl fmt::Display for DismissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the renderer needs to draw one step.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub tour: Arc<Tour>,
    pub step_index: usize,
    pub total_steps: usize,
    pub target: Option<NodeId>,
    /// Resolved container for banner steps.
    pub container: Option<NodeId>,
    pub render_reason: RenderReason,
}

impl RenderRequest {
    pub fn step(&self) -> Option<&Step> {
        self.tour.step(self.step_index)
    }
}

/// User intent flowing back from a rendered step.
///
/// Every method is safe to call repeatedly; calls that no longer match the
/// live step are ignored.
pub trait StepActions: Send + Sync {
    fn next(&self);

    fn previous(&self);

    fn dismiss(&self, reason: DismissReason);

    fn submit_survey(&self, response: serde_json::Value);
}

/// Presents steps on the page.
pub trait TourRenderer: Send + Sync {
    fn render(&self, request: RenderRequest, actions: Arc<dyn StepActions>);

    fn unmount(&self, tour_id: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dismiss_reason_codes() {
        assert_eq!(DismissReason::ElementUnavailable.as_str(), "element_unavailable");
        assert_eq!(DismissReason::EscapeKey.to_string(), "escape_key");
        assert!(DismissReason::UserClickedSkip.is_user_initiated());
        assert!(!DismissReason::ElementUnavailable.is_user_initiated());
    }

    #[test]
    fn test_dismiss_reason_serde() {
        let json = serde_json::to_string(&DismissReason::UserClickedOutside).unwrap();
        assert_eq!(json, "\"user_clicked_outside\"");
    }

    #[test]
    fn test_render_request_step() {
        let tour = Arc::new(Tour::new("t", vec![Step::modal("m")]));
        let request = RenderRequest {
            tour,
            step_index: 0,
            total_steps: 1,
            target: None,
            container: None,
            render_reason: RenderReason::Trigger,
        };
        assert_eq!(request.step().unwrap().id, "m");
        assert_eq!(request.render_reason.to_string(), "trigger");
    }
}
