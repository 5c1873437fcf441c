//! Pre-flight target validation.

use serde::Serialize;

use tourguide_protocols::{DomProvider, Tour};
use tourguide_resolver::{SelectorMatch, resolve_step_target};

/// Resolution result for one element-targeting step.
#[derive(Debug, Clone, Serialize)]
pub struct StepCheck {
    pub step_index: usize,
    pub step_id: String,
    /// Manual CSS selector, when the step has one.
    pub selector: Option<String>,
    /// Resolved through inference data rather than the manual selector.
    pub inferred: bool,
    #[serde(flatten)]
    pub result: SelectorMatch,
}

impl StepCheck {
    /// The step cannot be shown with the page as it is.
    pub fn is_failure(&self) -> bool {
        !self.result.is_usable()
    }

    /// Short description of how the target is found.
    pub fn label(&self) -> &str {
        match (&self.selector, self.inferred) {
            (_, true) => "(inferred)",
            (Some(selector), false) => selector,
            (None, false) => "-",
        }
    }
}

/// Resolve every element-targeting step the way it would be resolved at
/// render time.
///
/// Steps authored with inference data go through the fuzzy resolver, so an
/// element that has not rendered yet fails here instead of after the tour is
/// shown.
pub fn preflight<D: DomProvider + ?Sized>(
    dom: &D,
    tour: &Tour,
    default_precision: f64,
) -> Vec<StepCheck> {
    tour.steps
        .iter()
        .enumerate()
        .filter_map(|(index, step)| {
            let result = resolve_step_target(dom, step, default_precision)?;
            Some(StepCheck {
                step_index: index,
                step_id: step.id.clone(),
                selector: step.css_selector().map(str::to_string),
                inferred: step.uses_inference(),
                result,
            })
        })
        .collect()
}
