//! Step target resolution.

use tourguide_protocols::{DomProvider, Step};

use crate::exact::{SelectorMatch, match_selector};
use crate::fuzzy::find_element;

/// Resolve the element a step highlights.
///
/// Returns `None` for steps that do not target an element. Steps authored
/// with inference data use the fuzzy resolver unless pinned to their manual
/// selector; `default_precision` applies when the descriptor carries none.
pub fn resolve_step_target<D: DomProvider + ?Sized>(
    dom: &D,
    step: &Step,
    default_precision: f64,
) -> Option<SelectorMatch> {
    if !step.targets_element() {
        return None;
    }

    if step.uses_inference() {
        let mut selector = step.inference_data.clone()?;
        selector.precision.get_or_insert(default_precision);
        return Some(match find_element(dom, &selector) {
            Some(node) => SelectorMatch::found(node),
            None => SelectorMatch::not_found(),
        });
    }

    step.css_selector().map(|css| match_selector(dom, css))
}
