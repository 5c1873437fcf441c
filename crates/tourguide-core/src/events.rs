//! Telemetry event taxonomy.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::debug;

use tourguide_protocols::{DismissReason, Properties, RenderReason, Telemetry, Tour};
use tourguide_resolver::SelectorMatch;

pub const TOUR_SHOWN: &str = "tour shown";
pub const TOUR_DISMISSED: &str = "tour dismissed";
pub const TOUR_COMPLETED: &str = "tour completed";
pub const STEP_SHOWN: &str = "tour step shown";
pub const STEP_COMPLETED: &str = "tour step completed";
pub const STEP_SELECTOR_FAILED: &str = "tour step selector failed";
pub const BANNER_CONTAINER_FAILED: &str = "tour banner container selector failed";

/// Where a selector failure was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePhase {
    /// Pre-flight check before the tour is shown.
    Validation,
    /// Resolving a step right before rendering it.
    Runtime,
}

impl FailurePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePhase::Validation => "validation",
            FailurePhase::Runtime => "runtime",
        }
    }
}

/// Builds and sends tour events through a [`Telemetry`] sink.
#[derive(Clone)]
pub struct EventEmitter {
    sink: Arc<dyn Telemetry>,
    enabled: bool,
}

impl EventEmitter {
    pub fn new(sink: Arc<dyn Telemetry>, enabled: bool) -> Self {
        Self { sink, enabled }
    }

    pub fn tour_shown(&self, tour: &Tour, reason: RenderReason) {
        let mut props = tour_props(tour);
        props.insert("total_steps".into(), json!(tour.total_steps()));
        props.insert("render_reason".into(), json!(reason.as_str()));
        self.capture(TOUR_SHOWN, props);
    }

    pub fn step_shown(&self, tour: &Tour, index: usize, reason: RenderReason) {
        let mut props = step_props(tour, index);
        props.insert("render_reason".into(), json!(reason.as_str()));
        self.capture(STEP_SHOWN, props);
    }

    pub fn step_completed(&self, tour: &Tour, index: usize, survey_response: Option<Value>) {
        let mut props = step_props(tour, index);
        if let Some(response) = survey_response {
            props.insert("survey_response".into(), response);
        }
        self.capture(STEP_COMPLETED, props);
    }

    pub fn tour_completed(&self, tour: &Tour) {
        let mut props = tour_props(tour);
        props.insert("total_steps".into(), json!(tour.total_steps()));
        self.capture(TOUR_COMPLETED, props);
    }

    pub fn tour_dismissed(&self, tour: &Tour, index: Option<usize>, reason: DismissReason) {
        let mut props = match index {
            Some(index) => step_props(tour, index),
            None => tour_props(tour),
        };
        props.insert("dismiss_reason".into(), json!(reason.as_str()));
        self.capture(TOUR_DISMISSED, props);
    }

    pub fn selector_failed(
        &self,
        tour: &Tour,
        index: usize,
        selector: Option<&str>,
        result: &SelectorMatch,
        phase: FailurePhase,
    ) {
        let mut props = selector_props(tour, index, selector, result);
        props.insert("phase".into(), json!(phase.as_str()));
        self.capture(STEP_SELECTOR_FAILED, props);
    }

    pub fn banner_container_failed(
        &self,
        tour: &Tour,
        index: usize,
        selector: &str,
        result: &SelectorMatch,
    ) {
        let props = selector_props(tour, index, Some(selector), result);
        self.capture(BANNER_CONTAINER_FAILED, props);
    }

    pub fn set_person_properties(&self, props: Properties) {
        if self.enabled {
            self.sink.set_person_properties(props);
        }
    }

    fn capture(&self, event: &str, props: Properties) {
        if !self.enabled {
            return;
        }
        debug!("Capturing '{}' ({} properties)", event, props.len());
        self.sink.capture(event, props);
    }
}

fn tour_props(tour: &Tour) -> Properties {
    Properties::from([
        ("tour_id".to_string(), json!(tour.id)),
        ("tour_name".to_string(), json!(tour.name)),
        ("tour_type".to_string(), json!(tour.tour_type)),
    ])
}

fn step_props(tour: &Tour, index: usize) -> Properties {
    let mut props = tour_props(tour);
    props.insert("step_index".into(), json!(index));
    props.insert("total_steps".into(), json!(tour.total_steps()));
    if let Some(step) = tour.step(index) {
        props.insert("step_id".into(), json!(step.id));
        props.insert("step_type".into(), json!(step.step_type.as_str()));
    }
    props
}

fn selector_props(
    tour: &Tour,
    index: usize,
    selector: Option<&str>,
    result: &SelectorMatch,
) -> Properties {
    let mut props = step_props(tour, index);
    props.insert("selector".into(), json!(selector));
    props.insert("error".into(), json!(result.error.map(|e| e.as_str())));
    props.insert("match_count".into(), json!(result.match_count));
    props
}
