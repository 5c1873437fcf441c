//! Step definitions.

use serde::{Deserialize, Serialize};

use super::ElementSelector;

/// Kind of UI moment a step renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    #[default]
    Element,
    Modal,
    Survey,
    Banner,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Element => "element",
            StepType::Modal => "modal",
            StepType::Survey => "survey",
            StepType::Banner => "banner",
        }
    }
}

/// How the user moves past a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Progression {
    /// A "Next" button in the rendered step.
    #[default]
    Button,
    /// Clicking the highlighted element itself.
    Click,
}

/// One highlighted moment within a tour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub id: String,

    #[serde(default, rename = "type")]
    pub step_type: StepType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,

    /// Fuzzy descriptor captured at authoring time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inference_data: Option<ElementSelector>,

    /// Resolve with the exact selector even when inference data exists.
    #[serde(default)]
    pub use_manual_selector: bool,

    #[serde(default)]
    pub progression: Progression,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner_container_selector: Option<String>,

    /// Opaque content handed to the renderer.
    #[serde(default)]
    pub content: serde_json::Value,
}

impl Step {
    pub fn element(id: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            step_type: StepType::Element,
            selector: Some(selector.into()),
            inference_data: None,
            use_manual_selector: false,
            progression: Progression::Button,
            banner_container_selector: None,
            content: serde_json::Value::Null,
        }
    }

    pub fn modal(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            step_type: StepType::Modal,
            selector: None,
            inference_data: None,
            use_manual_selector: false,
            progression: Progression::Button,
            banner_container_selector: None,
            content: serde_json::Value::Null,
        }
    }

    pub fn with_inference(mut self, inference: ElementSelector) -> Self {
        self.inference_data = Some(inference);
        self
    }

    pub fn with_progression(mut self, progression: Progression) -> Self {
        self.progression = progression;
        self
    }

    pub fn with_type(mut self, step_type: StepType) -> Self {
        self.step_type = step_type;
        self
    }

    /// The exact selector, ignoring blank strings.
    pub fn css_selector(&self) -> Option<&str> {
        self.selector.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Whether this step highlights a page element at all.
    pub fn targets_element(&self) -> bool {
        matches!(self.step_type, StepType::Element | StepType::Survey)
            && (self.css_selector().is_some() || self.inference_data.is_some())
    }

    /// Whether resolution should use the fuzzy resolver.
    pub fn uses_inference(&self) -> bool {
        self.inference_data.is_some() && !(self.use_manual_selector && self.css_selector().is_some())
    }
}
