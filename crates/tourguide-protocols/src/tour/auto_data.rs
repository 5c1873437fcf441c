//! Fuzzy element descriptors generated at authoring time.

use serde::{Deserialize, Serialize};

/// Input to the fuzzy resolver for one logical target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementSelector {
    /// Serialized [`AutoData`]. Kept as a string so corrupt payloads degrade
    /// to "no match" instead of failing the whole tour definition.
    pub auto_data: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default)]
    pub exclude_text: bool,

    /// Strictness in `0.0..=1.0`; `1.0` searches only the most specific group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<f64>,
}

impl ElementSelector {
    pub fn new(auto_data: impl Into<String>) -> Self {
        Self {
            auto_data: auto_data.into(),
            text: None,
            exclude_text: false,
            precision: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_precision(mut self, precision: f64) -> Self {
        self.precision = Some(precision);
        self
    }

    pub fn excluding_text(mut self) -> Self {
        self.exclude_text = true;
        self
    }
}

/// Parsed descriptor bundle.
///
/// Both arrays are required; a payload missing either is structurally invalid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoData {
    pub text_groups: Vec<SelectorGroup>,
    pub notext_groups: Vec<SelectorGroup>,
}

/// Alternative CSS strategies for the same element, ranked by specificity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorGroup {
    /// Lower means more specific.
    pub cardinality: u32,
    pub css_selectors: Vec<SelectorEntry>,
}

/// One independent vote: a query and which surviving match to take.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorEntry {
    pub css: String,
    #[serde(default)]
    pub offset: usize,
}

impl SelectorEntry {
    pub fn new(css: impl Into<String>, offset: usize) -> Self {
        Self {
            css: css.into(),
            offset,
        }
    }
}
