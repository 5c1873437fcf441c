//! Exact single-selector matching with error classification.

use serde::{Deserialize, Serialize};
use tracing::debug;

use tourguide_protocols::{DomProvider, NodeId};

use crate::visibility::{VisibilityCache, is_visible};

/// Why a selector did not yield exactly one visible element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchError {
    NotFound,
    NotVisible,
    MultipleMatches,
}

impl MatchError {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchError::NotFound => "not_found",
            MatchError::NotVisible => "not_visible",
            MatchError::MultipleMatches => "multiple_matches",
        }
    }

    /// Whether a step targeting this selector cannot be shown.
    pub fn is_blocking(&self) -> bool {
        matches!(self, MatchError::NotFound | MatchError::NotVisible)
    }
}

impl std::fmt::Display for MatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`match_selector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorMatch {
    pub element: Option<NodeId>,
    pub error: Option<MatchError>,
    pub match_count: usize,
}

impl SelectorMatch {
    pub fn found(element: NodeId) -> Self {
        Self {
            element: Some(element),
            error: None,
            match_count: 1,
        }
    }

    pub fn not_found() -> Self {
        Self {
            element: None,
            error: Some(MatchError::NotFound),
            match_count: 0,
        }
    }

    /// An element is usable, possibly with an ambiguity warning.
    pub fn is_usable(&self) -> bool {
        self.element.is_some() && !self.error.is_some_and(|e| e.is_blocking())
    }
}

/// Match `css` against the light DOM.
///
/// A malformed selector classifies as [`MatchError::NotFound`]. With several
/// matches the first is returned and flagged as ambiguous; its visibility is
/// still checked first.
pub fn match_selector<D: DomProvider + ?Sized>(dom: &D, css: &str) -> SelectorMatch {
    let matches = match dom.query_selector_all(css) {
        Ok(matches) => matches,
        Err(e) => {
            debug!("Selector '{}' could not be queried: {}", css, e);
            return SelectorMatch::not_found();
        }
    };

    let Some(&first) = matches.first() else {
        return SelectorMatch::not_found();
    };

    let match_count = matches.len();
    if !is_visible(dom, first, &mut VisibilityCache::new()) {
        return SelectorMatch {
            element: None,
            error: Some(MatchError::NotVisible),
            match_count,
        };
    }

    SelectorMatch {
        element: Some(first),
        error: (match_count > 1).then_some(MatchError::MultipleMatches),
        match_count,
    }
}
