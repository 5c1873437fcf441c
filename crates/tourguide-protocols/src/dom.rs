//! DOM provider protocol definitions.
//!
//! The host page is never touched directly. Everything the resolver and
//! orchestrator need from the page goes through [`DomProvider`], which lets
//! the same code run against a real browser binding or an in-memory snapshot.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::DomError;

/// Identity of a live node.
///
/// Two handles compare equal only if they refer to the same node. A node the
/// host re-creates during its own rendering gets a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Lazily evaluated query results, in document order.
pub type NodeIter<'a> = Box<dyn Iterator<Item = NodeId> + 'a>;

/// Whether a click should keep bubbling after a listener ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    Continue,
    Stop,
}

/// Click listener callback.
pub type ClickListener = Arc<dyn Fn() -> Propagation + Send + Sync>;

/// Handle returned when a listener is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerId(pub u64);

/// Subset of the computed style relevant to visibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedStyle {
    #[serde(default = "default_display")]
    pub display: String,
    #[serde(default = "default_visibility")]
    pub visibility: String,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

fn default_display() -> String {
    "block".to_string()
}

fn default_visibility() -> String {
    "visible".to_string()
}

fn default_opacity() -> f64 {
    1.0
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: default_display(),
            visibility: default_visibility(),
            opacity: default_opacity(),
        }
    }
}

impl ComputedStyle {
    /// True when this style alone hides the element.
    pub fn hides(&self) -> bool {
        self.display == "none"
            || self.visibility == "hidden"
            || self.visibility == "collapse"
            || self.opacity <= 0.0
    }
}

/// Rendered geometry of a node.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// True if the box has any rendered extent.
    pub fn has_extent(&self) -> bool {
        self.width > 0.0 || self.height > 0.0
    }
}

/// Narrow capability over the host page's DOM.
pub trait DomProvider: Send + Sync {
    /// Shadow-DOM-piercing query. Results are produced lazily.
    fn query_all(&self, selector: &str) -> Result<NodeIter<'_>, DomError>;

    /// Standard `querySelectorAll` over the light DOM only.
    fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, DomError>;

    /// Standard `querySelector` over the light DOM only.
    fn query_selector(&self, selector: &str) -> Result<Option<NodeId>, DomError> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn text_content(&self, node: NodeId) -> Option<String>;

    fn computed_style(&self, node: NodeId) -> Result<ComputedStyle, DomError>;

    /// Native visibility check accounting for opacity and CSS visibility.
    ///
    /// Returns `None` when the host has no such primitive.
    fn native_visibility(&self, _node: NodeId) -> Option<Result<bool, DomError>> {
        None
    }

    fn bounding_rect(&self, node: NodeId) -> Result<Rect, DomError>;

    fn client_rect_count(&self, node: NodeId) -> Result<usize, DomError>;

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<(), DomError>;

    fn remove_attribute(&self, node: NodeId, name: &str) -> Result<(), DomError>;

    fn add_click_listener(
        &self,
        node: NodeId,
        listener: ClickListener,
    ) -> Result<ListenerId, DomError>;

    /// Detach a listener. Unknown ids are ignored.
    fn remove_listener(&self, id: ListenerId);

    /// The page's current location.
    fn current_url(&self) -> String;
}
