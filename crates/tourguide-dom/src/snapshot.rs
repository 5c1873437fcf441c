//! Serializable page capture.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use tourguide_protocols::{ComputedStyle, NodeId, Rect};

use crate::error::SnapshotError;

/// One element of a captured page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub id: u64,

    /// Tag name (lowercase).
    pub tag: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<u64>,

    #[serde(default)]
    pub attributes: BTreeMap<String, String>,

    /// Direct text only, not from children.
    #[serde(default)]
    pub text: String,

    /// Lives inside a shadow root.
    #[serde(default)]
    pub in_shadow: bool,

    #[serde(default)]
    pub style: ComputedStyle,

    #[serde(default = "default_rect")]
    pub rect: Rect,

    /// Number of client rects; derived from `rect` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_rects: Option<usize>,
}

fn default_rect() -> Rect {
    Rect::new(0.0, 0.0, 100.0, 24.0)
}

impl SnapshotNode {
    /// Create a detached node; ids are assigned by [`PageSnapshot::append`].
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            id: 0,
            tag: tag.into().to_ascii_lowercase(),
            parent: None,
            attributes: BTreeMap::new(),
            text: String::new(),
            in_shadow: false,
            style: ComputedStyle::default(),
            rect: default_rect(),
            client_rects: None,
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_id(self, id: impl Into<String>) -> Self {
        self.attr("id", id)
    }

    pub fn with_class(self, class: impl Into<String>) -> Self {
        self.attr("class", class)
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_style(mut self, style: ComputedStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_rect(mut self, rect: Rect) -> Self {
        self.rect = rect;
        self
    }

    pub fn with_client_rects(mut self, count: usize) -> Self {
        self.client_rects = Some(count);
        self
    }

    pub fn in_shadow(mut self) -> Self {
        self.in_shadow = true;
        self
    }

    /// Shorthand for `display: none`.
    pub fn hidden(mut self) -> Self {
        self.style.display = "none".to_string();
        self
    }

    pub fn node_id(&self) -> NodeId {
        NodeId(self.id)
    }

    pub fn client_rect_count(&self) -> usize {
        self.client_rects
            .unwrap_or(if self.rect.has_extent() { 1 } else { 0 })
    }
}

/// A captured page: location plus elements in document order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageSnapshot {
    #[serde(default)]
    pub url: String,

    /// Whether the host exposes a native visibility primitive.
    #[serde(default)]
    pub native_visibility: bool,

    #[serde(default)]
    pub nodes: Vec<SnapshotNode>,
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            native_visibility: false,
            nodes: Vec::new(),
        }
    }

    /// Append `node` as the last child of `parent`, keeping document order.
    pub fn append(&mut self, parent: Option<NodeId>, mut node: SnapshotNode) -> NodeId {
        let id = self.nodes.iter().map(|n| n.id).max().unwrap_or(0) + 1;
        node.id = id;
        node.parent = parent.map(|p| p.0);

        let insert_at = match parent {
            None => self.nodes.len(),
            Some(parent) => self.subtree_end(parent.0),
        };
        self.nodes.insert(insert_at, node);
        NodeId(id)
    }

    /// Index one past the last descendant of `id`.
    pub(crate) fn subtree_end(&self, id: u64) -> usize {
        let Some(start) = self.nodes.iter().position(|n| n.id == id) else {
            return self.nodes.len();
        };
        let mut members: HashSet<u64> = HashSet::from([id]);
        let mut end = start + 1;
        while end < self.nodes.len() {
            match self.nodes[end].parent {
                Some(p) if members.contains(&p) => {
                    members.insert(self.nodes[end].id);
                    end += 1;
                }
                _ => break,
            }
        }
        end
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Ids must be unique and every parent must precede its children.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let all: HashSet<u64> = self.nodes.iter().map(|n| n.id).collect();
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if let Some(parent) = node.parent {
                if !all.contains(&parent) {
                    return Err(SnapshotError::UnknownParent {
                        node: node.id,
                        parent,
                    });
                }
                if !seen.contains(&parent) {
                    return Err(SnapshotError::OutOfOrder {
                        node: node.id,
                        parent,
                    });
                }
            }
            if !seen.insert(node.id) {
                return Err(SnapshotError::DuplicateNode(node.id));
            }
        }
        Ok(())
    }
}
