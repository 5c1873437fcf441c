//! Visibility oracle.
//!
//! A node counts as visible when nothing in its ancestor chain hides it by
//! style and it has rendered geometry. Failures while computing fall back to
//! visible.

use std::collections::HashMap;

use tracing::debug;

use tourguide_protocols::{DomError, DomProvider, NodeId};

/// Per-call visibility memo. Create one per resolution pass and drop it after.
#[derive(Debug, Default)]
pub struct VisibilityCache {
    visible: HashMap<NodeId, bool>,
    /// Node and every ancestor checked by style: true if any of them hides.
    chain_hidden: HashMap<NodeId, bool>,
    computations: usize,
}

impl VisibilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, node: NodeId) -> Option<bool> {
        self.visible.get(&node).copied()
    }

    /// Number of full visibility computations performed.
    pub fn computations(&self) -> usize {
        self.computations
    }
}

/// Whether `node` is currently rendered and visible.
pub fn is_visible<D: DomProvider + ?Sized>(
    dom: &D,
    node: NodeId,
    cache: &mut VisibilityCache,
) -> bool {
    if let Some(visible) = cache.get(node) {
        return visible;
    }

    cache.computations += 1;
    let visible = compute(dom, node, cache).unwrap_or_else(|e| {
        debug!("Visibility check for {} failed, assuming visible: {}", node, e);
        true
    });
    cache.visible.insert(node, visible);
    visible
}

fn compute<D: DomProvider + ?Sized>(
    dom: &D,
    node: NodeId,
    cache: &mut VisibilityCache,
) -> Result<bool, DomError> {
    if let Some(native) = dom.native_visibility(node) {
        return native;
    }

    if chain_hidden(dom, node, cache)? {
        return Ok(false);
    }

    let rect = dom.bounding_rect(node)?;
    Ok(rect.has_extent() || dom.client_rect_count(node)? > 0)
}

/// Walk from `start` towards the root, stopping at the first node that hides
/// by style or whose chain is already known.
fn chain_hidden<D: DomProvider + ?Sized>(
    dom: &D,
    start: NodeId,
    cache: &mut VisibilityCache,
) -> Result<bool, DomError> {
    let mut walked = Vec::new();
    let mut current = Some(start);
    let mut hidden = false;

    while let Some(node) = current {
        if let Some(known) = cache.chain_hidden.get(&node) {
            hidden = *known;
            break;
        }
        walked.push(node);
        if dom.computed_style(node)?.hides() {
            hidden = true;
            break;
        }
        current = dom.parent(node);
    }

    for node in walked {
        cache.chain_hidden.insert(node, hidden);
    }
    Ok(hidden)
}

#[cfg(test)]
#[path = "visibility_tests.rs"]
mod tests;
