//! Live, mutable DOM backed by a [`PageSnapshot`].

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::RwLock;
use tracing::debug;

use tourguide_protocols::{
    ClickListener, ComputedStyle, DomError, DomProvider, ListenerId, NodeId, NodeIter,
    Propagation, Rect,
};

use crate::error::SnapshotError;
use crate::selector::{ElementTree, SelectorList};
use crate::snapshot::{PageSnapshot, SnapshotNode};

struct Inner {
    page: PageSnapshot,
    listeners: Vec<(ListenerId, NodeId, ClickListener)>,
    broken_styles: HashSet<u64>,
}

impl Inner {
    fn node(&self, id: NodeId) -> Option<&SnapshotNode> {
        self.page.nodes.iter().find(|n| n.id == id.0)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut SnapshotNode> {
        self.page.nodes.iter_mut().find(|n| n.id == id.0)
    }

    fn require(&self, id: NodeId) -> Result<&SnapshotNode, DomError> {
        self.node(id).ok_or(DomError::NodeNotFound(id))
    }

    fn subtree(&self, id: NodeId) -> &[SnapshotNode] {
        match self.page.nodes.iter().position(|n| n.id == id.0) {
            Some(start) => &self.page.nodes[start..self.page.subtree_end(id.0)],
            None => &[],
        }
    }

    fn style_chain_hides(&self, id: NodeId) -> bool {
        let mut current = self.node(id);
        while let Some(node) = current {
            if node.style.hides() {
                return true;
            }
            current = node.parent.and_then(|p| self.node(NodeId(p)));
        }
        false
    }
}

impl ElementTree for Inner {
    fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.node(node).map(|n| n.tag.as_str())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.node(node)
            .and_then(|n| n.attributes.get(name))
            .map(String::as_str)
    }

    fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.parent).map(NodeId)
    }

    fn element_children(&self, parent: Option<NodeId>) -> Vec<NodeId> {
        let parent = parent.map(|p| p.0);
        self.page
            .nodes
            .iter()
            .filter(|n| n.parent == parent)
            .map(SnapshotNode::node_id)
            .collect()
    }
}

/// A [`DomProvider`] over an in-memory page.
///
/// Mutation helpers stand in for the host page's own rendering, and
/// [`SnapshotDom::click`] dispatches a bubbling click to attached listeners.
/// Query and style lookups are counted for instrumentation.
pub struct SnapshotDom {
    inner: RwLock<Inner>,
    queries: AtomicUsize,
    style_lookups: AtomicUsize,
    next_listener: AtomicU64,
}

impl SnapshotDom {
    pub fn new(page: PageSnapshot) -> Self {
        Self {
            inner: RwLock::new(Inner {
                page,
                listeners: Vec::new(),
                broken_styles: HashSet::new(),
            }),
            queries: AtomicUsize::new(0),
            style_lookups: AtomicUsize::new(0),
            next_listener: AtomicU64::new(1),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(Self::new(PageSnapshot::from_json(json)?))
    }

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        Ok(Self::new(PageSnapshot::load(path)?))
    }

    /// Copy of the current page state.
    pub fn snapshot(&self) -> PageSnapshot {
        self.inner.read().page.clone()
    }

    pub fn append(&self, parent: Option<NodeId>, node: SnapshotNode) -> NodeId {
        self.inner.write().page.append(parent, node)
    }

    /// Remove a node and its subtree. Returns false if it was not attached.
    pub fn remove(&self, node: NodeId) -> bool {
        let mut inner = self.inner.write();
        let Some(start) = inner.page.nodes.iter().position(|n| n.id == node.0) else {
            return false;
        };
        let end = inner.page.subtree_end(node.0);
        inner.page.nodes.drain(start..end);
        debug!("Removed {} ({} nodes)", node, end - start);
        true
    }

    /// Replace a node with an identical one under a new identity, the way a
    /// framework re-render swaps an element out. Listeners stay on the old node.
    pub fn recreate(&self, node: NodeId) -> Option<NodeId> {
        let mut inner = self.inner.write();
        let fresh = inner.page.nodes.iter().map(|n| n.id).max().unwrap_or(0) + 1;
        let target = inner.node_mut(node)?;
        target.id = fresh;
        for child in inner.page.nodes.iter_mut() {
            if child.parent == Some(node.0) {
                child.parent = Some(fresh);
            }
        }
        Some(NodeId(fresh))
    }

    pub fn set_style(&self, node: NodeId, style: ComputedStyle) -> bool {
        self.update(node, |n| n.style = style)
    }

    pub fn set_rect(&self, node: NodeId, rect: Rect) -> bool {
        self.update(node, |n| n.rect = rect)
    }

    pub fn set_text(&self, node: NodeId, text: impl Into<String>) -> bool {
        let text = text.into();
        self.update(node, |n| n.text = text)
    }

    pub fn set_url(&self, url: impl Into<String>) {
        self.inner.write().page.url = url.into();
    }

    pub fn set_native_visibility(&self, supported: bool) {
        self.inner.write().page.native_visibility = supported;
    }

    /// Make style lookups for `node` fail.
    pub fn break_style(&self, node: NodeId) {
        self.inner.write().broken_styles.insert(node.0);
    }

    fn update(&self, node: NodeId, f: impl FnOnce(&mut SnapshotNode)) -> bool {
        match self.inner.write().node_mut(node) {
            Some(n) => {
                f(n);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.inner.read().node(node).is_some()
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        ElementTree::attribute(&*self.inner.read(), node, name).map(str::to_string)
    }

    /// Dispatch a click on `node`, bubbling through its ancestors until a
    /// listener stops propagation. Returns the number of listeners invoked.
    pub fn click(&self, node: NodeId) -> usize {
        let chain: Vec<Vec<ClickListener>> = {
            let inner = self.inner.read();
            let mut chain = Vec::new();
            let mut current = inner.node(node).map(SnapshotNode::node_id);
            while let Some(id) = current {
                chain.push(
                    inner
                        .listeners
                        .iter()
                        .filter(|(_, target, _)| *target == id)
                        .map(|(_, _, listener)| listener.clone())
                        .collect(),
                );
                current = inner.parent_element(id);
            }
            chain
        };

        let mut invoked = 0;
        for listeners in chain {
            let mut stop = false;
            for listener in listeners {
                invoked += 1;
                if listener() == Propagation::Stop {
                    stop = true;
                }
            }
            if stop {
                break;
            }
        }
        invoked
    }

    pub fn listener_count(&self) -> usize {
        self.inner.read().listeners.len()
    }

    pub fn listeners_on(&self, node: NodeId) -> usize {
        self.inner
            .read()
            .listeners
            .iter()
            .filter(|(_, target, _)| *target == node)
            .count()
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    pub fn style_lookups(&self) -> usize {
        self.style_lookups.load(Ordering::Relaxed)
    }

    pub fn reset_counters(&self) {
        self.queries.store(0, Ordering::Relaxed);
        self.style_lookups.store(0, Ordering::Relaxed);
    }

    fn parse(&self, selector: &str) -> Result<SelectorList, DomError> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        SelectorList::parse(selector)
            .map_err(|e| DomError::invalid_selector(selector, e.to_string()))
    }
}

impl DomProvider for SnapshotDom {
    fn query_all(&self, selector: &str) -> Result<NodeIter<'_>, DomError> {
        let list = self.parse(selector)?;
        let candidates: Vec<NodeId> = self
            .inner
            .read()
            .page
            .nodes
            .iter()
            .map(SnapshotNode::node_id)
            .collect();

        Ok(Box::new(candidates.into_iter().filter(move |id| {
            let inner = self.inner.read();
            inner.node(*id).is_some() && list.matches(&*inner, *id)
        })))
    }

    fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, DomError> {
        let list = self.parse(selector)?;
        let inner = self.inner.read();
        Ok(inner
            .page
            .nodes
            .iter()
            .filter(|n| !n.in_shadow && list.matches(&*inner, n.node_id()))
            .map(SnapshotNode::node_id)
            .collect())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.read().parent_element(node)
    }

    fn text_content(&self, node: NodeId) -> Option<String> {
        let inner = self.inner.read();
        inner.node(node)?;
        Some(inner.subtree(node).iter().map(|n| n.text.as_str()).collect())
    }

    fn computed_style(&self, node: NodeId) -> Result<ComputedStyle, DomError> {
        self.style_lookups.fetch_add(1, Ordering::Relaxed);
        let inner = self.inner.read();
        if inner.broken_styles.contains(&node.0) {
            return Err(DomError::StyleUnavailable(format!(
                "getComputedStyle failed for {}",
                node
            )));
        }
        Ok(inner.require(node)?.style.clone())
    }

    fn native_visibility(&self, node: NodeId) -> Option<Result<bool, DomError>> {
        let inner = self.inner.read();
        if !inner.page.native_visibility {
            return None;
        }
        Some(
            inner
                .require(node)
                .map(|_| !inner.style_chain_hides(node)),
        )
    }

    fn bounding_rect(&self, node: NodeId) -> Result<Rect, DomError> {
        Ok(self.inner.read().require(node)?.rect)
    }

    fn client_rect_count(&self, node: NodeId) -> Result<usize, DomError> {
        Ok(self.inner.read().require(node)?.client_rect_count())
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let mut inner = self.inner.write();
        let target = inner.node_mut(node).ok_or(DomError::NodeNotFound(node))?;
        target
            .attributes
            .insert(name.to_ascii_lowercase(), value.to_string());
        Ok(())
    }

    fn remove_attribute(&self, node: NodeId, name: &str) -> Result<(), DomError> {
        let mut inner = self.inner.write();
        let target = inner.node_mut(node).ok_or(DomError::NodeNotFound(node))?;
        target.attributes.remove(&name.to_ascii_lowercase());
        Ok(())
    }

    fn add_click_listener(
        &self,
        node: NodeId,
        listener: ClickListener,
    ) -> Result<ListenerId, DomError> {
        let mut inner = self.inner.write();
        inner.require(node)?;
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        inner.listeners.push((id, node, listener));
        Ok(id)
    }

    fn remove_listener(&self, id: ListenerId) {
        self.inner.write().listeners.retain(|(l, _, _)| *l != id);
    }

    fn current_url(&self) -> String {
        self.inner.read().page.url.clone()
    }
}

#[cfg(test)]
#[path = "live_tests.rs"]
mod tests;
