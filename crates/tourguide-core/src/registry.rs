//! Trigger listener registry.
//!
//! Tours with a `trigger_selector` are started by clicking an element on the
//! page. The element can appear, vanish or be re-created by the host at any
//! time, so the registry is reconciled on every poll tick and compares
//! elements by identity.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use tracing::{debug, info};

use tourguide_protocols::{ClickListener, DomError, DomProvider, ListenerId, NodeId, Tour};

/// Attribute set on every element carrying a trigger listener.
pub const TRIGGER_MARKER: &str = "data-tourguide-trigger";

struct TriggerEntry {
    element: NodeId,
    listener: ListenerId,
    tour: Arc<Tour>,
}

/// What one reconcile pass did for a tour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Listener already on the resolved element.
    Unchanged,
    Attached(NodeId),
    /// The host re-created the element; the listener followed it.
    Moved { from: NodeId, to: NodeId },
    /// The element is gone and so is the listener.
    Detached(NodeId),
    /// Nothing resolved and nothing was attached.
    Absent,
    /// The element resolved but the listener could not be attached.
    Failed,
}

/// Click listeners keyed by tour id.
#[derive(Default)]
pub struct TriggerRegistry {
    entries: DashMap<String, TriggerEntry>,
    attached: AtomicUsize,
    detached: AtomicUsize,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the listener for `tour` in line with the page.
    ///
    /// `make_listener` is only called when a new listener is needed.
    pub fn reconcile<D, F>(&self, dom: &D, tour: Arc<Tour>, make_listener: F) -> ReconcileOutcome
    where
        D: DomProvider + ?Sized,
        F: FnOnce(&str) -> ClickListener,
    {
        let current = tour
            .trigger_selector
            .as_deref()
            .and_then(|selector| resolve_trigger(dom, selector));
        let previous = self.entries.get(&tour.id).map(|entry| entry.element);

        match (previous, current) {
            (None, None) => ReconcileOutcome::Absent,
            (Some(old), None) => {
                self.detach(dom, &tour.id);
                ReconcileOutcome::Detached(old)
            }
            (Some(old), Some(new)) if old == new => {
                if let Some(mut entry) = self.entries.get_mut(&tour.id) {
                    entry.tour = tour;
                }
                ReconcileOutcome::Unchanged
            }
            (previous, Some(new)) => {
                if previous.is_some() {
                    self.detach(dom, &tour.id);
                }
                let tour_id = tour.id.clone();
                match self.attach(dom, tour, new, make_listener) {
                    Ok(()) => match previous {
                        Some(from) => ReconcileOutcome::Moved { from, to: new },
                        None => ReconcileOutcome::Attached(new),
                    },
                    Err(e) => {
                        debug!("Could not attach trigger for tour {}: {}", tour_id, e);
                        ReconcileOutcome::Failed
                    }
                }
            }
        }
    }

    /// Drop entries for tours not in `keep`. Returns how many were removed.
    pub fn retain<D: DomProvider + ?Sized>(&self, dom: &D, keep: &HashSet<&str>) -> usize {
        let stale: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| !keep.contains(entry.key().as_str()))
            .map(|entry| entry.key().clone())
            .collect();
        for id in &stale {
            self.detach(dom, id);
        }
        stale.len()
    }

    /// Remove every listener and marker.
    pub fn clear<D: DomProvider + ?Sized>(&self, dom: &D) -> usize {
        let ids: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        for id in &ids {
            self.detach(dom, id);
        }
        ids.len()
    }

    /// Tour definition captured at the last reconcile.
    pub fn tour(&self, tour_id: &str) -> Option<Arc<Tour>> {
        self.entries.get(tour_id).map(|entry| entry.tour.clone())
    }

    pub fn element(&self, tour_id: &str) -> Option<NodeId> {
        self.entries.get(tour_id).map(|entry| entry.element)
    }

    pub fn contains(&self, tour_id: &str) -> bool {
        self.entries.contains_key(tour_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Listeners attached since creation.
    pub fn attach_count(&self) -> usize {
        self.attached.load(Ordering::Relaxed)
    }

    /// Listeners detached since creation.
    pub fn detach_count(&self) -> usize {
        self.detached.load(Ordering::Relaxed)
    }

    fn attach<D, F>(
        &self,
        dom: &D,
        tour: Arc<Tour>,
        element: NodeId,
        make_listener: F,
    ) -> Result<(), DomError>
    where
        D: DomProvider + ?Sized,
        F: FnOnce(&str) -> ClickListener,
    {
        let listener = dom.add_click_listener(element, make_listener(&tour.id))?;
        if let Err(e) = dom.set_attribute(element, TRIGGER_MARKER, &tour.id) {
            debug!("Could not mark trigger element {}: {}", element, e);
        }
        info!("Trigger listener attached for tour {} on {}", tour.id, element);
        self.attached.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(
            tour.id.clone(),
            TriggerEntry {
                element,
                listener,
                tour,
            },
        );
        Ok(())
    }

    fn detach<D: DomProvider + ?Sized>(&self, dom: &D, tour_id: &str) {
        let Some((_, entry)) = self.entries.remove(tour_id) else {
            return;
        };
        dom.remove_listener(entry.listener);
        if let Err(e) = dom.remove_attribute(entry.element, TRIGGER_MARKER) {
            debug!("Trigger element {} already gone: {}", entry.element, e);
        }
        debug!("Trigger listener detached for tour {}", tour_id);
        self.detached.fetch_add(1, Ordering::Relaxed);
    }
}

/// First light-DOM match, visible or not.
fn resolve_trigger<D: DomProvider + ?Sized>(dom: &D, selector: &str) -> Option<NodeId> {
    let selector = selector.trim();
    if selector.is_empty() {
        return None;
    }
    dom.query_selector(selector).unwrap_or_else(|e| {
        debug!("Trigger selector '{}' failed: {}", selector, e);
        None
    })
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
