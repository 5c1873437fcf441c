//! Ticks, transitions and their side effects.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::Utc;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use tourguide_protocols::{
    ClickListener, DismissReason, NodeId, Progression, Properties, Propagation, RenderReason,
    RenderRequest, Step, StepActions, StepType, Tour,
};
use tourguide_resolver::{MatchError, match_selector, resolve_step_target};

use super::actions::StepHandle;
use super::{ManagerInner, TourState};
use crate::error::OrchestratorError;
use crate::events::FailurePhase;
use crate::keys::completion_marker;
use crate::registry::ReconcileOutcome;
use crate::validation::preflight;

impl ManagerInner {
    pub(super) async fn run_tick(&self) {
        if self.is_stopped() {
            return;
        }
        let tours = match self.collab.source.tours().await {
            Ok(tours) => tours,
            Err(e) => {
                warn!("Failed to load tours: {}", e);
                return;
            }
        };
        // stop() may have run while the fetch was pending
        if self.is_stopped() {
            return;
        }

        let tours: Vec<Arc<Tour>> = tours.into_iter().map(Arc::new).collect();
        self.sync_triggers(&tours);
        self.auto_start(&tours);
    }

    fn sync_triggers(&self, tours: &[Arc<Tour>]) {
        let dom = self.collab.dom.as_ref();
        let mut live = HashSet::new();

        for tour in tours.iter().filter(|t| t.has_trigger()) {
            live.insert(tour.id.as_str());
            let outcome = self
                .triggers
                .reconcile(dom, tour.clone(), |id| self.trigger_listener(id));
            if !matches!(outcome, ReconcileOutcome::Unchanged | ReconcileOutcome::Absent) {
                debug!("Trigger for tour {}: {:?}", tour.id, outcome);
            }
        }

        let pruned = self.triggers.retain(dom, &live);
        if pruned > 0 {
            debug!("Pruned {} trigger listeners for removed tours", pruned);
        }
    }

    fn trigger_listener(&self, tour_id: &str) -> ClickListener {
        let weak = self.weak.clone();
        let tour_id = tour_id.to_string();
        Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.on_trigger(&tour_id);
            }
            Propagation::Stop
        })
    }

    fn on_trigger(&self, tour_id: &str) {
        let Some(tour) = self.triggers.tour(tour_id) else {
            debug!("Trigger fired for unknown tour {}", tour_id);
            return;
        };
        match self.begin(tour, RenderReason::Trigger) {
            Ok(()) => {}
            Err(OrchestratorError::TourActive(active)) => {
                debug!("Trigger for tour {} ignored, {} is active", tour_id, active);
            }
            Err(e) => warn!("Triggered tour {} did not start: {}", tour_id, e),
        }
    }

    fn auto_start(&self, tours: &[Arc<Tour>]) {
        if !self.state.lock().is_idle() {
            return;
        }
        let ctx = self.eligibility();

        for tour in tours.iter().filter(|t| !t.has_trigger()) {
            if !ctx.is_eligible(tour) {
                continue;
            }
            match self.begin(tour.clone(), RenderReason::Auto) {
                Ok(()) => return,
                Err(OrchestratorError::ValidationFailed { .. }) => continue,
                Err(e) => {
                    debug!("Auto-start of tour {} skipped: {}", tour.id, e);
                    return;
                }
            }
        }
    }

    /// Claim the active slot for `tour`, validate it and show its first step.
    pub(super) fn begin(&self, tour: Arc<Tour>, reason: RenderReason) -> Result<(), OrchestratorError> {
        if tour.steps.is_empty() {
            return Err(OrchestratorError::EmptyTour(tour.id.clone()));
        }
        {
            let mut state = self.state.lock();
            if let Some(active) = state.tour_id() {
                return Err(OrchestratorError::TourActive(active.to_string()));
            }
            *state = TourState::Validating {
                tour: tour.clone(),
                render_reason: reason,
            };
        }

        let failures = self.validate(&tour);
        let mut state = self.state.lock();
        let claimed = matches!(&*state, TourState::Validating { tour: t, .. } if Arc::ptr_eq(t, &tour));
        if failures > 0 {
            if claimed {
                *state = TourState::Idle;
            }
            info!("Tour {} not shown: {} steps failed validation", tour.id, failures);
            return Err(OrchestratorError::ValidationFailed {
                tour_id: tour.id.clone(),
                failures,
            });
        }
        if !claimed {
            debug!("Start of tour {} abandoned", tour.id);
            return Ok(());
        }
        *state = TourState::Showing {
            tour: tour.clone(),
            step_index: 0,
            render_reason: reason,
        };
        drop(state);

        info!("Showing tour {} ({})", tour.id, reason);
        self.events.tour_shown(&tour, reason);
        self.persist(
            &self.keys.last_seen(&tour.tour_type),
            json!(Utc::now().to_rfc3339()),
        );
        self.present(&tour, 0, reason);
        Ok(())
    }

    /// Report every targeting problem; count the ones that block the tour.
    fn validate(&self, tour: &Tour) -> usize {
        let mut failures = 0;
        let checks = preflight(self.collab.dom.as_ref(), tour, self.config.default_precision);
        for check in checks {
            let Some(error) = check.result.error else {
                continue;
            };
            self.events.selector_failed(
                tour,
                check.step_index,
                check.selector.as_deref(),
                &check.result,
                FailurePhase::Validation,
            );
            if check.is_failure() {
                warn!(
                    "Tour {} step {} target '{}': {}",
                    tour.id,
                    check.step_index,
                    check.label(),
                    error
                );
                failures += 1;
            }
        }
        failures
    }

    /// Resolve and render step `index`. The state must already be
    /// `Showing` that step.
    fn present(&self, tour: &Arc<Tour>, index: usize, reason: RenderReason) {
        self.clear_step_listener();
        let Some(step) = tour.step(index) else {
            warn!("Tour {} has no step {}", tour.id, index);
            return;
        };

        let mut target = None;
        if let Some(resolved) = resolve_step_target(
            self.collab.dom.as_ref(),
            step,
            self.config.default_precision,
        ) {
            if let Some(error) = resolved.error {
                self.events.selector_failed(
                    tour,
                    index,
                    step.css_selector(),
                    &resolved,
                    FailurePhase::Runtime,
                );
                if error.is_blocking() {
                    warn!(
                        "Tour {} step {} element unavailable: {}",
                        tour.id, index, error
                    );
                    self.dismiss(&tour.id, index, DismissReason::ElementUnavailable);
                    return;
                }
            }
            target = resolved.element;
        }
        let container = self.resolve_container(tour, index, step);

        if !self.state.lock().is_showing(&tour.id, index) {
            debug!("Step {} of tour {} superseded before render", index, tour.id);
            return;
        }
        if step.progression == Progression::Click {
            if let Some(node) = target {
                self.attach_step_listener(&tour.id, index, node);
            }
        }

        debug!("Rendering tour {} step {}", tour.id, index);
        self.events.step_shown(tour, index, reason);
        let actions: Arc<dyn StepActions> =
            Arc::new(StepHandle::new(self.weak.clone(), &tour.id, index));
        self.collab.renderer.render(
            RenderRequest {
                tour: tour.clone(),
                step_index: index,
                total_steps: tour.total_steps(),
                target,
                container,
                render_reason: reason,
            },
            actions,
        );
    }

    /// Banner steps may name a container; fall back to the default placement
    /// when it does not resolve.
    fn resolve_container(&self, tour: &Tour, index: usize, step: &Step) -> Option<NodeId> {
        if step.step_type != StepType::Banner {
            return None;
        }
        let selector = step
            .banner_container_selector
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())?;

        let result = match_selector(self.collab.dom.as_ref(), selector);
        if result.is_usable() {
            if result.error == Some(MatchError::MultipleMatches) {
                debug!("Banner container '{}' is ambiguous, using first", selector);
            }
            return result.element;
        }
        warn!(
            "Banner container '{}' for tour {} unavailable, using default placement",
            selector, tour.id
        );
        self.events
            .banner_container_failed(tour, index, selector, &result);
        None
    }

    fn attach_step_listener(&self, tour_id: &str, index: usize, node: NodeId) {
        let handle = StepHandle::new(self.weak.clone(), tour_id, index);
        let listener: ClickListener = Arc::new(move || {
            handle.next();
            Propagation::Continue
        });
        match self.collab.dom.add_click_listener(node, listener) {
            Ok(id) => {
                let previous = self.step_listener.lock().replace(id);
                if let Some(previous) = previous {
                    self.collab.dom.remove_listener(previous);
                }
            }
            Err(e) => warn!("Could not attach click progression for tour {}: {}", tour_id, e),
        }
    }

    fn clear_step_listener(&self) {
        let previous = self.step_listener.lock().take();
        if let Some(id) = previous {
            self.collab.dom.remove_listener(id);
        }
    }

    /// Complete step `index`, moving on or finishing the tour.
    ///
    /// Returns false when the call is stale.
    pub(super) fn advance(&self, tour_id: &str, index: usize, survey_response: Option<Value>) -> bool {
        let (tour, reason, finished) = {
            let mut state = self.state.lock();
            let TourState::Showing {
                tour,
                step_index,
                render_reason,
            } = &*state
            else {
                debug!("Ignoring next for tour {}: nothing showing", tour_id);
                return false;
            };
            if tour.id != tour_id || *step_index != index {
                debug!("Ignoring stale next for tour {} step {}", tour_id, index);
                return false;
            }
            let (tour, reason) = (tour.clone(), *render_reason);
            let finished = tour.is_last_step(index);
            *state = if finished {
                TourState::Completed { tour: tour.clone() }
            } else {
                TourState::Showing {
                    tour: tour.clone(),
                    step_index: index + 1,
                    render_reason: reason,
                }
            };
            (tour, reason, finished)
        };

        self.clear_step_listener();
        self.events.step_completed(&tour, index, survey_response);
        if finished {
            self.finish_completed(&tour);
        } else {
            self.present(&tour, index + 1, reason);
        }
        true
    }

    pub(super) fn retreat(&self, tour_id: &str, index: usize) -> bool {
        if index == 0 {
            return false;
        }
        let (tour, reason) = {
            let mut state = self.state.lock();
            let TourState::Showing {
                tour,
                step_index,
                render_reason,
            } = &*state
            else {
                return false;
            };
            if tour.id != tour_id || *step_index != index {
                debug!("Ignoring stale previous for tour {} step {}", tour_id, index);
                return false;
            }
            let (tour, reason) = (tour.clone(), *render_reason);
            *state = TourState::Showing {
                tour: tour.clone(),
                step_index: index - 1,
                render_reason: reason,
            };
            (tour, reason)
        };
        self.present(&tour, index - 1, reason);
        true
    }

    pub(super) fn dismiss(&self, tour_id: &str, index: usize, reason: DismissReason) -> bool {
        let tour = {
            let mut state = self.state.lock();
            let Some(tour) = state.tour().cloned() else {
                return false;
            };
            if !state.is_showing(tour_id, index) {
                debug!("Ignoring stale dismiss for tour {} step {}", tour_id, index);
                return false;
            }
            *state = TourState::Dismissed {
                tour: tour.clone(),
                reason,
            };
            tour
        };
        self.finish_dismissed(&tour, index, reason);
        true
    }

    pub(super) fn dismiss_active(&self, reason: DismissReason) -> Result<(), OrchestratorError> {
        let (tour, index) = {
            let mut state = self.state.lock();
            let TourState::Showing {
                tour, step_index, ..
            } = &*state
            else {
                return Err(OrchestratorError::NoActiveTour);
            };
            let (tour, index) = (tour.clone(), *step_index);
            *state = TourState::Dismissed {
                tour: tour.clone(),
                reason,
            };
            (tour, index)
        };
        self.finish_dismissed(&tour, index, reason);
        Ok(())
    }

    fn finish_dismissed(&self, tour: &Tour, index: usize, reason: DismissReason) {
        self.clear_step_listener();
        info!("Tour {} dismissed at step {} ({})", tour.id, index, reason);
        self.events.tour_dismissed(tour, Some(index), reason);
        self.persist(&self.keys.dismissed(&tour.id), json!(true));
        self.collab.renderer.unmount(&tour.id);
        *self.state.lock() = TourState::Idle;
    }

    fn finish_completed(&self, tour: &Tour) {
        info!("Tour {} completed", tour.id);
        self.events.tour_completed(tour);
        self.persist(&self.keys.completed(&tour.id), json!(true));
        self.events
            .set_person_properties(Properties::from([(completion_marker(&tour.id), json!(true))]));
        self.collab.renderer.unmount(&tour.id);
        *self.state.lock() = TourState::Idle;
    }

    fn persist(&self, key: &str, value: Value) {
        if let Err(e) = self.collab.store.set(key, value) {
            warn!("Failed to persist {}: {}", key, e);
        }
    }

    pub(super) fn shutdown(&self) {
        let first = !self.stopped.swap(true, Ordering::SeqCst);
        let removed = self.triggers.clear(self.collab.dom.as_ref());
        self.clear_step_listener();

        let previous = std::mem::take(&mut *self.state.lock());
        if let TourState::Showing { tour, .. } = &previous {
            self.collab.renderer.unmount(&tour.id);
        }
        if first {
            info!(
                "Tour manager stopped ({} trigger listeners removed)",
                removed
            );
        }
    }
}
