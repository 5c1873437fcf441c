//! Tour lifecycle orchestration.
//!
//! ```text
//! Idle ──eligible / trigger / api──▶ Validating ──all selectors ok──▶ Showing(0)
//!  ▲                                    │                                │ next / previous
//!  │                                    └──selector failed───────────────┤
//!  │                                                                     ▼
//!  └───────────────────── Completed | Dismissed ◀──── last next / dismiss / element lost
//! ```
//!
//! All state lives in one [`TourState`] slot behind a mutex. Transitions are
//! claimed under the lock and their side effects (telemetry, persistence,
//! rendering) run after it is released, so renderer callbacks may re-enter
//! the manager freely.

mod actions;
mod flow;
mod state;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tracing::info;

use tourguide_protocols::{
    DismissReason, DomProvider, FeatureFlags, KeyValueStore, ListenerId, RenderReason, Telemetry,
    Tour, TourRenderer, TourSource,
};
use tourguide_runloop::{PollHandler, PollLoop, PollStatus};

use crate::config::ManagerConfig;
use crate::eligibility::{EligibilityContext, Ineligibility};
use crate::error::OrchestratorError;
use crate::events::EventEmitter;
use crate::keys::OutcomeKeys;
use crate::registry::TriggerRegistry;

pub use state::TourState;

/// External services the manager drives.
#[derive(Clone)]
pub struct Collaborators {
    pub dom: Arc<dyn DomProvider>,
    pub source: Arc<dyn TourSource>,
    pub store: Arc<dyn KeyValueStore>,
    pub flags: Arc<dyn FeatureFlags>,
    pub telemetry: Arc<dyn Telemetry>,
    pub renderer: Arc<dyn TourRenderer>,
}

struct ManagerInner {
    weak: Weak<ManagerInner>,
    collab: Collaborators,
    config: ManagerConfig,
    keys: OutcomeKeys,
    events: EventEmitter,
    state: Mutex<TourState>,
    triggers: TriggerRegistry,
    /// Click-progression listener on the current step's target.
    step_listener: Mutex<Option<ListenerId>>,
    stopped: AtomicBool,
}

#[async_trait]
impl PollHandler for ManagerInner {
    async fn tick(&self) {
        self.run_tick().await;
    }
}

/// Owns the active-tour slot, the trigger registry and the poll loop.
pub struct TourManager {
    inner: Arc<ManagerInner>,
    poll: PollLoop<ManagerInner>,
}

impl TourManager {
    pub fn new(collab: Collaborators, config: ManagerConfig) -> Result<Self, OrchestratorError> {
        let inner = Arc::new_cyclic(|weak| ManagerInner {
            weak: weak.clone(),
            keys: OutcomeKeys::new(config.key_prefix.clone()),
            events: EventEmitter::new(collab.telemetry.clone(), config.telemetry_enabled),
            collab,
            config: config.clone(),
            state: Mutex::new(TourState::Idle),
            triggers: TriggerRegistry::new(),
            step_listener: Mutex::new(None),
            stopped: AtomicBool::new(false),
        });
        let poll = PollLoop::new(inner.clone(), config.poll)?;
        Ok(Self { inner, poll })
    }

    /// Start polling. The first evaluation runs immediately.
    pub fn start(&self) -> Result<(), OrchestratorError> {
        self.inner.stopped.store(false, Ordering::SeqCst);
        if self.poll.start()? {
            info!("Tour manager started");
        }
        Ok(())
    }

    /// Stop polling, remove every listener and unmount any active tour.
    ///
    /// Safe to call any number of times.
    pub fn stop(&self) {
        self.poll.stop();
        self.inner.shutdown();
    }

    /// Run one evaluation pass now, outside the poll loop.
    pub async fn tick(&self) {
        self.inner.run_tick().await;
    }

    /// Pause polling while the host page is hidden; resume with a catch-up
    /// tick once it is visible again.
    pub fn set_page_hidden(&self, hidden: bool) -> Result<(), OrchestratorError> {
        self.poll.set_hidden(hidden)?;
        Ok(())
    }

    pub fn poll_status(&self) -> PollStatus {
        self.poll.status()
    }

    /// Show a tour by id, bypassing eligibility. Selectors are still validated.
    pub async fn show_tour(&self, tour_id: &str) -> Result<(), OrchestratorError> {
        let tour = self
            .inner
            .collab
            .source
            .tours()
            .await?
            .into_iter()
            .find(|t| t.id == tour_id)
            .ok_or_else(|| OrchestratorError::TourNotFound(tour_id.to_string()))?;
        self.inner.begin(Arc::new(tour), RenderReason::Api)
    }

    /// Dismiss whatever tour is showing.
    pub fn dismiss_active(&self, reason: DismissReason) -> Result<(), OrchestratorError> {
        self.inner.dismiss_active(reason)
    }

    /// Forget that a tour was completed or dismissed.
    pub fn reset_tour(&self, tour_id: &str) -> Result<(), OrchestratorError> {
        let store = &self.inner.collab.store;
        store.remove(&self.inner.keys.completed(tour_id))?;
        store.remove(&self.inner.keys.dismissed(tour_id))?;
        info!("Tour {} reset", tour_id);
        Ok(())
    }

    /// Evaluate auto-start conditions for `tour` against the current page.
    pub fn check_eligibility(&self, tour: &Tour) -> Result<(), Ineligibility> {
        self.inner.eligibility().check(tour)
    }

    pub fn state(&self) -> TourState {
        self.inner.state.lock().clone()
    }

    pub fn active_tour(&self) -> Option<Arc<Tour>> {
        self.inner.state.lock().tour().cloned()
    }

    pub fn triggers(&self) -> &TriggerRegistry {
        &self.inner.triggers
    }

    pub fn keys(&self) -> &OutcomeKeys {
        &self.inner.keys
    }
}

impl ManagerInner {
    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn eligibility(&self) -> EligibilityContext<'_> {
        EligibilityContext {
            dom: self.collab.dom.as_ref(),
            store: self.collab.store.as_ref(),
            flags: self.collab.flags.as_ref(),
            keys: &self.keys,
            now: Utc::now(),
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
