//! # TourGuide Core
//!
//! Decides when a tour starts, drives it step by step and records how it
//! ended.
//!
//! ## Components
//!
//! - [`TourManager`] - Lifecycle state machine behind a poll loop
//! - [`TourState`] - The single active-tour slot
//! - [`eligibility`] - Auto-start conditions
//! - [`TriggerRegistry`] - Click listeners on manual activation elements
//! - [`preflight`] - Selector validation before a tour is shown
//! - [`memory`] - In-memory collaborators for tests and offline runs

pub mod config;
pub mod eligibility;
pub mod error;
pub mod events;
pub mod keys;
pub mod memory;
pub mod registry;
mod manager;
mod validation;

pub use config::ManagerConfig;
pub use eligibility::{EligibilityContext, Ineligibility};
pub use error::OrchestratorError;
pub use events::EventEmitter;
pub use keys::OutcomeKeys;
pub use manager::{Collaborators, TourManager, TourState};
pub use registry::{ReconcileOutcome, TRIGGER_MARKER, TriggerRegistry};
pub use validation::{StepCheck, preflight};
