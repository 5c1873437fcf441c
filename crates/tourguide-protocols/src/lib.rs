//! # TourGuide Protocols
//!
//! Core data model and collaborator contracts for the TourGuide framework.
//! Contains only types and interface definitions - no orchestration logic.
//!
//! ## Core Traits
//!
//! - [`DomProvider`] - Narrow capability over the host page's DOM
//! - [`TourSource`] - Remote/cached tour definitions
//! - [`KeyValueStore`] - Persistence of tour outcomes
//! - [`FeatureFlags`] - Linked feature-flag evaluation
//! - [`Telemetry`] - Fire-and-forget analytics capture
//! - [`TourRenderer`] - Visual presentation of steps
//!
//! ## Data Model
//!
//! - [`Tour`] / [`Step`] - Authored tour definitions
//! - [`AutoData`] / [`SelectorGroup`] - Fuzzy element descriptors

pub mod dom;
pub mod error;
pub mod flags;
pub mod render;
pub mod source;
pub mod store;
pub mod telemetry;
pub mod tour;

pub use dom::{
    ClickListener, ComputedStyle, DomProvider, ListenerId, NodeId, NodeIter, Propagation, Rect,
};
pub use error::{DomError, SourceError, StoreError};
pub use flags::FeatureFlags;
pub use render::{DismissReason, RenderReason, RenderRequest, StepActions, TourRenderer};
pub use source::TourSource;
pub use store::KeyValueStore;
pub use telemetry::{Properties, Telemetry};
pub use tour::{
    AutoData, Conditions, DisplayFrequency, ElementSelector, Progression, SelectorEntry,
    SelectorGroup, Step, StepType, Tour, UrlMatchType, WaitPeriod,
};
