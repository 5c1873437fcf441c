//! In-memory page model for TourGuide.
//!
//! A [`PageSnapshot`] is a serializable capture of a page: elements in
//! document order with their attributes, own text, computed visibility styles
//! and geometry. [`SnapshotDom`] wraps a snapshot as a live, mutable
//! [`DomProvider`] so the resolver and orchestrator can run without a browser.
//!
//! ## Selector support
//!
//! Queries use the CSS subset in [`selector`]. Nodes flagged `in_shadow` are
//! only visible to the shadow-piercing query, like elements inside an open
//! shadow root.
//!
//! [`DomProvider`]: tourguide_protocols::DomProvider

mod error;
mod live;
pub mod selector;
mod snapshot;

pub use error::SnapshotError;
pub use live::SnapshotDom;
pub use selector::{ElementTree, SelectorList, SelectorParseError};
pub use snapshot::{PageSnapshot, SnapshotNode};
