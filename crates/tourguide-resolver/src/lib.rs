//! # TourGuide Resolver
//!
//! Re-finds page elements described at authoring time.
//!
//! ## Components
//!
//! - [`is_visible`] - Visibility oracle with a per-call [`VisibilityCache`]
//! - [`find_element`] - Fuzzy resolver voting across alternative CSS strategies
//! - [`match_selector`] - Exact single-selector matcher with error classification
//! - [`resolve_step_target`] - Picks the right strategy for a tour step
//!
//! Every function here is infallible from the caller's point of view:
//! malformed input and DOM failures degrade to "no element".

mod exact;
mod fuzzy;
mod target;
mod visibility;

pub use exact::{MatchError, SelectorMatch, match_selector};
pub use fuzzy::{DEFAULT_PRECISION, find_element, groups_to_search, parse_auto_data};
pub use target::resolve_step_target;
pub use visibility::{VisibilityCache, is_visible};
