//! Error types for the TourGuide protocol layer.

mod dom;
mod source;
mod store;

pub use dom::*;
pub use source::*;
pub use store::*;
