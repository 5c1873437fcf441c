//! # TourGuide RunLoop
//!
//! The single recurring task behind tour evaluation.
//!
//! A [`PollLoop`] calls its [`PollHandler`] once immediately and then on a
//! fixed interval. Ticks never overlap. The loop can be paused while the host
//! page is hidden and resumes with an immediate catch-up tick.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use tourguide_runloop::{PollConfig, PollHandler, PollLoop};
//!
//! struct Evaluate;
//!
//! #[async_trait]
//! impl PollHandler for Evaluate {
//!     async fn tick(&self) {}
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let poll = PollLoop::new(Arc::new(Evaluate), PollConfig::default()).unwrap();
//!     poll.start().unwrap();
//!     poll.set_hidden(true);
//!     poll.set_hidden(false);
//!     poll.stop();
//! }
//! ```

pub mod config;
pub mod error;
mod poll;

pub use config::PollConfig;
pub use error::PollError;
pub use poll::{PollHandler, PollLoop, PollStatus};

// Re-export CancellationToken for convenience
pub use tokio_util::sync::CancellationToken;
