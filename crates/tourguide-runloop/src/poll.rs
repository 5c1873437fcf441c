//! Poll loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::PollConfig;
use crate::error::PollError;

/// Work performed on every tick.
#[async_trait]
pub trait PollHandler: Send + Sync {
    async fn tick(&self);
}

/// Lifecycle of a [`PollLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    Stopped,
    Running,
    Paused,
}

enum LoopState {
    Stopped,
    Running(CancellationToken),
    Paused,
}

impl LoopState {
    fn status(&self) -> PollStatus {
        match self {
            LoopState::Stopped => PollStatus::Stopped,
            LoopState::Running(_) => PollStatus::Running,
            LoopState::Paused => PollStatus::Paused,
        }
    }
}

/// Recurring, cancellable driver for a [`PollHandler`].
///
/// Every transition is idempotent: starting a running loop, pausing a paused
/// one or stopping a stopped one does nothing and returns `false`.
pub struct PollLoop<H: PollHandler + ?Sized> {
    handler: Arc<H>,
    config: PollConfig,
    state: Mutex<LoopState>,
    ticks: Arc<AtomicU64>,
}

impl<H: PollHandler + ?Sized + 'static> PollLoop<H> {
    pub fn new(handler: Arc<H>, config: PollConfig) -> Result<Self, PollError> {
        if config.interval_ms == 0 {
            return Err(PollError::InvalidInterval);
        }
        Ok(Self {
            handler,
            config,
            state: Mutex::new(LoopState::Stopped),
            ticks: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Start ticking. The first tick runs immediately.
    pub fn start(&self) -> Result<bool, PollError> {
        let mut state = self.state.lock();
        if !matches!(*state, LoopState::Stopped) {
            return Ok(false);
        }
        *state = LoopState::Running(self.spawn()?);
        info!("Poll loop started (interval={}ms)", self.config.interval_ms);
        Ok(true)
    }

    /// Cancel the loop. A tick in flight is dropped at its next await point.
    pub fn stop(&self) -> bool {
        let previous = std::mem::replace(&mut *self.state.lock(), LoopState::Stopped);
        match previous {
            LoopState::Stopped => false,
            LoopState::Running(token) => {
                token.cancel();
                info!("Poll loop stopped");
                true
            }
            LoopState::Paused => {
                info!("Poll loop stopped while paused");
                true
            }
        }
    }

    /// Suspend ticking without forgetting that the loop was started.
    pub fn pause(&self) -> bool {
        let mut state = self.state.lock();
        let LoopState::Running(token) = &*state else {
            return false;
        };
        token.cancel();
        *state = LoopState::Paused;
        debug!("Poll loop paused");
        true
    }

    /// Resume a paused loop with an immediate catch-up tick.
    pub fn resume(&self) -> Result<bool, PollError> {
        let mut state = self.state.lock();
        if !matches!(*state, LoopState::Paused) {
            return Ok(false);
        }
        *state = LoopState::Running(self.spawn()?);
        debug!("Poll loop resumed");
        Ok(true)
    }

    /// Follow host page visibility, when configured to.
    pub fn set_hidden(&self, hidden: bool) -> Result<bool, PollError> {
        if !self.config.pause_when_hidden {
            return Ok(false);
        }
        if hidden {
            Ok(self.pause())
        } else {
            self.resume()
        }
    }

    pub fn status(&self) -> PollStatus {
        self.state.lock().status()
    }

    pub fn is_running(&self) -> bool {
        self.status() == PollStatus::Running
    }

    /// Ticks started since creation.
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn interval(&self) -> Duration {
        self.config.interval()
    }

    fn spawn(&self) -> Result<CancellationToken, PollError> {
        let runtime = Handle::try_current().map_err(|_| PollError::NoRuntime)?;
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let handler = self.handler.clone();
        let ticks = self.ticks.clone();
        let period = self.config.interval();

        runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = interval.tick() => {}
                }

                ticks.fetch_add(1, Ordering::Relaxed);
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = handler.tick() => {}
                }
            }
            debug!("Poll task exited");
        });

        Ok(token)
    }
}

impl<H: PollHandler + ?Sized> Drop for PollLoop<H> {
    fn drop(&mut self) {
        if let LoopState::Running(token) = &*self.state.lock() {
            token.cancel();
        }
    }
}

#[cfg(test)]
#[path = "poll_tests.rs"]
mod tests;
