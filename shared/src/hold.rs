//! Press-and-hold trigger.
//!
//! The hold timer is a wall-clock state machine with no thread of its own.
//! The shell wakes the core every `poll_interval_ms` while the trigger is held
//! and the core calls [`HoldTimer::tick`] with the episode the wake-up was
//! armed for.
//!
//! ```text
//! Idle -> Holding -> Confirmed -> Idle
//!            \-----> Cancelled -> Idle
//! ```
//!
//! Every wake-up carries its [`EpisodeId`]. A wake-up for an episode that was
//! released (or already confirmed) is reported as [`HoldTick::Stale`], so a
//! wake-up queued before `press_up` can never fire a trigger.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{AlertConfig, AppError, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EpisodeId(pub u64);

impl std::fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "episode-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum HoldState {
    #[default]
    Idle,
    Holding {
        episode: EpisodeId,
        started_at_ms: u64,
    },
    Cancelled,
    Confirmed,
}

/// A confirmed trigger. At most one exists per episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub episode: EpisodeId,
    pub held_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldTick {
    /// The wake-up belongs to an episode that is no longer held.
    Stale,
    /// Still holding; the caller re-arms the wake-up.
    Waiting { elapsed_ms: u64, remaining_ms: u64 },
    Confirmed(Trigger),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HoldError {
    #[error("trigger is already held ({0})")]
    AlreadyHolding(EpisodeId),
    #[error("cannot change hold timing while {0} is in progress")]
    Busy(EpisodeId),
}

impl From<HoldError> for AppError {
    fn from(e: HoldError) -> Self {
        AppError::new(ErrorKind::InvalidState, e.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldTimer {
    state: HoldState,
    last_episode: u64,
    elapsed_ms: u64,
    confirm_after_ms: u64,
    poll_interval_ms: u64,
}

impl Default for HoldTimer {
    fn default() -> Self {
        Self::from_config(&AlertConfig::default())
    }
}

impl HoldTimer {
    #[must_use]
    pub fn new(confirm_after_ms: u64, poll_interval_ms: u64) -> Self {
        Self {
            state: HoldState::Idle,
            last_episode: 0,
            elapsed_ms: 0,
            confirm_after_ms,
            poll_interval_ms,
        }
    }

    #[must_use]
    pub fn from_config(config: &AlertConfig) -> Self {
        Self::new(config.confirm_threshold_ms, config.poll_interval_ms)
    }

    #[must_use]
    pub const fn state(&self) -> HoldState {
        self.state
    }

    #[must_use]
    pub const fn is_holding(&self) -> bool {
        matches!(self.state, HoldState::Holding { .. })
    }

    #[must_use]
    pub const fn current_episode(&self) -> Option<EpisodeId> {
        match self.state {
            HoldState::Holding { episode, .. } => Some(episode),
            _ => None,
        }
    }

    #[must_use]
    pub const fn poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms
    }

    #[must_use]
    pub const fn confirm_after_ms(&self) -> u64 {
        self.confirm_after_ms
    }

    /// 0.0 .. 1.0 progress towards confirmation, as of the last wake-up.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> f64 {
        if !self.is_holding() || self.confirm_after_ms == 0 {
            return 0.0;
        }
        (self.elapsed_ms as f64 / self.confirm_after_ms as f64).min(1.0)
    }

    pub fn reconfigure(&mut self, config: &AlertConfig) -> Result<(), HoldError> {
        if let Some(episode) = self.current_episode() {
            return Err(HoldError::Busy(episode));
        }
        self.confirm_after_ms = config.confirm_threshold_ms;
        self.poll_interval_ms = config.poll_interval_ms;
        Ok(())
    }

    pub fn press_down(&mut self, now_ms: u64) -> Result<EpisodeId, HoldError> {
        if let Some(episode) = self.current_episode() {
            return Err(HoldError::AlreadyHolding(episode));
        }
        self.last_episode += 1;
        let episode = EpisodeId(self.last_episode);
        self.elapsed_ms = 0;
        self.transition(HoldState::Holding {
            episode,
            started_at_ms: now_ms,
        });
        Ok(episode)
    }

    /// Releases the trigger. Returns the cancelled episode, or `None` when
    /// nothing was held (e.g. release after the trigger already confirmed).
    pub fn press_up(&mut self) -> Option<EpisodeId> {
        let episode = self.current_episode()?;
        self.transition(HoldState::Cancelled);
        self.reset();
        Some(episode)
    }

    pub fn tick(&mut self, episode: EpisodeId, now_ms: u64) -> HoldTick {
        let HoldState::Holding {
            episode: held,
            started_at_ms,
        } = self.state
        else {
            debug!(%episode, "wake-up ignored, trigger not held");
            return HoldTick::Stale;
        };
        if held != episode {
            debug!(%episode, current = %held, "wake-up ignored, episode superseded");
            return HoldTick::Stale;
        }

        let elapsed_ms = now_ms.saturating_sub(started_at_ms);
        self.elapsed_ms = elapsed_ms;

        if elapsed_ms < self.confirm_after_ms {
            return HoldTick::Waiting {
                elapsed_ms,
                remaining_ms: self.confirm_after_ms - elapsed_ms,
            };
        }

        self.transition(HoldState::Confirmed);
        self.reset();
        HoldTick::Confirmed(Trigger {
            episode,
            held_ms: elapsed_ms,
        })
    }

    fn reset(&mut self) {
        self.elapsed_ms = 0;
        self.transition(HoldState::Idle);
    }

    fn transition(&mut self, next: HoldState) {
        debug!(from = ?self.state, to = ?next, "hold state transition");
        self.state = next;
    }
}
