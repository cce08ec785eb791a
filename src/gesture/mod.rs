//! Hold-to-confirm gesture.
//!
//! A press that is held long enough arms the SOS; a press while an episode is
//! already active cancels it immediately. The ramp is a cancellable ticker owned
//! by `HoldController`, and the document-level "pointer released" listener is a
//! `ReleaseSubscription` that exists only for the lifetime of one hold.

mod controller;
mod progress;
mod release;

use std::time::Duration;

use serde::Serialize;

pub use controller::HoldController;
pub use progress::{HoldProgress, HoldTick};
pub use release::{ReleaseSource, ReleaseSubscription};

/// Progress value at which a hold counts as confirmed.
pub const FULL_PROGRESS: u8 = 100;

/// Ramp timing. Defaults to +2 every 30ms (full ramp in 1.5s).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldConfig {
    pub tick: Duration,
    pub step: u8,
    pub threshold: u8,
}

impl HoldConfig {
    /// Normalized config: step and threshold are clamped to `1..=100`, tick to at least 1ms.
    pub fn new(tick: Duration, step: u8, threshold: u8) -> Self {
        Self {
            tick: tick.max(Duration::from_millis(1)),
            step: step.clamp(1, FULL_PROGRESS),
            threshold: threshold.clamp(1, FULL_PROGRESS),
        }
    }

    /// Total time a press must be held before it confirms.
    pub fn ramp_duration(&self) -> Duration {
        let ticks = u32::from(self.threshold).div_ceil(u32::from(self.step));
        self.tick * ticks
    }
}

impl Default for HoldConfig {
    fn default() -> Self {
        Self::new(Duration::from_millis(30), 2, FULL_PROGRESS)
    }
}

/// Observable gesture state. `progress` is 0 whenever `is_holding` is false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldGesture {
    pub progress: u8,
    pub is_holding: bool,
}

/// Result of a press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOutcome {
    /// A new hold started ramping
    HoldStarted,
    /// The press cancelled the active episode
    CancelledEpisode,
    /// A hold was already in flight, or no timer is available
    Ignored,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HoldEvent {
    Started,
    Progress { progress: u8 },
    /// Released before the threshold
    Released { progress: u8 },
    /// Threshold reached. `triggered` is false if the episode was already active.
    Completed { triggered: bool },
    /// Tap while active
    EpisodeCancelled,
    /// Hold torn down by the session (logout)
    Aborted,
}
