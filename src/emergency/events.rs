use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::episode::{EmergencyEpisode, Recipient};

/// Emergency episode transitions, in the order they happened.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EmergencyEvent {
    /// Episode became active
    Triggered {
        episode_id: Uuid,
        sender: String,
        started_at: DateTime<Utc>,
        recipients: Vec<Recipient>,
    },

    /// Episode stood down by the user
    Cancelled { episode_id: Uuid, duration_ms: i64 },

    /// Background lookup attached a position to the active episode
    LocationAttached {
        episode_id: Uuid,
        latitude: f64,
        longitude: f64,
    },

    /// Background lookup failed; the episode stays active without a position
    LocationUnavailable { episode_id: Uuid, reason: String },

    /// Position pushed in through `update_location`
    LocationUpdated { latitude: f64, longitude: f64 },
}

/// Synchronous listener for episode transitions.
///
/// Called while the manager holds its state lock, immediately after the
/// transition and before the next one can start. Implementations must be quick
/// and must not call back into the manager.
pub trait EpisodeObserver: Send + Sync + 'static {
    fn on_event(&self, event: &EmergencyEvent, episode: &EmergencyEpisode);
}
