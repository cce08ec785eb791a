//! Responder-side alert feed.
//!
//! Keeps one record per episode, updated synchronously from episode
//! transitions. Responders can mark an active alert resolved.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

use super::episode::EmergencyEpisode;
use super::events::{EmergencyEvent, EpisodeObserver};
use crate::geolocation::Coordinates;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Active,
    /// Stood down by the user
    Cancelled,
    /// Closed by a responder
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    /// Same as the episode id
    pub id: Uuid,
    pub user: String,
    pub location: Option<Coordinates>,
    pub raised_at: DateTime<Utc>,
    pub status: AlertStatus,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct AlertFeed {
    alerts: RwLock<Vec<AlertRecord>>,
}

impl AlertFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// All alerts, newest first.
    pub fn alerts(&self) -> Vec<AlertRecord> {
        self.alerts.read().iter().rev().cloned().collect()
    }

    pub fn active_alerts(&self) -> Vec<AlertRecord> {
        self.alerts
            .read()
            .iter()
            .rev()
            .filter(|a| a.status == AlertStatus::Active)
            .cloned()
            .collect()
    }

    /// Mark an active alert resolved. Returns `false` if the id is unknown or the
    /// alert is already closed.
    pub fn resolve(&self, id: Uuid) -> bool {
        let mut alerts = self.alerts.write();
        match alerts
            .iter_mut()
            .find(|a| a.id == id && a.status == AlertStatus::Active)
        {
            Some(alert) => {
                alert.status = AlertStatus::Resolved;
                alert.closed_at = Some(Utc::now());
                tracing::info!("[alerts] Alert {} resolved", id);
                true
            }
            None => false,
        }
    }

    fn close(&self, id: Uuid, status: AlertStatus) {
        if let Some(alert) = self
            .alerts
            .write()
            .iter_mut()
            .find(|a| a.id == id && a.status == AlertStatus::Active)
        {
            alert.status = status;
            alert.closed_at = Some(Utc::now());
        }
    }

    fn relocate(&self, id: Uuid, coords: Coordinates) {
        if let Some(alert) = self
            .alerts
            .write()
            .iter_mut()
            .find(|a| a.id == id && a.status == AlertStatus::Active)
        {
            alert.location = Some(coords);
        }
    }
}

impl EpisodeObserver for AlertFeed {
    fn on_event(&self, event: &EmergencyEvent, episode: &EmergencyEpisode) {
        match event {
            EmergencyEvent::Triggered {
                episode_id,
                sender,
                started_at,
                ..
            } => {
                self.alerts.write().push(AlertRecord {
                    id: *episode_id,
                    user: sender.clone(),
                    location: None,
                    raised_at: *started_at,
                    status: AlertStatus::Active,
                    closed_at: None,
                });
            }
            EmergencyEvent::Cancelled { episode_id, .. } => {
                self.close(*episode_id, AlertStatus::Cancelled);
            }
            EmergencyEvent::LocationAttached {
                episode_id,
                latitude,
                longitude,
            } => {
                self.relocate(*episode_id, Coordinates::new(*latitude, *longitude));
            }
            EmergencyEvent::LocationUpdated {
                latitude,
                longitude,
            } => {
                if let Some(id) = episode.episode_id.filter(|_| episode.is_active) {
                    self.relocate(id, Coordinates::new(*latitude, *longitude));
                }
            }
            EmergencyEvent::LocationUnavailable { .. } => {}
        }
    }
}
