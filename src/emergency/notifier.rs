use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use super::episode::Recipient;
use crate::geolocation::Coordinates;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Episode just started
    Raised,
    /// A position became available for an episode already raised
    Location,
}

/// What recipients are told about an episode.
#[derive(Debug, Clone, Serialize)]
pub struct EmergencyAlert {
    pub kind: AlertKind,
    pub episode_id: Uuid,
    pub sender: String,
    pub started_at: DateTime<Utc>,
    pub location: Option<Coordinates>,
}

impl EmergencyAlert {
    /// Human-readable text for SMS-style channels.
    pub fn message(&self) -> String {
        let headline = match self.kind {
            AlertKind::Raised => format!("SOS: {} needs help.", self.sender),
            AlertKind::Location => format!("SOS update from {}.", self.sender),
        };
        match &self.location {
            Some(coords) => format!("{} Location: {}", headline, coords.maps_url()),
            None => headline,
        }
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("delivery to {recipient} failed: {reason}")]
    Delivery { recipient: String, reason: String },
}

/// Outbound notification channel (SMS gateway, push service, ...).
///
/// Fire-and-forget from the manager's point of view: results are only logged
/// and never change episode state.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync + 'static {
    async fn notify(&self, recipient: &Recipient, alert: &EmergencyAlert)
        -> Result<(), DispatchError>;
}

/// Logs each notification instead of delivering it.
#[derive(Debug, Default)]
pub struct TracingDispatcher;

#[async_trait]
impl NotificationDispatcher for TracingDispatcher {
    async fn notify(
        &self,
        recipient: &Recipient,
        alert: &EmergencyAlert,
    ) -> Result<(), DispatchError> {
        tracing::info!(
            "[notify] -> {} ({}): {}",
            recipient.name,
            recipient.phone,
            alert.message()
        );
        Ok(())
    }
}

/// Drops every notification. Used when notifications are disabled.
#[derive(Debug, Default)]
pub struct NullDispatcher;

#[async_trait]
impl NotificationDispatcher for NullDispatcher {
    async fn notify(
        &self,
        _recipient: &Recipient,
        _alert: &EmergencyAlert,
    ) -> Result<(), DispatchError> {
        Ok(())
    }
}
