use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::contacts::{Contact, ContactId};
use crate::geolocation::Coordinates;

/// A contact captured at trigger time. Later directory edits do not touch it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub contact_id: ContactId,
    pub name: String,
    pub phone: String,
}

impl From<&Contact> for Recipient {
    fn from(contact: &Contact) -> Self {
        Self {
            contact_id: contact.id(),
            name: contact.name.clone(),
            phone: contact.phone.clone(),
        }
    }
}

/// Current SOS state for the session.
///
/// `location` survives `cancel()` as a passive cache of the last known position;
/// it is not authoritative while the episode is inactive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyEpisode {
    /// Identifies one active stretch; `None` while inactive.
    pub episode_id: Option<Uuid>,
    pub is_active: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub location: Option<Coordinates>,
    /// Emergency contacts snapshotted when the episode started.
    pub recipients: Vec<Recipient>,
}

impl EmergencyEpisode {
    pub fn recipient_names(&self) -> Vec<&str> {
        self.recipients.iter().map(|r| r.name.as_str()).collect()
    }

    /// Milliseconds since the episode started, if active.
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> Option<i64> {
        self.started_at
            .map(|started| (now - started).num_milliseconds().max(0))
    }
}
