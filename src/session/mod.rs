//! Per-user session context.
//!
//! Everything that lives for one signed-in session (the contact directory, the
//! episode, the alert feed, the hold controller) is built once by
//! `SessionBuilder` and handed out from `SessionContext`. `logout()` tears the
//! whole thing down.

mod builder;

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

pub use builder::{location_source, SessionBuilder};

use crate::contacts::{Contact, ContactDirectory, ContactId, Relationship};
use crate::emergency::{AlertFeed, AlertRecord, EmergencyEpisode, EmergencySessionManager};
use crate::error::{RakshaError, Result};
use crate::geolocation::{Coordinates, GeolocationAdapter, LocationError};
use crate::gesture::{HoldController, HoldGesture, PressOutcome, ReleaseSource};
use crate::runtime::RakshaRuntime;

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub name: String,
}

impl SessionUser {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

/// Position to show on the map.
#[derive(Debug, Clone, PartialEq)]
pub enum MapPosition {
    /// Fresh fix, also stored on the episode
    Live(Coordinates),
    /// Lookup failed; display-only default
    Fallback {
        coordinates: Coordinates,
        reason: LocationError,
    },
}

impl MapPosition {
    pub fn coordinates(&self) -> Coordinates {
        match self {
            MapPosition::Live(coords) => *coords,
            MapPosition::Fallback { coordinates, .. } => *coordinates,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, MapPosition::Live(_))
    }
}

/// Dashboard snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub user: String,
    pub episode: EmergencyEpisode,
    pub gesture: HoldGesture,
    pub contacts: usize,
    pub emergency_contacts: usize,
    pub active_alerts: usize,
}

pub struct SessionContext {
    user: SessionUser,
    directory: Arc<ContactDirectory>,
    manager: Arc<EmergencySessionManager>,
    alerts: Arc<AlertFeed>,
    releases: Arc<ReleaseSource>,
    hold: HoldController,
    geolocation: GeolocationAdapter,
    fallback: Coordinates,
    runtime: Arc<dyn RakshaRuntime>,
}

impl SessionContext {
    pub fn builder(user: SessionUser) -> SessionBuilder {
        SessionBuilder::new(user)
    }

    pub fn user(&self) -> &SessionUser {
        &self.user
    }

    pub fn directory(&self) -> &Arc<ContactDirectory> {
        &self.directory
    }

    pub fn manager(&self) -> &Arc<EmergencySessionManager> {
        &self.manager
    }

    pub fn alerts(&self) -> &Arc<AlertFeed> {
        &self.alerts
    }

    pub fn hold(&self) -> &HoldController {
        &self.hold
    }

    pub fn runtime(&self) -> &Arc<dyn RakshaRuntime> {
        &self.runtime
    }

    /// Where the host reports pointer releases.
    pub fn releases(&self) -> &Arc<ReleaseSource> {
        &self.releases
    }

    // Contacts

    pub fn add_contact(
        &self,
        name: &str,
        phone: &str,
        relationship: impl Into<Relationship>,
    ) -> Result<Contact> {
        Ok(self.directory.add_contact(name, phone, relationship)?)
    }

    pub fn remove_contact(&self, id: ContactId) -> Result<Contact> {
        self.directory
            .remove_contact(id)
            .ok_or_else(|| RakshaError::NotFound(format!("contact {}", id)))
    }

    /// Flip a contact's emergency flag; returns the new value.
    pub fn toggle_emergency(&self, id: ContactId) -> Result<bool> {
        self.directory
            .toggle_emergency(id)
            .ok_or_else(|| RakshaError::NotFound(format!("contact {}", id)))
    }

    // Episode

    pub fn press(&self) -> PressOutcome {
        self.hold.press_start()
    }

    pub fn release(&self) {
        self.hold.press_end()
    }

    /// Trigger without the hold gesture.
    pub fn trigger_sos(&self) -> bool {
        self.manager.trigger()
    }

    pub fn cancel_sos(&self) -> bool {
        self.manager.cancel()
    }

    pub fn update_location(&self, latitude: f64, longitude: f64) {
        self.manager.update_location(latitude, longitude)
    }

    /// Look the position up now. A fix is stored on the episode; on failure the
    /// configured fallback is returned for display only.
    pub async fn refresh_location(&self) -> MapPosition {
        match self.geolocation.locate().await {
            Ok(coords) => {
                self.manager
                    .update_location(coords.latitude, coords.longitude);
                MapPosition::Live(coords)
            }
            Err(reason) => {
                tracing::warn!("[session] Using fallback position: {}", reason);
                MapPosition::Fallback {
                    coordinates: self.fallback,
                    reason,
                }
            }
        }
    }

    /// Map link for the last known position.
    pub fn share_location(&self) -> Option<String> {
        self.manager.episode().location.map(|c| c.maps_url())
    }

    // Responder side

    pub fn alert_feed(&self) -> Vec<AlertRecord> {
        self.alerts.alerts()
    }

    pub fn resolve_alert(&self, id: Uuid) -> Result<()> {
        if self.alerts.resolve(id) {
            Ok(())
        } else {
            Err(RakshaError::NotFound(format!("active alert {}", id)))
        }
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            user: self.user.name.clone(),
            episode: self.manager.episode(),
            gesture: self.hold.gesture(),
            contacts: self.directory.len(),
            emergency_contacts: self.directory.emergency_count(),
            active_alerts: self.alerts.active_alerts().len(),
        }
    }

    /// End the session: drop any hold in flight, stand down an active episode,
    /// then shut the runtime down.
    pub async fn logout(self) {
        self.hold.abort();
        if self.manager.cancel() {
            tracing::info!("[session] Active episode cancelled at logout");
        }
        if let Err(e) = self.runtime.shutdown().await {
            tracing::warn!("[session] Runtime shutdown error: {}", e);
        }
        tracing::info!("[session] {} logged out", self.user.name);
    }
}
