use std::sync::Arc;

use anyhow::{Context, Result};

use super::{SessionContext, SessionUser};
use crate::contacts::ContactDirectory;
use crate::emergency::{
    AlertFeed, EmergencySessionManager, NotificationDispatcher, NullDispatcher, TracingDispatcher,
};
use crate::geolocation::{
    Coordinates, FixedLocationSource, GeolocationAdapter, HttpLocationSource, LocationSource,
    UnavailableLocationSource,
};
use crate::gesture::{HoldConfig, HoldController, ReleaseSource};
use crate::runtime::{NullRuntime, RakshaRuntime};
use crate::settings::schema::{LocationProvider, LocationSettings};
use crate::settings::RakshaSettings;

/// Assembles a `SessionContext`. Anything not set falls back to the defaults
/// (no location provider, logged notifications, no presentation runtime).
pub struct SessionBuilder {
    user: SessionUser,
    hold: HoldConfig,
    geolocation: GeolocationAdapter,
    dispatcher: Arc<dyn NotificationDispatcher>,
    runtime: Arc<dyn RakshaRuntime>,
    fallback: Coordinates,
}

impl SessionBuilder {
    pub fn new(user: SessionUser) -> Self {
        Self {
            user,
            hold: HoldConfig::default(),
            geolocation: GeolocationAdapter::unavailable(),
            dispatcher: Arc::new(TracingDispatcher),
            runtime: Arc::new(NullRuntime),
            fallback: LocationSettings::default().fallback(),
        }
    }

    /// Apply hold timing, location provider, fallback and notification settings.
    pub fn settings(mut self, settings: &RakshaSettings) -> Result<Self> {
        self.hold = settings.hold.to_config();
        self.geolocation = GeolocationAdapter::with_timeout(
            location_source(&settings.location)?,
            settings.location.timeout(),
        );
        self.fallback = settings.location.fallback();
        if !settings.notifications.enabled {
            tracing::info!("[session] Notifications disabled in settings");
            self.dispatcher = Arc::new(NullDispatcher);
        }
        Ok(self)
    }

    pub fn hold(mut self, config: HoldConfig) -> Self {
        self.hold = config;
        self
    }

    pub fn geolocation(mut self, adapter: GeolocationAdapter) -> Self {
        self.geolocation = adapter;
        self
    }

    pub fn dispatcher(mut self, dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn runtime(mut self, runtime: Arc<dyn RakshaRuntime>) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn fallback(mut self, coords: Coordinates) -> Self {
        self.fallback = coords;
        self
    }

    pub fn build(self) -> SessionContext {
        let directory = Arc::new(ContactDirectory::with_runtime(self.runtime.clone()));
        let manager = Arc::new(
            EmergencySessionManager::new(
                directory.clone(),
                self.geolocation.clone(),
                self.dispatcher,
                self.user.name.clone(),
            )
            .with_runtime(self.runtime.clone()),
        );
        let alerts = Arc::new(AlertFeed::new());
        manager.add_observer(alerts.clone());

        let releases = Arc::new(ReleaseSource::new());
        let hold = HoldController::with_runtime(
            self.hold,
            manager.clone(),
            releases.clone(),
            self.runtime.clone(),
        );

        tracing::info!("[session] Session started for {}", self.user.name);
        SessionContext {
            user: self.user,
            directory,
            manager,
            alerts,
            releases,
            hold,
            geolocation: self.geolocation,
            fallback: self.fallback,
            runtime: self.runtime,
        }
    }
}

/// Build the location source named by `[location] provider`.
pub fn location_source(settings: &LocationSettings) -> Result<Arc<dyn LocationSource>> {
    let source: Arc<dyn LocationSource> = match settings.provider {
        LocationProvider::None => Arc::new(UnavailableLocationSource),
        LocationProvider::Fixed => {
            let coords = settings.fixed_position().context(
                "location.provider = \"fixed\" requires location.latitude and location.longitude",
            )?;
            Arc::new(FixedLocationSource::new(coords))
        }
        LocationProvider::Http => {
            let endpoint = settings
                .endpoint
                .as_deref()
                .context("location.provider = \"http\" requires location.endpoint")?;
            let source = HttpLocationSource::new(endpoint, settings.timeout())
                .with_context(|| format!("Invalid location endpoint '{}'", endpoint))?;
            Arc::new(source)
        }
    };
    tracing::debug!("[session] Location provider: {}", source.name());
    Ok(source)
}
