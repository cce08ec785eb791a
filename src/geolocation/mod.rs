//! Geolocation adapter.
//!
//! Wraps a platform location source behind the `LocationSource` trait and turns
//! every failure mode (source error, timeout, missing provider) into
//! `LocationError`, which callers treat as a degraded result rather than a
//! failure of whatever they were doing.

mod source;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use source::{FixedLocationSource, HttpLocationSource, UnavailableLocationSource};

/// Default time allowed for a single position lookup.
pub const DEFAULT_LOCATION_TIMEOUT: Duration = Duration::from_secs(5);

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both components are finite and inside the valid degree ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Shareable map link for this position.
    pub fn maps_url(&self) -> String {
        format!(
            "https://www.google.com/maps?q={},{}",
            self.latitude, self.longitude
        )
    }
}

/// Why a position could not be produced.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LocationError {
    #[error("no location provider configured")]
    NoProvider,

    #[error("location lookup timed out after {0}ms")]
    Timeout(u64),

    #[error("location source failed: {0}")]
    Source(String),

    #[error("location source returned invalid coordinates ({latitude}, {longitude})")]
    InvalidCoordinates { latitude: f64, longitude: f64 },
}

/// A platform location source, invoked on demand (never polled by the core).
#[async_trait::async_trait]
pub trait LocationSource: Send + Sync + 'static {
    /// Produce the current position, single-shot.
    async fn current_position(&self) -> Result<Coordinates, LocationError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Bounds a `LocationSource` with a timeout and validates what it returns.
#[derive(Clone)]
pub struct GeolocationAdapter {
    source: Arc<dyn LocationSource>,
    timeout: Duration,
}

impl GeolocationAdapter {
    pub fn new(source: Arc<dyn LocationSource>) -> Self {
        Self::with_timeout(source, DEFAULT_LOCATION_TIMEOUT)
    }

    pub fn with_timeout(source: Arc<dyn LocationSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    /// Adapter with no provider; every lookup fails with `NoProvider`.
    pub fn unavailable() -> Self {
        Self::new(Arc::new(UnavailableLocationSource))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Look up the current position once.
    pub async fn locate(&self) -> Result<Coordinates, LocationError> {
        let lookup = self.source.current_position();
        let coords = match tokio::time::timeout(self.timeout, lookup).await {
            Ok(result) => result?,
            Err(_) => {
                let ms = self.timeout.as_millis() as u64;
                tracing::warn!("[location] {} timed out after {}ms", self.source.name(), ms);
                return Err(LocationError::Timeout(ms));
            }
        };

        if !coords.is_valid() {
            return Err(LocationError::InvalidCoordinates {
                latitude: coords.latitude,
                longitude: coords.longitude,
            });
        }

        tracing::debug!(
            "[location] {} -> ({}, {})",
            self.source.name(),
            coords.latitude,
            coords.longitude
        );
        Ok(coords)
    }
}

impl std::fmt::Debug for GeolocationAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeolocationAdapter")
            .field("source", &self.source.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}
