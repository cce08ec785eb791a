//! Settings schema definitions for Raksha configuration.
//!
//! All settings structs use `#[serde(default)]` to allow partial configuration files.
//! Missing fields are filled with sensible defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::geolocation::Coordinates;
use crate::gesture::HoldConfig;

/// Root settings structure for Raksha.
///
/// Loaded from `~/.raksha/settings.toml` with environment variable interpolation support.
/// Version field enables future migrations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RakshaSettings {
    /// Schema version for migrations
    pub version: u32,

    /// Who this device belongs to
    pub profile: ProfileSettings,

    /// Hold-to-confirm timing
    pub hold: HoldSettings,

    /// Where positions come from
    pub location: LocationSettings,

    /// Outbound alert delivery
    pub notifications: NotificationSettings,

    /// Advanced/debug settings
    pub advanced: AdvancedSettings,
}

/// User profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileSettings {
    /// Name shown on alerts raised from this device
    pub display_name: String,
}

/// Hold gesture timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HoldSettings {
    /// Milliseconds between progress ticks
    pub tick_ms: u64,

    /// Progress added per tick
    pub step: u8,

    /// Progress at which the hold confirms (at most 100)
    pub threshold: u8,
}

/// Position provider kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocationProvider {
    /// No positioning; every lookup reports unavailable
    #[default]
    None,
    /// Always the configured `latitude`/`longitude`
    Fixed,
    /// JSON endpoint returning `{ "latitude": .., "longitude": .. }`
    Http,
}

/// Geolocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationSettings {
    pub provider: LocationProvider,

    /// Fixed provider latitude
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,

    /// Fixed provider longitude
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,

    /// HTTP provider endpoint (supports $ENV_VAR syntax)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Lookup timeout in milliseconds
    pub timeout_ms: u64,

    /// Shown on the map when no position can be obtained. Never attached to an episode.
    pub fallback_latitude: f64,
    pub fallback_longitude: f64,
}

/// Notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    /// Deliver alerts to emergency contacts
    pub enabled: bool,
}

/// Advanced/debug settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedSettings {
    /// Log level: "error" | "warn" | "info" | "debug" | "trace"
    pub log_level: String,
}

impl HoldSettings {
    pub fn to_config(&self) -> HoldConfig {
        HoldConfig::new(Duration::from_millis(self.tick_ms), self.step, self.threshold)
    }
}

impl LocationSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn fallback(&self) -> Coordinates {
        Coordinates::new(self.fallback_latitude, self.fallback_longitude)
    }

    /// Configured fixed position, if both halves are present.
    pub fn fixed_position(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => None,
        }
    }
}

// =============================================================================
// Default implementations
// =============================================================================

impl Default for RakshaSettings {
    fn default() -> Self {
        Self {
            version: 1,
            profile: ProfileSettings::default(),
            hold: HoldSettings::default(),
            location: LocationSettings::default(),
            notifications: NotificationSettings::default(),
            advanced: AdvancedSettings::default(),
        }
    }
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            display_name: "User".to_string(),
        }
    }
}

impl Default for HoldSettings {
    fn default() -> Self {
        Self {
            tick_ms: 30,
            step: 2,
            threshold: 100,
        }
    }
}

impl Default for LocationSettings {
    fn default() -> Self {
        Self {
            provider: LocationProvider::None,
            latitude: None,
            longitude: None,
            endpoint: None,
            timeout_ms: 5000,
            fallback_latitude: 28.6139,
            fallback_longitude: 77.2090,
        }
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for AdvancedSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
