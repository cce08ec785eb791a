//! TOML settings for Raksha.
//!
//! Settings are loaded from `~/.raksha/settings.toml` with environment variable
//! interpolation support. Command-line flags override what is loaded here.
//!
//! # Usage
//!
//! ```rust,ignore
//! use raksha_lib::settings::SettingsManager;
//!
//! let manager = SettingsManager::new().await?;
//! let settings = manager.get().await;
//! let hold = settings.hold.to_config();
//! ```

pub mod loader;
pub mod schema;

pub use loader::{settings_path, SettingsManager};
pub use schema::{LocationProvider, RakshaSettings};
