//! Settings loading, saving, and environment variable interpolation.
//!
//! `SettingsManager` reads `~/.raksha/settings.toml`, resolves `$VAR` / `${VAR}`
//! references in string values, writes back atomically (temp file + rename),
//! and can drop a commented template on first run.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tokio::sync::RwLock;

use super::schema::RakshaSettings;

/// Embedded template for first-run generation.
const TEMPLATE: &str = include_str!("template.toml");

/// Path to the per-user settings file.
pub fn settings_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".raksha")
        .join("settings.toml")
}

pub struct SettingsManager {
    /// Cached settings with env references resolved
    settings: RwLock<RakshaSettings>,
    path: PathBuf,
}

impl SettingsManager {
    /// Load from the default location.
    pub async fn new() -> Result<Self> {
        Self::at_path(settings_path()).await
    }

    /// Load from an explicit file. A missing file yields defaults.
    pub async fn at_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = load_from_path(&path).await?;
        Ok(Self {
            settings: RwLock::new(settings),
            path,
        })
    }

    pub async fn get(&self) -> RakshaSettings {
        self.settings.read().await.clone()
    }

    /// Replace the cached settings and persist them.
    pub async fn update(&self, new_settings: RakshaSettings) -> Result<()> {
        let toml_string =
            toml::to_string_pretty(&new_settings).context("Failed to serialize settings")?;
        write_atomic(&self.path, &toml_string).await?;
        *self.settings.write().await = new_settings;

        tracing::info!("[settings] Saved settings to {:?}", self.path);
        Ok(())
    }

    /// Read one value by dot path, e.g. `"hold.tick_ms"`.
    pub async fn get_value(&self, key: &str) -> Result<serde_json::Value> {
        let json = serde_json::to_value(&*self.settings.read().await)?;
        key.split('.')
            .try_fold(&json, |node, part| node.get(part))
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Setting '{}' not found", key))
    }

    /// Set one value by dot path and persist. The result must still deserialize.
    pub async fn set_value(&self, key: &str, value: serde_json::Value) -> Result<()> {
        let mut json = serde_json::to_value(self.get().await)?;
        let parts: Vec<&str> = key.split('.').collect();
        set_nested_value(&mut json, &parts, value)?;

        let updated: RakshaSettings = serde_json::from_value(json)
            .with_context(|| format!("Invalid value for setting '{}'", key))?;
        self.update(updated).await
    }

    pub async fn reset(&self) -> Result<()> {
        self.update(RakshaSettings::default()).await
    }

    pub async fn reload(&self) -> Result<()> {
        let settings = load_from_path(&self.path).await?;
        *self.settings.write().await = settings;
        Ok(())
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the commented template if no settings file exists yet.
    ///
    /// Returns `true` if a new file was created.
    pub async fn ensure_settings_file(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, TEMPLATE).await?;
        tracing::info!("[settings] Generated settings template at {:?}", self.path);
        Ok(true)
    }
}

async fn load_from_path(path: &Path) -> Result<RakshaSettings> {
    if !path.exists() {
        tracing::debug!("[settings] No settings file at {:?}, using defaults", path);
        return Ok(RakshaSettings::default());
    }

    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read settings file {:?}", path))?;
    let mut settings: RakshaSettings =
        toml::from_str(&contents).context("Failed to deserialize settings")?;
    resolve_env_vars(&mut settings);

    tracing::info!("[settings] Loaded settings from {:?}", path);
    Ok(settings)
}

async fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let temp_path = path.with_extension("toml.tmp");
    tokio::fs::write(&temp_path, contents).await?;
    tokio::fs::rename(&temp_path, path).await?;
    Ok(())
}

fn resolve_env_vars(settings: &mut RakshaSettings) {
    if let Some(endpoint) = settings.location.endpoint.as_mut() {
        if let Some(resolved) = resolve_env_ref(endpoint) {
            *endpoint = resolved;
        }
    }
    if let Some(name) = resolve_env_ref(&settings.profile.display_name) {
        settings.profile.display_name = name;
    }
}

fn set_nested_value(
    json: &mut serde_json::Value,
    parts: &[&str],
    value: serde_json::Value,
) -> Result<()> {
    let Some((last, parents)) = parts.split_last() else {
        bail!("Empty key path");
    };

    let mut current = json;
    for part in parents {
        current = current
            .get_mut(*part)
            .ok_or_else(|| anyhow::anyhow!("Setting path '{}' not found", parts.join(".")))?;
    }

    match current.as_object_mut() {
        Some(obj) => {
            obj.insert((*last).to_string(), value);
            Ok(())
        }
        None => bail!("Cannot set '{}' on a non-table value", parts.join(".")),
    }
}

/// Resolve a `$VAR` or `${VAR}` reference.
///
/// `None` if the value is not a reference or the variable is unset.
fn resolve_env_ref(value: &str) -> Option<String> {
    let trimmed = value.trim();
    let reference = trimmed.strip_prefix('$')?;
    let var_name = reference
        .strip_prefix('{')
        .and_then(|r| r.strip_suffix('}'))
        .unwrap_or(reference);
    std::env::var(var_name).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::schema::LocationProvider;

    #[test]
    fn test_resolve_env_ref_dollar_format() {
        std::env::set_var("RAKSHA_TEST_VAR_1", "value_1");
        assert_eq!(
            resolve_env_ref("$RAKSHA_TEST_VAR_1"),
            Some("value_1".to_string())
        );
        std::env::remove_var("RAKSHA_TEST_VAR_1");
    }

    #[test]
    fn test_resolve_env_ref_braces_format() {
        std::env::set_var("RAKSHA_TEST_VAR_2", "value_2");
        assert_eq!(
            resolve_env_ref("${RAKSHA_TEST_VAR_2}"),
            Some("value_2".to_string())
        );
        std::env::remove_var("RAKSHA_TEST_VAR_2");
    }

    #[test]
    fn test_resolve_env_ref_no_match() {
        assert_eq!(resolve_env_ref("https://example.org/where"), None);
        assert_eq!(resolve_env_ref("$RAKSHA_NONEXISTENT_VAR_XYZ"), None);
    }

    #[test]
    fn test_template_parses_to_defaults() {
        let settings: RakshaSettings = toml::from_str(TEMPLATE).unwrap();
        let defaults = RakshaSettings::default();
        assert_eq!(settings.hold.tick_ms, defaults.hold.tick_ms);
        assert_eq!(settings.location.provider, LocationProvider::None);
        assert_eq!(settings.profile.display_name, defaults.profile.display_name);
    }

    #[tokio::test]
    async fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SettingsManager::at_path(dir.path().join("settings.toml"))
            .await
            .unwrap();
        assert!(!manager.exists());
        assert_eq!(manager.get().await.hold.step, 2);
    }

    #[tokio::test]
    async fn test_ensure_settings_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");
        let manager = SettingsManager::at_path(&path).await.unwrap();

        assert!(manager.ensure_settings_file().await.unwrap());
        assert!(!manager.ensure_settings_file().await.unwrap());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_set_value_persists_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let manager = SettingsManager::at_path(&path).await.unwrap();

        manager
            .set_value("profile.display_name", serde_json::json!("Meera"))
            .await
            .unwrap();
        manager
            .set_value("hold.tick_ms", serde_json::json!(20))
            .await
            .unwrap();
        assert_eq!(
            manager.get_value("hold.tick_ms").await.unwrap(),
            serde_json::json!(20)
        );
        assert!(!path.with_extension("toml.tmp").exists());

        let reloaded = SettingsManager::at_path(&path).await.unwrap();
        let settings = reloaded.get().await;
        assert_eq!(settings.profile.display_name, "Meera");
        assert_eq!(settings.hold.tick_ms, 20);
    }

    #[tokio::test]
    async fn test_set_value_rejects_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SettingsManager::at_path(dir.path().join("settings.toml"))
            .await
            .unwrap();

        assert!(manager
            .set_value("location.provider", serde_json::json!("carrier-pigeon"))
            .await
            .is_err());
        assert!(manager
            .set_value("nope.key", serde_json::json!(1))
            .await
            .is_err());
        assert!(manager.get_value("hold.missing").await.is_err());
        // Nothing was written
        assert!(!manager.exists());
    }

    #[tokio::test]
    async fn test_endpoint_env_reference_resolved_on_load() {
        std::env::set_var("RAKSHA_TEST_LOCATION_URL", "http://127.0.0.1:9/where");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        tokio::fs::write(
            &path,
            "[location]\nprovider = \"http\"\nendpoint = \"${RAKSHA_TEST_LOCATION_URL}\"\n",
        )
        .await
        .unwrap();

        let manager = SettingsManager::at_path(&path).await.unwrap();
        let settings = manager.get().await;
        assert_eq!(settings.location.provider, LocationProvider::Http);
        assert_eq!(
            settings.location.endpoint.as_deref(),
            Some("http://127.0.0.1:9/where")
        );
        std::env::remove_var("RAKSHA_TEST_LOCATION_URL");
    }

    #[tokio::test]
    async fn test_reload_picks_up_external_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let manager = SettingsManager::at_path(&path).await.unwrap();

        tokio::fs::write(&path, "[notifications]\nenabled = false\n")
            .await
            .unwrap();
        manager.reload().await.unwrap();
        assert!(!manager.get().await.notifications.enabled);
    }
}
