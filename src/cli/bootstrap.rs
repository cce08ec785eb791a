//! CLI bootstrap - build a full session for headless use.
//!
//! `CliContext` owns the same `SessionContext` a GUI shell would build, wired to
//! a channel-backed `CliRuntime` whose events are rendered by `output.rs`.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing_subscriber::filter::Directive;

use crate::geolocation::{FixedLocationSource, GeolocationAdapter};
use crate::runtime::{CliRuntime, RakshaRuntime, RuntimeEvent};
use crate::session::{SessionContext, SessionUser};
use crate::settings::{RakshaSettings, SettingsManager};

use super::args::Args;
use super::output::run_event_loop;

pub struct CliContext {
    pub session: SessionContext,

    pub settings_manager: Arc<SettingsManager>,

    /// Command-line arguments
    pub args: Args,

    /// Output loop; finishes once the runtime shuts down
    output: JoinHandle<Result<()>>,
}

impl CliContext {
    pub fn json_mode(&self) -> bool {
        self.args.json
    }

    /// Log out, then wait for queued events to be printed.
    pub async fn shutdown(self) -> Result<()> {
        self.session.logout().await;

        match self.output.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Output handler error: {}", e),
            Err(e) => tracing::warn!("Output handler panicked: {}", e),
        }
        Ok(())
    }
}

/// Load `.env` and settings, install logging, and start the session.
pub async fn initialize(args: &Args) -> Result<CliContext> {
    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Failed to load .env file: {}", e);
        }
    }

    let settings_manager = Arc::new(
        match &args.settings {
            Some(path) => SettingsManager::at_path(path).await,
            None => SettingsManager::new().await,
        }
        .context("Failed to initialize settings manager")?,
    );
    let settings = settings_manager.get().await;

    init_logging(args, &settings)?;

    if args.settings.is_none() {
        if let Err(e) = settings_manager.ensure_settings_file().await {
            tracing::warn!("Failed to create settings template: {}", e);
        }
    }

    if args.verbose {
        eprintln!(
            "[cli] Settings loaded from {}",
            settings_manager.path().display()
        );
    }

    let (event_tx, event_rx) = mpsc::unbounded_channel::<RuntimeEvent>();
    let runtime: Arc<dyn RakshaRuntime> = Arc::new(CliRuntime::new(event_tx, args.json));

    let session = build_session(args, &settings, runtime)?;
    if args.verbose {
        eprintln!("[cli] Session started for {}", session.user().name);
    }

    let json_mode = args.json;
    let output = tokio::spawn(async move { run_event_loop(event_rx, json_mode).await });

    Ok(CliContext {
        session,
        settings_manager,
        args: args.clone(),
        output,
    })
}

fn init_logging(args: &Args, settings: &RakshaSettings) -> Result<()> {
    let level = if args.verbose {
        "debug"
    } else {
        settings.advanced.log_level.as_str()
    };
    let directive: Directive = format!("raksha={}", level)
        .parse()
        .with_context(|| format!("Invalid log level '{}'", level))?;

    // Logs go to stderr so --json output on stdout stays parseable
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .try_init();
    Ok(())
}

/// Settings first, then command-line overrides.
fn build_session(
    args: &Args,
    settings: &RakshaSettings,
    runtime: Arc<dyn RakshaRuntime>,
) -> Result<SessionContext> {
    let name = args
        .user
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| settings.profile.display_name.clone());

    let mut builder = SessionContext::builder(SessionUser::new(name))
        .settings(settings)?
        .runtime(runtime);

    if let Some(coords) = args.location {
        builder = builder.geolocation(GeolocationAdapter::with_timeout(
            Arc::new(FixedLocationSource::new(coords)),
            settings.location.timeout(),
        ));
    }

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::geolocation::Coordinates;
    use crate::runtime::NullRuntime;
    use crate::settings::LocationProvider;

    #[tokio::test]
    async fn test_user_flag_overrides_profile() {
        let mut settings = RakshaSettings::default();
        settings.profile.display_name = "From Settings".to_string();

        let args = Args::parse_from(["raksha-cli", "--user", "Tara"]);
        let session = build_session(&args, &settings, Arc::new(NullRuntime)).unwrap();
        assert_eq!(session.user().name, "Tara");

        let args = Args::parse_from(["raksha-cli", "--user", "  "]);
        let session = build_session(&args, &settings, Arc::new(NullRuntime)).unwrap();
        assert_eq!(session.user().name, "From Settings");
    }

    #[tokio::test]
    async fn test_location_flag_overrides_provider() {
        let mut settings = RakshaSettings::default();
        settings.location.provider = LocationProvider::Http;
        settings.location.endpoint = Some("http://127.0.0.1:9/where".to_string());

        let args = Args::parse_from(["raksha-cli", "--location", "12.97,77.59"]);
        let session = build_session(&args, &settings, Arc::new(NullRuntime)).unwrap();

        let position = session.refresh_location().await;
        assert!(position.is_live());
        assert_eq!(position.coordinates(), Coordinates::new(12.97, 77.59));
    }

    #[tokio::test]
    async fn test_misconfigured_provider_fails_bootstrap() {
        let mut settings = RakshaSettings::default();
        settings.location.provider = LocationProvider::Fixed;

        let args = Args::parse_from(["raksha-cli"]);
        assert!(build_session(&args, &settings, Arc::new(NullRuntime)).is_err());
    }
}
