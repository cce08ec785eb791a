//! CLI argument parsing using clap.
//!
//! Defines the command-line interface for raksha-cli.

use std::path::PathBuf;

use clap::Parser;

use crate::geolocation::Coordinates;

/// Raksha CLI - Headless driver for the personal-safety core
#[derive(Parser, Debug, Clone)]
#[command(name = "raksha-cli")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Execute a single command and exit (e.g. `-e "sos"`)
    #[arg(short = 'e', long, conflicts_with = "file")]
    pub execute: Option<String>,

    /// Execute commands from a file (one per line, `#` for comments) and exit
    #[arg(short = 'f', long, conflicts_with = "execute")]
    pub file: Option<PathBuf>,

    /// Display name for this session (overrides `profile.display_name`)
    #[arg(short = 'u', long, env = "RAKSHA_USER")]
    pub user: Option<String>,

    /// Fixed position as `LAT,LNG` (overrides the configured location provider)
    #[arg(short = 'l', long, value_parser = parse_coordinates, allow_hyphen_values = true)]
    pub location: Option<Coordinates>,

    /// Settings file (default: ~/.raksha/settings.toml)
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Output events and results as JSON lines (for scripting/parsing)
    #[arg(long)]
    pub json: bool,

    /// Show verbose output (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Parse `LAT,LNG` in decimal degrees.
pub fn parse_coordinates(value: &str) -> Result<Coordinates, String> {
    let (lat, lng) = value
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LNG but got '{}'", value))?;
    let latitude: f64 = lat
        .trim()
        .parse()
        .map_err(|_| format!("invalid latitude '{}'", lat.trim()))?;
    let longitude: f64 = lng
        .trim()
        .parse()
        .map_err(|_| format!("invalid longitude '{}'", lng.trim()))?;

    let coords = Coordinates::new(latitude, longitude);
    if !coords.is_valid() {
        return Err(format!("position {},{} is out of range", latitude, longitude));
    }
    Ok(coords)
}
