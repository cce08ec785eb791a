//! CLI execution runner.
//!
//! Runs parsed commands against the session and prints their results.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::json;
use uuid::Uuid;

use crate::contacts::{Contact, ContactId, Relationship};
use crate::gesture::PressOutcome;
use crate::session::{MapPosition, SessionStatus};
use crate::settings::SettingsManager;

use super::bootstrap::CliContext;
use super::output::{print_result, short_id};
use super::repl::{ReplCommand, SettingsCommand, HELP};

/// Parse and run a single command line.
pub async fn execute_once(ctx: &mut CliContext, line: &str) -> Result<()> {
    match ReplCommand::parse(line) {
        ReplCommand::Empty | ReplCommand::Quit => Ok(()),
        command => run_command(ctx, command).await,
    }
}

/// Run commands from a file, one per line. `#` starts a comment, `quit` stops
/// early, and the first failing line aborts the batch.
pub async fn execute_batch(ctx: &mut CliContext, file_path: &Path) -> Result<()> {
    let content = tokio::fs::read_to_string(file_path)
        .await
        .with_context(|| format!("Failed to read command file: {}", file_path.display()))?;

    let commands: Vec<(usize, ReplCommand)> = content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, ReplCommand::parse(line)))
        .filter(|(_, command)| *command != ReplCommand::Empty)
        .collect();

    if commands.is_empty() {
        bail!("No commands found in file: {}", file_path.display());
    }

    if ctx.args.verbose {
        eprintln!(
            "[batch] Executing {} command(s) from {}",
            commands.len(),
            file_path.display()
        );
    }

    for (line_no, command) in commands {
        if command == ReplCommand::Quit {
            break;
        }
        run_command(ctx, command)
            .await
            .with_context(|| format!("{}:{}", file_path.display(), line_no))?;
    }

    Ok(())
}

pub(super) async fn run_command(ctx: &mut CliContext, command: ReplCommand) -> Result<()> {
    let json_mode = ctx.json_mode();
    let session = &ctx.session;

    match command {
        ReplCommand::Add {
            name,
            phone,
            relationship,
        } => {
            let relationship = relationship
                .map(|r| Relationship::from(r.as_str()))
                .unwrap_or_default();
            let contact = session.add_contact(&name, &phone, relationship)?;
            print_result(json_mode, &contact, || {
                format!("Added {} {}", contact.name, short_id(&contact.id().to_string()))
            })?;
        }
        ReplCommand::Remove(token) => {
            let id = resolve_contact(&session.directory().contacts(), &token)?;
            let removed = session.remove_contact(id)?;
            print_result(json_mode, &removed, || format!("Removed {}", removed.name))?;
        }
        ReplCommand::Toggle(token) => {
            let id = resolve_contact(&session.directory().contacts(), &token)?;
            let is_emergency = session.toggle_emergency(id)?;
            print_result(
                json_mode,
                &json!({ "id": id, "isEmergency": is_emergency }),
                || {
                    let state = if is_emergency { "now" } else { "no longer" };
                    format!("{} is {} an emergency contact", short_id(&id.to_string()), state)
                },
            )?;
        }
        ReplCommand::Contacts => {
            let contacts = session.directory().contacts();
            print_result(json_mode, &contacts, || render_contacts(&contacts))?;
        }
        ReplCommand::Hold(ms) => match session.press() {
            PressOutcome::HoldStarted => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                session.release();
            }
            PressOutcome::CancelledEpisode => {
                session.release();
            }
            PressOutcome::Ignored => bail!("A hold is already in progress"),
        },
        ReplCommand::Press => {
            if session.press() == PressOutcome::Ignored {
                bail!("A hold is already in progress");
            }
        }
        ReplCommand::Release => session.release(),
        ReplCommand::Sos => {
            if !session.trigger_sos() {
                bail!("SOS is already active");
            }
        }
        ReplCommand::Cancel => {
            if !session.cancel_sos() {
                bail!("No active SOS to cancel");
            }
        }
        ReplCommand::Locate => {
            let position = session.refresh_location().await;
            let coords = position.coordinates();
            let value = match &position {
                MapPosition::Live(_) => json!({ "position": coords, "live": true }),
                MapPosition::Fallback { reason, .. } => json!({
                    "position": coords,
                    "live": false,
                    "reason": reason.to_string(),
                }),
            };
            print_result(json_mode, &value, || match &position {
                MapPosition::Live(_) => format!("{}, {}", coords.latitude, coords.longitude),
                MapPosition::Fallback { reason, .. } => format!(
                    "{}, {} (default; {})",
                    coords.latitude, coords.longitude, reason
                ),
            })?;
        }
        ReplCommand::Location {
            latitude,
            longitude,
        } => session.update_location(latitude, longitude),
        ReplCommand::Share => match session.share_location() {
            Some(url) => print_result(json_mode, &json!({ "url": url }), || url.clone())?,
            None => bail!("No position known yet; try locate"),
        },
        ReplCommand::Status => {
            let status = session.status();
            print_result(json_mode, &status, || render_status(&status))?;
        }
        ReplCommand::Alerts => {
            let alerts = session.alert_feed();
            print_result(json_mode, &alerts, || {
                if alerts.is_empty() {
                    return "No alerts".to_string();
                }
                alerts
                    .iter()
                    .map(|a| {
                        let location = a
                            .location
                            .map(|c| format!("{}, {}", c.latitude, c.longitude))
                            .unwrap_or_else(|| "no location".to_string());
                        format!(
                            "{}  {:<10} {:<16} {}  {}",
                            short_id(&a.id.to_string()),
                            format!("{:?}", a.status).to_lowercase(),
                            a.user,
                            a.raised_at.format("%Y-%m-%d %H:%M:%S"),
                            location
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
        }
        ReplCommand::Resolve(token) => {
            let ids: Vec<Uuid> = session.alert_feed().iter().map(|a| a.id).collect();
            let id = resolve_id(&ids, &token, "alert")?;
            session.resolve_alert(id)?;
            print_result(json_mode, &json!({ "resolved": id }), || {
                format!("Resolved {}", short_id(&id.to_string()))
            })?;
        }
        ReplCommand::Settings(command) => {
            let value = run_settings(&ctx.settings_manager, command).await?;
            print_result(json_mode, &value, || render_setting(&value))?;
        }
        ReplCommand::Help => println!("{}", HELP),
        ReplCommand::Usage(usage) => bail!("usage: {}", usage),
        ReplCommand::Unknown(cmd) => bail!("Unknown command: {} (try help)", cmd),
        ReplCommand::Empty | ReplCommand::Quit => {}
    }

    Ok(())
}

/// Apply a settings command; returns the value to show.
async fn run_settings(
    manager: &SettingsManager,
    command: SettingsCommand,
) -> Result<serde_json::Value> {
    match command {
        SettingsCommand::Show => Ok(serde_json::to_value(manager.get().await)?),
        SettingsCommand::Get(key) => manager.get_value(&key).await,
        SettingsCommand::Set { key, value } => {
            // Bare words are taken as strings
            let value = serde_json::from_str(&value).unwrap_or(serde_json::Value::String(value));
            manager.set_value(&key, value).await?;
            manager.get_value(&key).await
        }
        SettingsCommand::Reset => {
            manager.reset().await?;
            Ok(json!({ "reset": manager.path().display().to_string() }))
        }
        SettingsCommand::Reload => {
            manager.reload().await?;
            Ok(json!({ "reloaded": manager.path().display().to_string() }))
        }
    }
}

fn render_setting(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Object(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        other => other.to_string(),
    }
}

fn resolve_contact(contacts: &[Contact], token: &str) -> Result<ContactId> {
    let ids: Vec<ContactId> = contacts.iter().map(Contact::id).collect();
    resolve_id(&ids, token, "contact")
}

/// Accept a full id or a unique prefix of one.
fn resolve_id(ids: &[Uuid], token: &str, kind: &str) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(token) {
        return Ok(id);
    }

    let prefix = token.to_lowercase();
    let mut matches = ids
        .iter()
        .filter(|id| id.to_string().starts_with(&prefix));
    match (matches.next(), matches.next()) {
        (Some(id), None) => Ok(*id),
        (Some(_), Some(_)) => bail!("'{}' matches more than one {}", token, kind),
        (None, _) => bail!("No {} matches '{}'", kind, token),
    }
}

fn render_contacts(contacts: &[Contact]) -> String {
    if contacts.is_empty() {
        return "No contacts".to_string();
    }
    contacts
        .iter()
        .map(|c| {
            format!(
                "{}  {:<20} {:<18} {:<10}{}",
                short_id(&c.id().to_string()),
                c.name,
                c.phone,
                c.relationship,
                if c.is_emergency { " [emergency]" } else { "" }
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_status(status: &SessionStatus) -> String {
    let episode = &status.episode;
    let sos = if episode.is_active {
        let names = episode.recipient_names();
        format!(
            "ACTIVE since {} ({} recipient(s): {})",
            episode
                .started_at
                .map(|t| t.format("%H:%M:%S").to_string())
                .unwrap_or_default(),
            names.len(),
            names.join(", ")
        )
    } else {
        "inactive".to_string()
    };
    let location = episode
        .location
        .map(|c| format!("{}, {}", c.latitude, c.longitude))
        .unwrap_or_else(|| "unknown".to_string());
    let hold = if status.gesture.is_holding {
        format!("holding {}%", status.gesture.progress)
    } else {
        "idle".to_string()
    };

    format!(
        "User:      {}\nSOS:       {}\nLocation:  {}\nHold:      {}\nContacts:  {} ({} emergency)\nAlerts:    {} active",
        status.user,
        sos,
        location,
        hold,
        status.contacts,
        status.emergency_contacts,
        status.active_alerts
    )
}
