//! CLI output handling.
//!
//! Events from the session arrive on the runtime channel and are rendered here,
//! either as text on stderr or as one JSON object per line on stdout. Command
//! results (contact lists, status) are printed by `print_result`.

use std::io::{self, Write};

use anyhow::Result;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::contacts::ContactEvent;
use crate::emergency::EmergencyEvent;
use crate::gesture::HoldEvent;
use crate::runtime::RuntimeEvent;

/// Hold progress is only shown in text mode at this granularity.
const PROGRESS_REPORT_STEP: u8 = 20;

/// Render events until the runtime shuts down and the channel closes.
pub async fn run_event_loop(
    mut event_rx: mpsc::UnboundedReceiver<RuntimeEvent>,
    json_mode: bool,
) -> Result<()> {
    while let Some(event) = event_rx.recv().await {
        if json_mode {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", serde_json::to_string(&event)?)?;
            stdout.flush()?;
        } else if let Some(line) = render_event(&event) {
            eprintln!("{}", line);
        }
    }
    Ok(())
}

/// Print a command result: JSON in JSON mode, otherwise the text rendering.
pub fn print_result<T: Serialize>(
    json_mode: bool,
    value: &T,
    text: impl FnOnce() -> String,
) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if json_mode {
        writeln!(stdout, "{}", serde_json::to_string(value)?)?;
    } else {
        writeln!(stdout, "{}", text())?;
    }
    stdout.flush()?;
    Ok(())
}

/// One-line text rendering; `None` for events that are not worth a line.
pub fn render_event(event: &RuntimeEvent) -> Option<String> {
    match event {
        RuntimeEvent::Emergency(e) => Some(render_emergency(e)),
        RuntimeEvent::Contacts(e) => Some(render_contacts(e)),
        RuntimeEvent::Hold(e) => render_hold(e),
    }
}

fn render_emergency(event: &EmergencyEvent) -> String {
    match event {
        EmergencyEvent::Triggered {
            sender,
            started_at,
            recipients,
            ..
        } => {
            let notified = if recipients.is_empty() {
                "no emergency contacts to notify".to_string()
            } else {
                let names: Vec<&str> = recipients.iter().map(|r| r.name.as_str()).collect();
                format!("notifying {}", names.join(", "))
            };
            format!(
                "[sos] SOS ACTIVE for {} since {}; {}",
                sender,
                started_at.format("%H:%M:%S"),
                notified
            )
        }
        EmergencyEvent::Cancelled { duration_ms, .. } => format!(
            "[sos] SOS cancelled after {:.1}s",
            *duration_ms as f64 / 1000.0
        ),
        EmergencyEvent::LocationAttached {
            latitude,
            longitude,
            ..
        } => format!("[sos] Location attached: {}, {}", latitude, longitude),
        EmergencyEvent::LocationUnavailable { reason, .. } => {
            format!("[sos] Location unavailable: {}", reason)
        }
        EmergencyEvent::LocationUpdated {
            latitude,
            longitude,
        } => format!("[location] {}, {}", latitude, longitude),
    }
}

fn render_contacts(event: &ContactEvent) -> String {
    match event {
        ContactEvent::Added { contact } => format!(
            "[contacts] Added {} ({}) {}",
            contact.name,
            contact.relationship,
            short_id(&contact.id().to_string())
        ),
        ContactEvent::Removed { name, .. } => format!("[contacts] Removed {}", name),
        ContactEvent::EmergencyToggled { id, is_emergency } => {
            let state = if *is_emergency { "on" } else { "off" };
            format!(
                "[contacts] Emergency {} for {}",
                state,
                short_id(&id.to_string())
            )
        }
    }
}

fn render_hold(event: &HoldEvent) -> Option<String> {
    let line = match event {
        HoldEvent::Started => "[hold] Holding...".to_string(),
        HoldEvent::Progress { progress } => {
            if progress % PROGRESS_REPORT_STEP != 0 {
                return None;
            }
            format!("[hold] {}%", progress)
        }
        HoldEvent::Released { progress } => {
            format!("[hold] Released at {}%, nothing sent", progress)
        }
        HoldEvent::Completed { triggered: true } => "[hold] Confirmed".to_string(),
        HoldEvent::Completed { triggered: false } => {
            "[hold] Confirmed, SOS was already active".to_string()
        }
        HoldEvent::EpisodeCancelled => "[hold] Tap while active: cancelling".to_string(),
        HoldEvent::Aborted => "[hold] Aborted".to_string(),
    };
    Some(line)
}

/// First 8 characters of an id, enough to type back in.
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
