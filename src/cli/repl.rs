//! Command parsing and the interactive REPL for raksha-cli.
//!
//! The same command language is used for `-e`, `-f` and the REPL. Arguments are
//! whitespace separated; wrap an argument in double quotes to keep spaces, e.g.
//! `add "Anita Rao" "+91 98765 43210" Mother`.

use std::io::{self, BufRead, Write};

use anyhow::Result;

use super::bootstrap::CliContext;
use super::runner::run_command;

pub const HELP: &str = "\
Contacts:
  add <name> <phone> [relationship]   add a trusted contact
  remove <id>                         remove a contact (id or unique prefix)
  toggle <id>                         flip a contact's emergency flag
  contacts                            list contacts
SOS:
  hold <ms>                           press, hold for <ms>, release
  press | release                     raw press / release
  sos                                 trigger without holding
  cancel                              stand the SOS down
Location:
  locate                              look the position up now
  location <lat> <lng>                report a position
  share                               map link for the last position
Settings (saved to the settings file, applied on next start):
  settings                            show all settings
  settings get <key>                  read one value, e.g. hold.tick_ms
  settings set <key> <value>          write one value (JSON, else text)
  settings reset | settings reload    restore defaults / re-read the file
Other:
  status | alerts | resolve <id> | help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum SettingsCommand {
    Show,
    Get(String),
    Set { key: String, value: String },
    Reset,
    Reload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Add {
        name: String,
        phone: String,
        relationship: Option<String>,
    },
    Remove(String),
    Toggle(String),
    Contacts,
    Hold(u64),
    Press,
    Release,
    Sos,
    Cancel,
    Locate,
    Location { latitude: f64, longitude: f64 },
    Share,
    Status,
    Alerts,
    Resolve(String),
    Settings(SettingsCommand),
    Help,
    Quit,
    /// Blank line or comment
    Empty,
    /// Known command, bad arguments
    Usage(&'static str),
    Unknown(String),
}

impl ReplCommand {
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return ReplCommand::Empty;
        }

        let Some(tokens) = tokenize(trimmed) else {
            return ReplCommand::Usage("unterminated quote");
        };
        let Some((head, rest)) = tokens.split_first() else {
            return ReplCommand::Empty;
        };

        match (head.to_lowercase().as_str(), rest) {
            ("add", [name, phone]) => ReplCommand::Add {
                name: name.clone(),
                phone: phone.clone(),
                relationship: None,
            },
            ("add", [name, phone, relationship @ ..]) => ReplCommand::Add {
                name: name.clone(),
                phone: phone.clone(),
                relationship: Some(relationship.join(" ")),
            },
            ("add", _) => ReplCommand::Usage("add <name> <phone> [relationship]"),
            ("remove" | "rm", [id]) => ReplCommand::Remove(id.clone()),
            ("remove" | "rm", _) => ReplCommand::Usage("remove <id>"),
            ("toggle", [id]) => ReplCommand::Toggle(id.clone()),
            ("toggle", _) => ReplCommand::Usage("toggle <id>"),
            ("contacts" | "ls", []) => ReplCommand::Contacts,
            ("hold", [ms]) => match ms.parse() {
                Ok(ms) => ReplCommand::Hold(ms),
                Err(_) => ReplCommand::Usage("hold <milliseconds>"),
            },
            ("hold", _) => ReplCommand::Usage("hold <milliseconds>"),
            ("press", []) => ReplCommand::Press,
            ("release", []) => ReplCommand::Release,
            ("sos" | "trigger", []) => ReplCommand::Sos,
            ("cancel", []) => ReplCommand::Cancel,
            ("locate", []) => ReplCommand::Locate,
            ("location", [lat, lng]) => match (lat.parse(), lng.parse()) {
                (Ok(latitude), Ok(longitude)) => ReplCommand::Location {
                    latitude,
                    longitude,
                },
                _ => ReplCommand::Usage("location <lat> <lng>"),
            },
            ("location", _) => ReplCommand::Usage("location <lat> <lng>"),
            ("share", []) => ReplCommand::Share,
            ("status", []) => ReplCommand::Status,
            ("alerts", []) => ReplCommand::Alerts,
            ("resolve", [id]) => ReplCommand::Resolve(id.clone()),
            ("resolve", _) => ReplCommand::Usage("resolve <id>"),
            ("settings", []) => ReplCommand::Settings(SettingsCommand::Show),
            ("settings", [sub, args @ ..]) => match (sub.to_lowercase().as_str(), args) {
                ("get", [key]) => ReplCommand::Settings(SettingsCommand::Get(key.clone())),
                ("set", [key, value @ ..]) if !value.is_empty() => {
                    ReplCommand::Settings(SettingsCommand::Set {
                        key: key.clone(),
                        value: value.join(" "),
                    })
                }
                ("reset", []) => ReplCommand::Settings(SettingsCommand::Reset),
                ("reload", []) => ReplCommand::Settings(SettingsCommand::Reload),
                _ => ReplCommand::Usage("settings [get <key> | set <key> <value> | reset | reload]"),
            },
            ("help" | "?", _) => ReplCommand::Help,
            ("quit" | "exit" | "q" | "/quit" | "/exit" | "/q", []) => ReplCommand::Quit,
            (
                "contacts" | "ls" | "press" | "release" | "sos" | "trigger" | "cancel" | "locate"
                | "share" | "status" | "alerts",
                _,
            ) => ReplCommand::Usage("this command takes no arguments"),
            _ => ReplCommand::Unknown(head.clone()),
        }
    }
}

/// Split on whitespace, keeping double-quoted runs together.
/// `None` if a quote is left open.
fn tokenize(input: &str) -> Option<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in input.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if in_quotes {
        return None;
    }
    if has_token {
        tokens.push(current);
    }
    Some(tokens)
}

/// Run an interactive REPL session until `quit` or EOF (Ctrl+D).
pub async fn run_repl(ctx: &mut CliContext) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let interactive = ctx.session.runtime().is_interactive();

    if interactive {
        eprintln!("raksha-cli interactive mode ({})", ctx.session.user().name);
        eprintln!("Type help for commands, quit to exit\n");
    }

    loop {
        if interactive {
            print!("> ");
            stdout.flush()?;
        }

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        match ReplCommand::parse(&input) {
            ReplCommand::Empty => continue,
            ReplCommand::Quit => break,
            command => {
                if let Err(e) = run_command(ctx, command).await {
                    eprintln!("Error: {:#}", e);
                }
            }
        }
    }

    if interactive {
        eprintln!("Goodbye!");
    }
    Ok(())
}
