//! CLI module for headless Raksha sessions.
//!
//! Builds the same `SessionContext` a GUI shell would, so the SOS flow can be
//! scripted and exercised from a terminal.
//!
//! # Architecture
//!
//! Components emit through the `RakshaRuntime` abstraction. In the CLI the
//! runtime is a channel drained by the output loop.
//!
//! ```text
//! +-------------------+     +-------------+     +---------------+
//! | SessionContext    | --> | CliRuntime  | --> | output.rs     |
//! | (shared logic)    |     | (emit())    |     | (text/JSON)   |
//! +-------------------+     +-------------+     +---------------+
//! ```
//!
//! # REPL Mode
//!
//! When no command is provided via `-e` or `-f`, the CLI enters
//! interactive REPL mode. See `repl.rs` for the command language.

mod args;
mod bootstrap;
mod output;
mod repl;
mod runner;

pub use args::Args;
pub use bootstrap::{initialize, CliContext};
pub use output::run_event_loop;
pub use repl::{run_repl, ReplCommand};
pub use runner::{execute_batch, execute_once};
