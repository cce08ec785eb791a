//! Raksha CLI - Headless driver for the personal-safety core
//!
//! # Usage
//!
//! ```bash
//! # One command
//! ./target/debug/raksha-cli --user Asha -e "status"
//!
//! # A scripted drill with a fixed position, JSON events on stdout
//! ./target/debug/raksha-cli --location 28.6139,77.2090 --json -f drill.txt | jq .
//!
//! # Interactive REPL mode (when no -e or -f provided)
//! ./target/debug/raksha-cli
//! ```
//!
//! This binary requires the `cli` feature flag (on by default).

use anyhow::Result;
use clap::Parser;

use raksha_lib::cli::{execute_batch, execute_once, initialize, run_repl, Args};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut ctx = initialize(&args).await?;

    let result = if let Some(ref command) = args.execute {
        execute_once(&mut ctx, command).await
    } else if let Some(ref file) = args.file {
        execute_batch(&mut ctx, file).await
    } else {
        run_repl(&mut ctx).await
    };

    // Logout cancels any active SOS and flushes pending output
    ctx.shutdown().await?;

    result
}
