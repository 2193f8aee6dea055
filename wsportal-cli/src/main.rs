//! Wsportal — WorkSpaces inventory portal CLI.
//!
//! # Usage
//!
//! ```text
//! wsportal import [REGION] [--dry-run]
//! wsportal list [--region <name>] [--json]
//! wsportal reap [--dry-run]
//! wsportal action <WORKSPACE_ID> --action <Start|Stop|Reboot|Rebuild|Decommission> --user <name> [--admin]
//! wsportal daemon start|stop|status|sync
//! ```

mod commands;

use std::future::Future;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{
    action::ActionArgs, daemon::DaemonCommand, import::ImportArgs, list::ListArgs, reap::ReapArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "wsportal",
    version,
    about = "Sync and manage the WorkSpaces inventory portal table",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import workspace inventory into the portal table.
    Import(ImportArgs),

    /// Show the portal table contents.
    List(ListArgs),

    /// Remove portal rows whose workspace no longer exists.
    Reap(ReapArgs),

    /// Perform a lifecycle action on one workspace.
    Action(ActionArgs),

    /// Manage the interval-import daemon.
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
}

// ---------------------------------------------------------------------------
// Runtime helper
// ---------------------------------------------------------------------------

/// Run one async command to completion on a current-thread runtime; every
/// remote call inside is awaited sequentially.
pub(crate) fn block_on<T>(future: impl Future<Output = Result<T>>) -> Result<T> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build async runtime")?;
    runtime.block_on(future)
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Import(args) => args.run(),
        Commands::List(args) => args.run(),
        Commands::Reap(args) => args.run(),
        Commands::Action(args) => args.run(),
        Commands::Daemon { command } => commands::daemon::run(command),
    }
}
