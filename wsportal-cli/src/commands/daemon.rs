//! `wsportal daemon` — interval-import daemon lifecycle.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use wsportal_cloud::{AwsCloud, DynamoTable};
use wsportal_core::Config;
use wsportal_daemon::{
    paths::socket_path, request_status, request_stop, request_sync, DaemonError, PortalDeps,
};

#[derive(Subcommand, Debug)]
pub enum DaemonCommand {
    /// Run the daemon in the foreground (scheduler + socket server).
    Start,
    /// Request graceful daemon shutdown over the Unix socket.
    Stop,
    /// Query daemon runtime status over the Unix socket.
    Status,
    /// Trigger an immediate import and wait for its report.
    Sync(DaemonSyncArgs),
}

#[derive(Args, Debug)]
pub struct DaemonSyncArgs {
    /// Import a single region instead of resolving the region list.
    #[arg(long)]
    pub region: Option<String>,
}

pub fn run(command: DaemonCommand) -> Result<()> {
    let home = dirs::home_dir().context("could not determine home directory")?;

    match command {
        DaemonCommand::Start => {
            let config = Config::from_env().context("invalid configuration")?;
            let deps = crate::block_on(async {
                let cloud = Arc::new(AwsCloud::connect().await);
                let table = Arc::new(DynamoTable::new(
                    cloud.shared_config(),
                    &config.table_name,
                ));
                Ok(PortalDeps {
                    catalog: cloud.clone(),
                    provider: cloud,
                    table,
                })
            })?;
            wsportal_daemon::start_blocking(&home, deps, config)
                .context("daemon exited with error")?;
        }
        DaemonCommand::Stop => match request_stop(&home) {
            Ok(()) => println!("daemon stop requested"),
            Err(DaemonError::DaemonNotRunning { .. }) => {
                println!("daemon is not running");
            }
            Err(err) => return Err(err).context("failed to stop daemon"),
        },
        DaemonCommand::Status => match request_status(&home) {
            Ok(status) => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&status)
                        .context("failed to render daemon status JSON")?
                );
            }
            Err(DaemonError::DaemonNotRunning { .. }) => {
                let payload = serde_json::json!({
                    "running": false,
                    "socket": socket_path(&home).display().to_string(),
                });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&payload)
                        .context("failed to render daemon status JSON")?
                );
            }
            Err(err) => return Err(err).context("failed to query daemon status"),
        },
        DaemonCommand::Sync(args) => {
            let report = request_sync(&home, args.region).context("daemon import failed")?;
            println!(
                "{}",
                serde_json::to_string_pretty(&report)
                    .context("failed to render import report JSON")?
            );
        }
    }

    Ok(())
}
