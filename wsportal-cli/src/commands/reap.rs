//! `wsportal reap` — remove rows for workspaces that no longer exist.

use anyhow::{Context, Result};
use clap::Args;

use wsportal_cloud::{AwsCloud, DynamoTable};
use wsportal_core::Config;
use wsportal_sync::{reaper, ReapSummary, RowFate};

/// Arguments for `wsportal reap`.
#[derive(Args, Debug)]
pub struct ReapArgs {
    /// Report rows that would be removed without deleting anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl ReapArgs {
    pub fn run(self) -> Result<()> {
        let config = Config::from_env().context("invalid configuration")?;

        let summary = crate::block_on(async {
            let cloud = AwsCloud::connect().await;
            let table = DynamoTable::new(cloud.shared_config(), &config.table_name);
            reaper::run(&cloud, &table, self.dry_run)
                .await
                .context("reap failed")
        })?;

        print_summary(&summary, self.dry_run);
        Ok(())
    }
}

fn print_summary(summary: &ReapSummary, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    println!(
        "{prefix}✓ examined {} rows ({} removed, {} kept)",
        summary.examined(),
        summary.removed(),
        summary.kept(),
    );

    for fate in &summary.fates {
        match fate {
            RowFate::Removed { id } => println!("  ✗ {id}"),
            RowFate::WouldRemove { id } => println!("  ~ {id}"),
            RowFate::Skipped { id, error } => println!("  ⚠ {id}: {error}"),
            RowFate::Kept { .. } => {}
        }
    }
}
