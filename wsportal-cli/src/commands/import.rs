//! `wsportal import` — run the inventory import once.

use anyhow::{Context, Result};
use clap::Args;

use wsportal_cloud::{AwsCloud, DynamoTable};
use wsportal_core::types::RegionName;
use wsportal_core::Config;
use wsportal_sync::{pipeline, ImportScope, ImportSummary, RegionOutcome};

/// Arguments for `wsportal import`.
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Import a single region instead of resolving the region list.
    pub region: Option<String>,

    /// Assemble records and report them without writing to the table.
    #[arg(long)]
    pub dry_run: bool,
}

impl ImportArgs {
    pub fn run(self) -> Result<()> {
        let config = Config::from_env().context("invalid configuration")?;

        let summary = crate::block_on(async {
            let cloud = AwsCloud::connect().await;
            let table = DynamoTable::new(cloud.shared_config(), &config.table_name);
            let scope = match &self.region {
                Some(region) => ImportScope::Region(RegionName::from(region.as_str())),
                None => ImportScope::All,
            };
            Ok(pipeline::run(&cloud, &cloud, &table, &config, scope, self.dry_run).await)
        })?;

        print_summary(&summary, self.dry_run);
        Ok(())
    }
}

fn print_summary(summary: &ImportSummary, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };

    for region in &summary.regions {
        match &region.outcome {
            RegionOutcome::Synced { .. } => {
                println!(
                    "{prefix}✓ '{}' imported ({} written, {} failed)",
                    region.region,
                    region.written(),
                    region.failed(),
                );
            }
            RegionOutcome::Empty => {
                println!("{prefix}· '{}' — no instances", region.region);
            }
            RegionOutcome::Skipped { error } => {
                println!("{prefix}⚠ '{}' skipped: {error}", region.region);
            }
        }
    }

    println!(
        "{prefix}{} written, {} failed, {} regions skipped",
        summary.written(),
        summary.failed(),
        summary.skipped_regions(),
    );
}
