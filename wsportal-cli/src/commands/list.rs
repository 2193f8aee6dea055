//! `wsportal list` — render the portal table.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use wsportal_cloud::{AwsCloud, DynamoTable, InventoryTable};
use wsportal_core::types::InventoryRecord;
use wsportal_core::Config;

/// Arguments for `wsportal list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Show only one region's rows.
    #[arg(long)]
    pub region: Option<String>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct ListRow {
    #[tabled(rename = "workspace")]
    workspace: String,
    #[tabled(rename = "user")]
    user: String,
    #[tabled(rename = "region")]
    region: String,
    #[tabled(rename = "state")]
    state: String,
    #[tabled(rename = "mode")]
    mode: String,
    #[tabled(rename = "ip")]
    ip: String,
    #[tabled(rename = "last connected")]
    last_connected: String,
}

impl ListArgs {
    pub fn run(self) -> Result<()> {
        let config = Config::from_env().context("invalid configuration")?;

        let mut rows = crate::block_on(async {
            let cloud = AwsCloud::connect().await;
            let table = DynamoTable::new(cloud.shared_config(), &config.table_name);
            table
                .scan()
                .await
                .context("failed to scan the portal table")
        })?;

        if let Some(region) = &self.region {
            rows.retain(|row| row.region.0 == *region);
        }
        rows.sort_by(|a, b| a.workspace_id.0.cmp(&b.workspace_id.0));

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&rows).context("failed to serialize rows")?
            );
            return Ok(());
        }

        print_table(&config.table_name, rows);
        Ok(())
    }
}

fn print_table(table_name: &str, rows: Vec<InventoryRecord>) {
    let stale = rows.iter().filter(|r| r.state == "ERROR").count();
    println!(
        "{} | {} instances | {}",
        table_name.bold(),
        rows.len(),
        if stale > 0 {
            format!("{stale} in ERROR").red().to_string()
        } else {
            "all healthy".green().to_string()
        },
    );

    if rows.is_empty() {
        println!("Portal table is empty. Run `wsportal import` first.");
        return;
    }

    let table_rows: Vec<ListRow> = rows
        .into_iter()
        .map(|row| ListRow {
            workspace: row.workspace_id.0,
            user: row.user_name,
            region: row.region.0,
            state: row.state,
            mode: row.running_mode,
            ip: row.ip_address.unwrap_or_else(|| "-".to_string()),
            last_connected: connection_age(row.last_connected),
        })
        .collect();

    let mut table = Table::new(table_rows);
    table.with(Style::rounded());
    println!("{table}");
}

/// Human-readable age of the last user connection.
fn connection_age(at: Option<DateTime<Utc>>) -> String {
    let Some(at) = at else {
        return "never".to_string();
    };
    let elapsed = Utc::now().signed_duration_since(at);
    if elapsed.num_seconds() < 0 {
        return at.to_rfc3339();
    }
    if elapsed.num_days() > 0 {
        format!("{}d ago", elapsed.num_days())
    } else if elapsed.num_hours() > 0 {
        format!("{}h ago", elapsed.num_hours())
    } else {
        format!("{}m ago", elapsed.num_minutes())
    }
}
