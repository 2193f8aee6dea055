//! `wsportal action` — dispatch a lifecycle action on one workspace.

use anyhow::{Context, Result};
use clap::Args;

use wsportal_cloud::{AwsCloud, DynamoTable};
use wsportal_core::types::{Requester, WorkspaceAction, WorkspaceId};
use wsportal_core::Config;
use wsportal_sync::actions;

/// Arguments for `wsportal action`.
#[derive(Args, Debug)]
pub struct ActionArgs {
    /// Workspace instance id (e.g. ws-9xb0aaqvk).
    pub workspace: String,

    /// Action to perform: Start, Stop, Reboot, Rebuild or Decommission.
    #[arg(long)]
    pub action: WorkspaceAction,

    /// User requesting the action; must own the workspace unless --admin.
    #[arg(long)]
    pub user: String,

    /// Act with administrator privileges.
    #[arg(long)]
    pub admin: bool,
}

impl ActionArgs {
    pub fn run(self) -> Result<()> {
        let config = Config::from_env().context("invalid configuration")?;
        let requester = if self.admin {
            Requester::admin(&self.user)
        } else {
            Requester::user(&self.user)
        };
        let workspace_id = WorkspaceId::from(self.workspace.as_str());

        let outcome = crate::block_on(async {
            let cloud = AwsCloud::connect().await;
            let table = DynamoTable::new(cloud.shared_config(), &config.table_name);
            actions::perform(&cloud, &table, &requester, &workspace_id, self.action)
                .await
                .with_context(|| format!("{} refused for '{workspace_id}'", self.action))
        })?;

        println!(
            "✓ {} in progress for {} (state → {})",
            outcome.action, outcome.workspace_id, outcome.next_state,
        );
        if !outcome.state_updated {
            println!("⚠ portal row not updated; the next import will correct it");
        }
        Ok(())
    }
}
