//! Stale-row reaper.
//!
//! The import never deletes: instances that disappear from a region leave
//! their row behind indefinitely. The reaper is the separate, explicitly
//! invoked routine that removes those rows — it scans the table, probes
//! each row's workspace in its recorded region, and deletes rows whose
//! instance no longer exists.

use wsportal_cloud::{CloudError, FleetProvider, InventoryTable};
use wsportal_core::types::WorkspaceId;

use crate::error::SyncError;

/// What happened to one scanned row.
#[derive(Debug)]
pub enum RowFate {
    /// The instance still exists; row kept.
    Kept { id: WorkspaceId },
    /// The instance is gone; row deleted.
    Removed { id: WorkspaceId },
    /// `--dry-run` mode: the row *would* have been deleted.
    WouldRemove { id: WorkspaceId },
    /// The probe or delete failed; row left in place for the next run.
    Skipped { id: WorkspaceId, error: CloudError },
}

/// Summary of one reaper run.
#[derive(Debug, Default)]
pub struct ReapSummary {
    pub fates: Vec<RowFate>,
}

impl ReapSummary {
    pub fn examined(&self) -> usize {
        self.fates.len()
    }

    pub fn removed(&self) -> usize {
        self.fates
            .iter()
            .filter(|f| matches!(f, RowFate::Removed { .. } | RowFate::WouldRemove { .. }))
            .count()
    }

    pub fn kept(&self) -> usize {
        self.fates
            .iter()
            .filter(|f| matches!(f, RowFate::Kept { .. }))
            .count()
    }
}

/// Scan the table and remove rows whose instance no longer exists.
///
/// The initial scan failing is an error; everything after it degrades to a
/// per-row skip.
pub async fn run(
    provider: &dyn FleetProvider,
    table: &dyn InventoryTable,
    dry_run: bool,
) -> Result<ReapSummary, SyncError> {
    let rows = table.scan().await?;
    tracing::info!("reaper examining {} portal rows", rows.len());

    let mut summary = ReapSummary::default();
    for row in rows {
        tracing::info!("looking for {} in {}", row.workspace_id, row.region);

        let fleet = match provider.fleet(&row.region).await {
            Ok(fleet) => fleet,
            Err(error) => {
                tracing::warn!("could not reach region {}: {error}", row.region);
                summary.fates.push(RowFate::Skipped {
                    id: row.workspace_id,
                    error,
                });
                continue;
            }
        };

        let fate = match fleet.find_workspace(&row.workspace_id).await {
            Ok(Some(_)) => {
                tracing::info!("  instance alive - continuing");
                RowFate::Kept {
                    id: row.workspace_id,
                }
            }
            Ok(None) => {
                if let Some(computer_name) = &row.computer_name {
                    // TODO: remove the computer object from the directory as
                    // well (needs directory admin credentials plumbed in).
                    tracing::info!("  {computer_name} left behind in the directory");
                }
                if dry_run {
                    tracing::info!("  [dry-run] would remove {}", row.workspace_id);
                    RowFate::WouldRemove {
                        id: row.workspace_id,
                    }
                } else {
                    match table.delete(&row.workspace_id).await {
                        Ok(()) => {
                            tracing::info!("  instance removed");
                            RowFate::Removed {
                                id: row.workspace_id,
                            }
                        }
                        Err(error) => {
                            tracing::error!("table error: {error}");
                            RowFate::Skipped {
                                id: row.workspace_id,
                                error,
                            }
                        }
                    }
                }
            }
            Err(error) => {
                tracing::error!("lookup failed for {}: {error}", row.workspace_id);
                RowFate::Skipped {
                    id: row.workspace_id,
                    error,
                }
            }
        };
        summary.fates.push(fate);
    }

    Ok(summary)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wsportal_cloud::mock::{instance, MemoryTable, MockCloud, MockFleet};
    use wsportal_core::types::{InventoryRecord, RegionName};

    fn row(id: &str, region: &str) -> InventoryRecord {
        InventoryRecord {
            workspace_id: WorkspaceId::from(id),
            user_name: "jsmith".to_string(),
            region: RegionName::from(region),
            state: "AVAILABLE".to_string(),
            last_touched: Utc::now(),
            running_mode: "AUTO_STOP".to_string(),
            registration_code: "ABC-DEF".to_string(),
            computer_name: None,
            ip_address: None,
            last_connected: None,
        }
    }

    #[tokio::test]
    async fn removes_rows_for_missing_instances_only() {
        let cloud = MockCloud::new().with_fleet(
            MockFleet::new("us-east-1")
                .with_workspaces(vec![instance("ws-alive", "jsmith", "us-east-1", "d-1")]),
        );
        let table =
            MemoryTable::with_rows([row("ws-alive", "us-east-1"), row("ws-gone", "us-east-1")]);

        let summary = run(&cloud, &table, false).await.expect("reap");

        assert_eq!(summary.examined(), 2);
        assert_eq!(summary.removed(), 1);
        assert_eq!(summary.kept(), 1);
        assert!(table.row(&WorkspaceId::from("ws-alive")).is_some());
        assert!(table.row(&WorkspaceId::from("ws-gone")).is_none());
    }

    #[tokio::test]
    async fn dry_run_deletes_nothing() {
        let cloud = MockCloud::new().with_fleet(MockFleet::new("us-east-1"));
        let table = MemoryTable::with_rows([row("ws-gone", "us-east-1")]);

        let summary = run(&cloud, &table, true).await.expect("reap");

        assert_eq!(summary.removed(), 1, "dry-run still reports the removal");
        assert!(
            table.row(&WorkspaceId::from("ws-gone")).is_some(),
            "dry-run must not delete"
        );
    }

    #[tokio::test]
    async fn unreachable_region_skips_the_row() {
        // No fleet registered for eu-west-1: the provider refuses it.
        let cloud = MockCloud::new().with_fleet(MockFleet::new("us-east-1"));
        let table =
            MemoryTable::with_rows([row("ws-far", "eu-west-1"), row("ws-gone", "us-east-1")]);

        let summary = run(&cloud, &table, false).await.expect("reap");

        assert!(summary
            .fates
            .iter()
            .any(|f| matches!(f, RowFate::Skipped { id, .. } if id.0 == "ws-far")));
        assert!(
            table.row(&WorkspaceId::from("ws-far")).is_some(),
            "unreachable rows stay for the next run"
        );
        assert!(table.row(&WorkspaceId::from("ws-gone")).is_none());
    }

    #[tokio::test]
    async fn probe_failure_keeps_the_row() {
        let cloud = MockCloud::new().with_fleet(MockFleet::new("us-east-1").with_find_error(
            CloudError::Api {
                service: "mock-fleet",
                message: "throttled".to_string(),
            },
        ));
        let table = MemoryTable::with_rows([row("ws-1", "us-east-1")]);

        let summary = run(&cloud, &table, false).await.expect("reap");

        assert_eq!(summary.removed(), 0);
        assert!(table.row(&WorkspaceId::from("ws-1")).is_some());
    }
}
