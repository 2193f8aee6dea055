//! Per-region inventory import.
//!
//! One region is processed as a single linear pass: list every instance,
//! fetch the bulk connection metadata, then assemble and upsert one row per
//! instance. Failures never escape a region — a listing failure skips the
//! region, a write failure skips the instance — so one bad region cannot
//! starve the rest of the run.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use wsportal_cloud::{CloudError, DesktopFleet, FleetProvider, InventoryTable};
use wsportal_core::types::{InventoryRecord, RegionName, WorkspaceId, WorkspaceInstance};

use crate::regcode::RegCodeCache;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Outcome of one row upsert.
#[derive(Debug)]
pub enum WriteOutcome {
    /// Row was written.
    Written { id: WorkspaceId },
    /// `--dry-run` mode: the row *would* have been written.
    WouldWrite { id: WorkspaceId },
    /// The table rejected the write; the run continued.
    Failed { id: WorkspaceId, error: CloudError },
}

/// Outcome of one region's import.
#[derive(Debug)]
pub enum RegionOutcome {
    /// Instances were found and processed; one entry per instance.
    Synced { writes: Vec<WriteOutcome> },
    /// The region listed cleanly but holds no instances.
    Empty,
    /// The region could not be listed and was skipped entirely.
    Skipped { error: CloudError },
}

/// One region's entry in an [`ImportSummary`].
#[derive(Debug)]
pub struct RegionImport {
    pub region: RegionName,
    pub outcome: RegionOutcome,
}

impl RegionImport {
    pub fn written(&self) -> usize {
        match &self.outcome {
            RegionOutcome::Synced { writes } => writes
                .iter()
                .filter(|w| matches!(w, WriteOutcome::Written { .. } | WriteOutcome::WouldWrite { .. }))
                .count(),
            _ => 0,
        }
    }

    pub fn failed(&self) -> usize {
        match &self.outcome {
            RegionOutcome::Synced { writes } => writes
                .iter()
                .filter(|w| matches!(w, WriteOutcome::Failed { .. }))
                .count(),
            _ => 0,
        }
    }
}

/// Whole-run import summary. The run itself cannot fail; skipped regions
/// and failed writes are reported here and in the logs.
#[derive(Debug, Default)]
pub struct ImportSummary {
    pub regions: Vec<RegionImport>,
}

impl ImportSummary {
    pub fn written(&self) -> usize {
        self.regions.iter().map(RegionImport::written).sum()
    }

    pub fn failed(&self) -> usize {
        self.regions.iter().map(RegionImport::failed).sum()
    }

    pub fn skipped_regions(&self) -> usize {
        self.regions
            .iter()
            .filter(|r| matches!(r.outcome, RegionOutcome::Skipped { .. }))
            .count()
    }
}

// ---------------------------------------------------------------------------
// Record assembly
// ---------------------------------------------------------------------------

/// Assemble the portal row for one instance. The freshness timestamp is
/// captured here, at write time, not when the instance was listed.
fn build_record(
    instance: &WorkspaceInstance,
    registration_code: String,
    last_connected: Option<DateTime<Utc>>,
) -> InventoryRecord {
    InventoryRecord {
        workspace_id: instance.id.clone(),
        user_name: instance.user_name.clone(),
        region: instance.region.clone(),
        state: instance.state.clone(),
        last_touched: Utc::now(),
        running_mode: instance.running_mode.clone(),
        registration_code,
        computer_name: instance.computer_name.clone(),
        ip_address: instance.ip_address.clone(),
        last_connected,
    }
}

// ---------------------------------------------------------------------------
// import_region
// ---------------------------------------------------------------------------

/// Import one region: list instances, fetch connection metadata, upsert one
/// row per instance. Never returns an error; failures become
/// [`RegionOutcome::Skipped`] or per-instance [`WriteOutcome::Failed`].
pub async fn import_region(
    provider: &dyn FleetProvider,
    table: &dyn InventoryTable,
    regcodes: &mut RegCodeCache,
    region: &RegionName,
    dry_run: bool,
) -> RegionOutcome {
    tracing::info!("checking: {region}");

    let fleet = match provider.fleet(region).await {
        Ok(fleet) => fleet,
        Err(error) => {
            tracing::warn!("could not reach region {region}: {error}");
            return RegionOutcome::Skipped { error };
        }
    };

    let instances = match fleet.list_workspaces().await {
        Ok(instances) => instances,
        Err(error) if error.is_connectivity() => {
            tracing::warn!("could not connect to endpoint in region {region}");
            return RegionOutcome::Skipped { error };
        }
        Err(error) => {
            tracing::error!("failed to get workspaces list for region {region}: {error}");
            return RegionOutcome::Skipped { error };
        }
    };

    tracing::info!("found {} workspaces", instances.len());
    if instances.is_empty() {
        tracing::info!("  no workspaces instances found in region {region}");
        return RegionOutcome::Empty;
    }

    // One bulk call for the whole region rather than one per instance.
    let last_connected = match connection_lookup(fleet.as_ref()).await {
        Ok(lookup) => lookup,
        Err(error) => {
            tracing::error!("failed to get connection status for region {region}: {error}");
            return RegionOutcome::Skipped { error };
        }
    };

    let mut writes = Vec::with_capacity(instances.len());
    for instance in &instances {
        tracing::info!("  workspace: {}", instance.id);

        let registration_code = regcodes.lookup(fleet.as_ref(), &instance.directory_id).await;
        let record = build_record(
            instance,
            registration_code,
            last_connected.get(&instance.id).copied(),
        );

        let outcome = if dry_run {
            tracing::info!("  [dry-run] would write {}", record.workspace_id);
            WriteOutcome::WouldWrite {
                id: record.workspace_id.clone(),
            }
        } else {
            match table.put(&record).await {
                Ok(()) => WriteOutcome::Written {
                    id: record.workspace_id.clone(),
                },
                Err(error) => {
                    tracing::error!("table error for {}: {error}", record.workspace_id);
                    WriteOutcome::Failed {
                        id: record.workspace_id.clone(),
                        error,
                    }
                }
            }
        };
        writes.push(outcome);
    }

    RegionOutcome::Synced { writes }
}

/// Build the instance-id → last-connection lookup from the bulk status
/// call. Entries without a usable timestamp are simply absent.
async fn connection_lookup(
    fleet: &dyn DesktopFleet,
) -> Result<HashMap<WorkspaceId, DateTime<Utc>>, CloudError> {
    let statuses = fleet.connection_statuses().await?;
    tracing::info!("found {} workspaces_connection_status", statuses.len());
    Ok(statuses
        .into_iter()
        .filter_map(|status| {
            status
                .last_connection
                .map(|at| (status.workspace_id, at))
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
