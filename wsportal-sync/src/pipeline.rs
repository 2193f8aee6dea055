//! Shared import pipeline entrypoint used by CLI and daemon.

use wsportal_cloud::{FleetProvider, InventoryTable, RegionCatalog};
use wsportal_core::config::Config;
use wsportal_core::types::RegionName;

use crate::import::{import_region, ImportSummary, RegionImport};
use crate::regcode::RegCodeCache;
use crate::regions;

/// Scope for an import pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportScope {
    /// Import every resolved region.
    All,
    /// Import a single named region, bypassing resolution.
    Region(RegionName),
}

/// Run the import pipeline for a scope.
///
/// This is the canonical import entrypoint for both `wsportal import` and
/// the daemon's interval processor. It cannot fail: regions are processed
/// strictly in order and every failure degrades to a skip recorded in the
/// summary.
pub async fn run(
    catalog: &dyn RegionCatalog,
    provider: &dyn FleetProvider,
    table: &dyn InventoryTable,
    config: &Config,
    scope: ImportScope,
    dry_run: bool,
) -> ImportSummary {
    let regions = match scope {
        ImportScope::All => regions::resolve(catalog, config).await,
        ImportScope::Region(region) => vec![region],
    };

    // One registration-code cache for the whole run, shared across regions.
    let mut regcodes = RegCodeCache::new();
    let mut summary = ImportSummary::default();

    for region in regions {
        let outcome = import_region(provider, table, &mut regcodes, &region, dry_run).await;
        summary.regions.push(RegionImport { region, outcome });
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use wsportal_cloud::mock::{instance, MemoryTable, MockCatalog, MockCloud, MockFleet};

    #[tokio::test]
    async fn run_covers_every_resolved_region() {
        let catalog = MockCatalog::with_regions(["us-east-1", "eu-west-1"]);
        let cloud = MockCloud::new()
            .with_fleet(
                MockFleet::new("us-east-1")
                    .with_workspaces(vec![instance("ws-1", "jsmith", "us-east-1", "d-1")]),
            )
            .with_fleet(MockFleet::new("eu-west-1"));
        let table = MemoryTable::new();

        let summary = run(
            &catalog,
            &cloud,
            &table,
            &Config::default(),
            ImportScope::All,
            false,
        )
        .await;

        assert_eq!(summary.regions.len(), 2);
        assert_eq!(summary.written(), 1);
        assert_eq!(summary.skipped_regions(), 0);
    }

    #[tokio::test]
    async fn single_region_scope_bypasses_resolution() {
        let catalog = MockCatalog::failing();
        let cloud = MockCloud::new().with_fleet(
            MockFleet::new("eu-west-1")
                .with_workspaces(vec![instance("ws-9", "mjones", "eu-west-1", "d-2")]),
        );
        let table = MemoryTable::new();

        let summary = run(
            &catalog,
            &cloud,
            &table,
            &Config::default(),
            ImportScope::Region(RegionName::from("eu-west-1")),
            false,
        )
        .await;

        assert_eq!(summary.regions.len(), 1);
        assert_eq!(summary.written(), 1);
    }
}
