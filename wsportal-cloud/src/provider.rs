//! Trait seams in front of every remote collaborator.
//!
//! The import pipeline, reaper, and action handler are written against
//! these traits only; the AWS clients in [`crate::aws`] and
//! [`crate::table`] are one implementation, the doubles in [`crate::mock`]
//! another.

use async_trait::async_trait;

use wsportal_core::types::{
    ConnectionStatus, DirectoryRegistration, InventoryRecord, RegionName, WorkspaceAction,
    WorkspaceId, WorkspaceInstance,
};

use crate::error::CloudError;

/// Source of the set of regions available to this account.
#[async_trait]
pub trait RegionCatalog: Send + Sync {
    /// All enabled regions, in provider order.
    async fn enabled_regions(&self) -> Result<Vec<RegionName>, CloudError>;
}

/// Hands out a per-region [`DesktopFleet`] handle.
#[async_trait]
pub trait FleetProvider: Send + Sync {
    async fn fleet(&self, region: &RegionName) -> Result<Box<dyn DesktopFleet>, CloudError>;
}

/// The virtual-desktop service for one region.
#[async_trait]
pub trait DesktopFleet: Send + Sync {
    fn region(&self) -> &RegionName;

    /// Every workspace instance in the region, all pages merged.
    async fn list_workspaces(&self) -> Result<Vec<WorkspaceInstance>, CloudError>;

    /// Connection metadata for the whole region in one bulk, paginated call.
    async fn connection_statuses(&self) -> Result<Vec<ConnectionStatus>, CloudError>;

    /// Every directory in the region with its registration code.
    async fn list_directories(&self) -> Result<Vec<DirectoryRegistration>, CloudError>;

    /// Look up a single workspace by id; `None` when it no longer exists.
    async fn find_workspace(
        &self,
        id: &WorkspaceId,
    ) -> Result<Option<WorkspaceInstance>, CloudError>;

    /// Dispatch a lifecycle action. A provider-side failed request surfaces
    /// as [`CloudError::Rejected`].
    async fn submit_action(
        &self,
        id: &WorkspaceId,
        action: WorkspaceAction,
    ) -> Result<(), CloudError>;
}

/// The key-value portal table, keyed by workspace id.
#[async_trait]
pub trait InventoryTable: Send + Sync {
    /// Upsert one row; fully replaces any prior row for the key.
    async fn put(&self, record: &InventoryRecord) -> Result<(), CloudError>;

    /// Fetch one row by key.
    async fn get(&self, id: &WorkspaceId) -> Result<Option<InventoryRecord>, CloudError>;

    /// Overwrite only the lifecycle state of an existing row.
    async fn set_state(&self, id: &WorkspaceId, state: &str) -> Result<(), CloudError>;

    /// Remove one row by key; absent keys are not an error.
    async fn delete(&self, id: &WorkspaceId) -> Result<(), CloudError>;

    /// Every decodable row in the table, all pages merged. Rows that fail
    /// to decode are skipped with a log, not returned as errors.
    async fn scan(&self) -> Result<Vec<InventoryRecord>, CloudError>;
}
