//! In-memory doubles for every provider seam.
//!
//! Used by unit and integration tests across the workspace; nothing here
//! touches the network. Call counters let tests assert how often a seam
//! was exercised (e.g. the one-directory-listing-per-run cache property).

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use wsportal_core::types::{
    ConnectionStatus, DirectoryId, DirectoryRegistration, InventoryRecord, RegionName,
    WorkspaceAction, WorkspaceId, WorkspaceInstance,
};

use crate::error::CloudError;
use crate::provider::{DesktopFleet, FleetProvider, InventoryTable, RegionCatalog};

/// A workspace instance with the fields tests rarely care about defaulted.
pub fn instance(id: &str, user: &str, region: &str, directory: &str) -> WorkspaceInstance {
    WorkspaceInstance {
        id: WorkspaceId::from(id),
        user_name: user.to_string(),
        region: RegionName::from(region),
        state: "AVAILABLE".to_string(),
        running_mode: "AUTO_STOP".to_string(),
        computer_name: None,
        ip_address: None,
        directory_id: DirectoryId::from(directory),
    }
}

// ---------------------------------------------------------------------------
// Region catalog
// ---------------------------------------------------------------------------

/// Catalog returning a fixed region list, or a fixed error.
#[derive(Default)]
pub struct MockCatalog {
    regions: Vec<RegionName>,
    error: Option<CloudError>,
}

impl MockCatalog {
    pub fn with_regions<'a>(regions: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            regions: regions.into_iter().map(RegionName::from).collect(),
            error: None,
        }
    }

    pub fn failing() -> Self {
        Self {
            regions: Vec::new(),
            error: Some(CloudError::Connectivity {
                service: "mock-catalog",
                message: "discovery unavailable".to_string(),
            }),
        }
    }
}

#[async_trait]
impl RegionCatalog for MockCatalog {
    async fn enabled_regions(&self) -> Result<Vec<RegionName>, CloudError> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(self.regions.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Desktop fleet
// ---------------------------------------------------------------------------

/// One region's fleet with scripted data, scripted failures, and counters.
#[derive(Default)]
pub struct MockFleet {
    region: RegionName,
    workspaces: Vec<WorkspaceInstance>,
    statuses: Vec<ConnectionStatus>,
    directories: Vec<DirectoryRegistration>,
    list_error: Option<CloudError>,
    find_error: Option<CloudError>,
    submit_error: Option<CloudError>,
    /// Consumed by the first `list_directories` call only.
    directory_error_once: Mutex<Option<CloudError>>,
    list_calls: AtomicUsize,
    status_calls: AtomicUsize,
    directory_calls: AtomicUsize,
    submitted: Mutex<Vec<(WorkspaceId, WorkspaceAction)>>,
}

impl MockFleet {
    pub fn new(region: &str) -> Self {
        Self {
            region: RegionName::from(region),
            ..Default::default()
        }
    }

    pub fn with_workspaces(mut self, workspaces: Vec<WorkspaceInstance>) -> Self {
        self.workspaces = workspaces;
        self
    }

    pub fn with_statuses(mut self, statuses: Vec<ConnectionStatus>) -> Self {
        self.statuses = statuses;
        self
    }

    pub fn with_directories(mut self, directories: Vec<DirectoryRegistration>) -> Self {
        self.directories = directories;
        self
    }

    pub fn with_list_error(mut self, error: CloudError) -> Self {
        self.list_error = Some(error);
        self
    }

    pub fn with_find_error(mut self, error: CloudError) -> Self {
        self.find_error = Some(error);
        self
    }

    pub fn with_submit_error(mut self, error: CloudError) -> Self {
        self.submit_error = Some(error);
        self
    }

    pub fn with_directory_error_once(self, error: CloudError) -> Self {
        *self
            .directory_error_once
            .lock()
            .expect("directory error lock") = Some(error);
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn directory_calls(&self) -> usize {
        self.directory_calls.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<(WorkspaceId, WorkspaceAction)> {
        self.submitted.lock().expect("submitted lock").clone()
    }
}

#[async_trait]
impl DesktopFleet for MockFleet {
    fn region(&self) -> &RegionName {
        &self.region
    }

    async fn list_workspaces(&self) -> Result<Vec<WorkspaceInstance>, CloudError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        match &self.list_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.workspaces.clone()),
        }
    }

    async fn connection_statuses(&self) -> Result<Vec<ConnectionStatus>, CloudError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.statuses.clone())
    }

    async fn list_directories(&self) -> Result<Vec<DirectoryRegistration>, CloudError> {
        self.directory_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self
            .directory_error_once
            .lock()
            .expect("directory error lock")
            .take()
        {
            return Err(err);
        }
        Ok(self.directories.clone())
    }

    async fn find_workspace(
        &self,
        id: &WorkspaceId,
    ) -> Result<Option<WorkspaceInstance>, CloudError> {
        if let Some(err) = &self.find_error {
            return Err(err.clone());
        }
        Ok(self.workspaces.iter().find(|ws| &ws.id == id).cloned())
    }

    async fn submit_action(
        &self,
        id: &WorkspaceId,
        action: WorkspaceAction,
    ) -> Result<(), CloudError> {
        if let Some(err) = &self.submit_error {
            return Err(err.clone());
        }
        self.submitted
            .lock()
            .expect("submitted lock")
            .push((id.clone(), action));
        Ok(())
    }
}

/// Shared handle so tests can keep the fleet and read its counters after
/// handing a boxed copy to the code under test.
pub struct SharedFleet(pub Arc<MockFleet>);

#[async_trait]
impl DesktopFleet for SharedFleet {
    fn region(&self) -> &RegionName {
        self.0.region()
    }

    async fn list_workspaces(&self) -> Result<Vec<WorkspaceInstance>, CloudError> {
        self.0.list_workspaces().await
    }

    async fn connection_statuses(&self) -> Result<Vec<ConnectionStatus>, CloudError> {
        self.0.connection_statuses().await
    }

    async fn list_directories(&self) -> Result<Vec<DirectoryRegistration>, CloudError> {
        self.0.list_directories().await
    }

    async fn find_workspace(
        &self,
        id: &WorkspaceId,
    ) -> Result<Option<WorkspaceInstance>, CloudError> {
        self.0.find_workspace(id).await
    }

    async fn submit_action(
        &self,
        id: &WorkspaceId,
        action: WorkspaceAction,
    ) -> Result<(), CloudError> {
        self.0.submit_action(id, action).await
    }
}

/// Fleet provider over a fixed set of per-region mock fleets.
#[derive(Default)]
pub struct MockCloud {
    fleets: HashMap<RegionName, Arc<MockFleet>>,
}

impl MockCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fleet(mut self, fleet: MockFleet) -> Self {
        self.fleets
            .insert(fleet.region.clone(), Arc::new(fleet));
        self
    }

    /// The shared fleet for `region`, for post-run counter assertions.
    pub fn fleet_handle(&self, region: &str) -> Arc<MockFleet> {
        self.fleets
            .get(&RegionName::from(region))
            .cloned()
            .expect("no mock fleet registered for region")
    }
}

#[async_trait]
impl FleetProvider for MockCloud {
    async fn fleet(&self, region: &RegionName) -> Result<Box<dyn DesktopFleet>, CloudError> {
        match self.fleets.get(region) {
            Some(fleet) => Ok(Box::new(SharedFleet(Arc::clone(fleet)))),
            None => Err(CloudError::Connectivity {
                service: "mock-fleet",
                message: format!("no endpoint for region {region}"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Portal table
// ---------------------------------------------------------------------------

/// In-memory [`InventoryTable`] with scripted per-key write failures.
#[derive(Default)]
pub struct MemoryTable {
    rows: Mutex<BTreeMap<String, InventoryRecord>>,
    put_failures: Mutex<HashSet<String>>,
    puts: AtomicUsize,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: impl IntoIterator<Item = InventoryRecord>) -> Self {
        let table = Self::default();
        {
            let mut guard = table.rows.lock().expect("rows lock");
            for record in rows {
                guard.insert(record.workspace_id.0.clone(), record);
            }
        }
        table
    }

    /// Reject future puts for `id` with an API error.
    pub fn fail_puts_for(&self, id: &WorkspaceId) {
        self.put_failures
            .lock()
            .expect("failures lock")
            .insert(id.0.clone());
    }

    /// Snapshot of all rows, ordered by key.
    pub fn rows(&self) -> Vec<InventoryRecord> {
        self.rows
            .lock()
            .expect("rows lock")
            .values()
            .cloned()
            .collect()
    }

    pub fn row(&self, id: &WorkspaceId) -> Option<InventoryRecord> {
        self.rows.lock().expect("rows lock").get(&id.0).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().expect("rows lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total successful `put` calls across the table's lifetime.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InventoryTable for MemoryTable {
    async fn put(&self, record: &InventoryRecord) -> Result<(), CloudError> {
        if self
            .put_failures
            .lock()
            .expect("failures lock")
            .contains(&record.workspace_id.0)
        {
            return Err(CloudError::Api {
                service: "mock-table",
                message: format!("write rejected for {}", record.workspace_id),
            });
        }
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.rows
            .lock()
            .expect("rows lock")
            .insert(record.workspace_id.0.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, id: &WorkspaceId) -> Result<Option<InventoryRecord>, CloudError> {
        Ok(self.row(id))
    }

    async fn set_state(&self, id: &WorkspaceId, state: &str) -> Result<(), CloudError> {
        if let Some(record) = self.rows.lock().expect("rows lock").get_mut(&id.0) {
            record.state = state.to_string();
        }
        Ok(())
    }

    async fn delete(&self, id: &WorkspaceId) -> Result<(), CloudError> {
        self.rows.lock().expect("rows lock").remove(&id.0);
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<InventoryRecord>, CloudError> {
        Ok(self.rows())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
