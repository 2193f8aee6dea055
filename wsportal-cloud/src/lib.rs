//! # wsportal-cloud
//!
//! Provider seams for everything the portal talks to remotely: the region
//! catalog, the per-region workspace fleet, and the portal table. AWS
//! implementations live in [`aws`] and [`table`]; in-memory doubles for the
//! rest of the workspace's tests live in [`mock`].

pub mod aws;
pub mod error;
pub mod mock;
pub mod provider;
pub mod table;

pub use aws::{AwsCloud, AwsFleet};
pub use error::CloudError;
pub use provider::{DesktopFleet, FleetProvider, InventoryTable, RegionCatalog};
pub use table::DynamoTable;
