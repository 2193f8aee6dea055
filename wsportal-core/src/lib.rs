//! Wsportal core library — domain types, environment configuration, errors.
//!
//! Public API surface:
//! - [`types`] — newtypes and domain structs for workspaces and portal rows
//! - [`config`] — environment-driven [`Config`]
//! - [`error`] — [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::ConfigError;
pub use types::{
    ConnectionStatus, DirectoryId, DirectoryRegistration, InventoryRecord, RegionName, Requester,
    WorkspaceAction, WorkspaceId, WorkspaceInstance,
};
