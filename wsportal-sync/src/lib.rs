//! # wsportal-sync
//!
//! The portal's routines: the per-region inventory import (the scheduled
//! core of the system), the stale-row reaper, and user-requested lifecycle
//! actions.
//!
//! Call [`pipeline::run`] to import all resolved regions, or
//! [`import::import_region`] for a single region.

pub mod actions;
pub mod error;
pub mod import;
pub mod pipeline;
pub mod reaper;
pub mod regcode;
pub mod regions;

pub use actions::ActionOutcome;
pub use error::{ActionError, SyncError};
pub use import::{ImportSummary, RegionImport, RegionOutcome, WriteOutcome};
pub use pipeline::ImportScope;
pub use reaper::{ReapSummary, RowFate};
pub use regcode::RegCodeCache;
