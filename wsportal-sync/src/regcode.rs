//! Registration-code cache.
//!
//! One instance lives for one run and is shared across regions. A miss
//! triggers a single list-all-directories call and caches every code from
//! the response, so the common case of many workspaces in one directory
//! costs one call total.

use std::collections::HashMap;

use wsportal_cloud::DesktopFleet;
use wsportal_core::types::DirectoryId;

/// Run-scoped directory-id → registration-code cache.
#[derive(Debug, Default)]
pub struct RegCodeCache {
    codes: HashMap<DirectoryId, String>,
}

impl RegCodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// The registration code for `directory`, or `""` when unavailable.
    ///
    /// On a miss the fleet's full directory list is cached; a listing
    /// failure is logged, returns `""`, and leaves the cache untouched so
    /// the next instance retries.
    pub async fn lookup(&mut self, fleet: &dyn DesktopFleet, directory: &DirectoryId) -> String {
        if let Some(code) = self.codes.get(directory) {
            return code.clone();
        }

        match fleet.list_directories().await {
            Ok(directories) => {
                for dir in directories {
                    self.codes.insert(dir.id, dir.registration_code);
                }
            }
            Err(err) => {
                tracing::error!("did not get list of directories: {err}");
                return String::new();
            }
        }

        self.codes.get(directory).cloned().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
