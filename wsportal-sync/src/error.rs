//! Error types for wsportal-sync.

use thiserror::Error;

use wsportal_cloud::CloudError;
use wsportal_core::types::{WorkspaceAction, WorkspaceId};

/// Errors from routines that are allowed to fail as a whole (the reaper's
/// initial table scan). The import pipeline never returns an error; every
/// failure there is converted to a per-region or per-instance skip.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A remote call failed outside any skip-and-continue boundary.
    #[error("cloud error: {0}")]
    Cloud(#[from] CloudError),
}

/// Refusals and failures from the workspace action handler.
#[derive(Debug, Error)]
pub enum ActionError {
    /// No portal row for the requested workspace.
    #[error("workspace {0} not found in the portal table")]
    NotFound(WorkspaceId),

    /// The action is reserved for administrators.
    #[error("administrator privileges are required to {action} a workspace")]
    AdminRequired { action: WorkspaceAction },

    /// The requester neither owns the workspace nor is an administrator.
    #[error("{user} is not authorised to {action} workspace {workspace} owned by {owner}")]
    NotAuthorised {
        user: String,
        action: WorkspaceAction,
        workspace: WorkspaceId,
        owner: String,
    },

    /// The workspace's recorded state does not allow the action.
    #[error("cannot {action} a workspace in {state} state")]
    InvalidState {
        action: WorkspaceAction,
        state: String,
    },

    /// The provider or the table failed underneath the handler.
    #[error(transparent)]
    Cloud(#[from] CloudError),
}
