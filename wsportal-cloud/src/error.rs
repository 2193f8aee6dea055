//! Error types for wsportal-cloud.

use thiserror::Error;

/// All errors that can arise from remote provider calls.
///
/// The connectivity/API split mirrors how callers react: an unreachable
/// regional endpoint is expected in fleets that do not span every region
/// and is logged at a lower severity than a real API failure.
#[derive(Debug, Clone, Error)]
pub enum CloudError {
    /// The request never reached the service (dispatch or timeout failure).
    #[error("could not connect to {service} endpoint: {message}")]
    Connectivity {
        service: &'static str,
        message: String,
    },

    /// The service answered with an error, or the response was unusable.
    #[error("{service} API error: {message}")]
    Api {
        service: &'static str,
        message: String,
    },

    /// The service accepted the call but reported the request as failed.
    #[error("request rejected: {message}")]
    Rejected { message: String },

    /// A portal row is missing an attribute the caller requires.
    #[error("malformed portal row for {workspace_id}: missing {attribute}")]
    Malformed {
        workspace_id: String,
        attribute: &'static str,
    },
}

impl CloudError {
    /// True for transport-level failures (endpoint unreachable, timeout).
    pub fn is_connectivity(&self) -> bool {
        matches!(self, CloudError::Connectivity { .. })
    }
}
