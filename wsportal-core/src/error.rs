//! Error types for wsportal-core.

use thiserror::Error;

/// All errors that can arise while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `SyncIntervalSeconds` was present but not a positive integer.
    #[error("invalid SyncIntervalSeconds value '{value}': expected a positive integer")]
    InvalidInterval { value: String },
}
