//! Environment-driven configuration.
//!
//! # API pattern
//!
//! Configuration readers have two forms:
//! - `from_lookup(lookup)` — explicit variable source; used in tests
//! - `from_env()` — reads `std::env::var`, delegates to `from_lookup`
//!
//! Tests must NEVER call `from_env`; always inject a lookup.

use std::time::Duration;

use crate::error::ConfigError;

/// Destination table used when `DynamoDBTableName` is not set.
pub const DEFAULT_TABLE_NAME: &str = "WorkspacesPortal";

/// Region used when region discovery fails and no explicit list is set.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Import interval used when `SyncIntervalSeconds` is not set.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(300);

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Destination table name (`DynamoDBTableName`).
    pub table_name: String,
    /// Raw comma-separated region list (`REGIONLIST`). Split verbatim by
    /// the region resolver; `None` means auto-discover.
    pub region_list: Option<String>,
    /// Daemon import interval (`SyncIntervalSeconds`).
    pub sync_interval: Duration,
}

impl Config {
    /// Build a [`Config`] from an explicit variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let table_name =
            lookup("DynamoDBTableName").unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string());
        let region_list = lookup("REGIONLIST");

        let sync_interval = match lookup("SyncIntervalSeconds") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(ConfigError::InvalidInterval { value: raw }),
            },
            None => DEFAULT_SYNC_INTERVAL,
        };

        Ok(Self {
            table_name,
            region_list,
            sync_interval,
        })
    }

    /// `from_lookup` convenience wrapper over process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            region_list: None,
            sync_interval: DEFAULT_SYNC_INTERVAL,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + '_ {
        move |name| {
            pairs
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
        }
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = Config::from_lookup(|_| None).expect("config");
        assert_eq!(config.table_name, "WorkspacesPortal");
        assert_eq!(config.region_list, None);
        assert_eq!(config.sync_interval, Duration::from_secs(300));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let vars = [
            ("DynamoDBTableName", "StagingPortal"),
            ("REGIONLIST", "us-east-1,eu-west-1"),
            ("SyncIntervalSeconds", "60"),
        ];
        let config = Config::from_lookup(lookup_from(&vars)).expect("config");
        assert_eq!(config.table_name, "StagingPortal");
        assert_eq!(config.region_list.as_deref(), Some("us-east-1,eu-west-1"));
        assert_eq!(config.sync_interval, Duration::from_secs(60));
    }

    #[test]
    fn malformed_interval_is_rejected() {
        let vars = [("SyncIntervalSeconds", "soon")];
        let err = Config::from_lookup(lookup_from(&vars)).expect_err("must reject");
        assert!(err.to_string().contains("soon"));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let vars = [("SyncIntervalSeconds", "0")];
        assert!(Config::from_lookup(lookup_from(&vars)).is_err());
    }

    #[test]
    fn empty_region_list_is_kept_verbatim() {
        // An empty REGIONLIST is still an explicit list; the resolver
        // decides what to do with it, not the config layer.
        let vars = [("REGIONLIST", "")];
        let config = Config::from_lookup(lookup_from(&vars)).expect("config");
        assert_eq!(config.region_list.as_deref(), Some(""));
    }
}
