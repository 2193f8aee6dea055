//! Domain types for the workspaces portal.
//!
//! Lifecycle state and running mode are kept as provider-defined strings;
//! the provider's state set is open-ended and rows must round-trip values
//! we have never seen. All types are serializable via serde.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed cloud region identifier (e.g. `us-east-1`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionName(pub String);

impl fmt::Display for RegionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RegionName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RegionName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A strongly-typed workspace instance identifier (e.g. `ws-9xb0aaqvk`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkspaceId(pub String);

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for WorkspaceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for WorkspaceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A strongly-typed directory identifier (e.g. `d-90675ffd0c`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectoryId(pub String);

impl fmt::Display for DirectoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for DirectoryId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DirectoryId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// A lifecycle action a user can request for a workspace instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkspaceAction {
    Start,
    Stop,
    Reboot,
    Rebuild,
    Decommission,
}

impl WorkspaceAction {
    /// All actions, in the order they are shown to users.
    pub fn all() -> &'static [WorkspaceAction] {
        &[
            WorkspaceAction::Start,
            WorkspaceAction::Stop,
            WorkspaceAction::Reboot,
            WorkspaceAction::Rebuild,
            WorkspaceAction::Decommission,
        ]
    }

    /// The transitional state a row is moved to once the action is accepted.
    pub fn transitional_state(&self) -> &'static str {
        match self {
            WorkspaceAction::Start => "STARTING",
            WorkspaceAction::Stop => "STOPPING",
            WorkspaceAction::Reboot => "REBOOTING",
            WorkspaceAction::Rebuild => "REBUILDING",
            // Termination reports through the provider as a stop.
            WorkspaceAction::Decommission => "STOPPING",
        }
    }
}

impl fmt::Display for WorkspaceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkspaceAction::Start => write!(f, "Start"),
            WorkspaceAction::Stop => write!(f, "Stop"),
            WorkspaceAction::Reboot => write!(f, "Reboot"),
            WorkspaceAction::Rebuild => write!(f, "Rebuild"),
            WorkspaceAction::Decommission => write!(f, "Decommission"),
        }
    }
}

impl FromStr for WorkspaceAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "start" => Ok(WorkspaceAction::Start),
            "stop" => Ok(WorkspaceAction::Stop),
            "reboot" => Ok(WorkspaceAction::Reboot),
            "rebuild" => Ok(WorkspaceAction::Rebuild),
            "decommission" => Ok(WorkspaceAction::Decommission),
            other => Err(format!(
                "unknown action '{other}'; expected: Start, Stop, Reboot, Rebuild, Decommission"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// One virtual desktop instance as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceInstance {
    pub id: WorkspaceId,
    pub user_name: String,
    pub region: RegionName,
    /// Provider lifecycle state, verbatim (AVAILABLE, STOPPED, ERROR, ...).
    pub state: String,
    /// Provider running mode, verbatim (AUTO_STOP, ALWAYS_ON, ...).
    pub running_mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub computer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    pub directory_id: DirectoryId,
}

/// Per-instance connection metadata from the bulk status call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub workspace_id: WorkspaceId,
    /// Absent when the provider has no record, or when the reported
    /// timestamp did not convert to an epoch instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_connection: Option<DateTime<Utc>>,
}

/// One directory with its client registration code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRegistration {
    pub id: DirectoryId,
    pub registration_code: String,
}

/// The denormalized portal row persisted per workspace instance.
///
/// Keyed by [`WorkspaceId`]; each write fully replaces the prior row
/// (last-writer-wins upsert, no versioning).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub workspace_id: WorkspaceId,
    pub user_name: String,
    pub region: RegionName,
    pub state: String,
    /// Wall-clock time the row was written.
    pub last_touched: DateTime<Utc>,
    pub running_mode: String,
    pub registration_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub computer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_connected: Option<DateTime<Utc>>,
}

/// Identity on whose behalf a workspace action is performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub user_name: String,
    pub is_admin: bool,
}

impl Requester {
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            user_name: name.into(),
            is_admin: false,
        }
    }

    pub fn admin(name: impl Into<String>) -> Self {
        Self {
            user_name: name.into(),
            is_admin: true,
        }
    }

    /// Ownership check used by action authorization: case-insensitive
    /// compare against the row's recorded owner.
    pub fn owns(&self, owner: &str) -> bool {
        self.user_name.eq_ignore_ascii_case(owner)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn newtype_display() {
        assert_eq!(RegionName::from("eu-west-1").to_string(), "eu-west-1");
        assert_eq!(WorkspaceId::from("ws-abc123").to_string(), "ws-abc123");
        assert_eq!(DirectoryId::from("d-90675ffd0c").to_string(), "d-90675ffd0c");
    }

    #[test]
    fn newtype_equality() {
        let a = WorkspaceId::from("ws-x");
        let b = WorkspaceId::from(String::from("ws-x"));
        assert_eq!(a, b);
    }

    #[rstest]
    #[case("start", WorkspaceAction::Start)]
    #[case("Stop", WorkspaceAction::Stop)]
    #[case("reboot", WorkspaceAction::Reboot)]
    #[case("rebuild", WorkspaceAction::Rebuild)]
    #[case("DECOMMISSION", WorkspaceAction::Decommission)]
    fn action_parses_case_insensitively(#[case] input: &str, #[case] expected: WorkspaceAction) {
        assert_eq!(input.parse::<WorkspaceAction>().unwrap(), expected);
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!("frobnicate".parse::<WorkspaceAction>().is_err());
    }

    #[test]
    fn action_display_roundtrips_through_from_str() {
        for action in WorkspaceAction::all() {
            let parsed: WorkspaceAction = action.to_string().parse().expect("parse");
            assert_eq!(parsed, *action);
        }
    }

    #[test]
    fn decommission_transitions_to_stopping() {
        assert_eq!(
            WorkspaceAction::Decommission.transitional_state(),
            "STOPPING"
        );
        assert_eq!(WorkspaceAction::Reboot.transitional_state(), "REBOOTING");
    }

    #[test]
    fn requester_ownership_is_case_insensitive() {
        let requester = Requester::user("JSmith");
        assert!(requester.owns("jsmith"));
        assert!(!requester.owns("mjones"));
        assert!(!requester.is_admin);
        assert!(Requester::admin("ops").is_admin);
    }

    #[test]
    fn record_serde_omits_absent_optionals() {
        let record = InventoryRecord {
            workspace_id: WorkspaceId::from("ws-1"),
            user_name: "jsmith".to_string(),
            region: RegionName::from("us-east-1"),
            state: "AVAILABLE".to_string(),
            last_touched: Utc::now(),
            running_mode: "AUTO_STOP".to_string(),
            registration_code: "ABC-DEF".to_string(),
            computer_name: None,
            ip_address: None,
            last_connected: None,
        };
        let json = serde_json::to_string(&record).expect("serialize");
        assert!(!json.contains("computer_name"));
        assert!(!json.contains("last_connected"));

        let back: InventoryRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, record);
    }
}
