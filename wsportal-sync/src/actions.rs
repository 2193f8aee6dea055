//! User-requested workspace lifecycle actions.
//!
//! The portal row is the source of truth for authorization and state
//! validation: ownership and current state are checked against the table,
//! not the live provider, so a stale row can refuse an action until the
//! next import refreshes it. On a successful dispatch the row's state is
//! moved to the action's transitional state.

use wsportal_cloud::{FleetProvider, InventoryTable};
use wsportal_core::types::{Requester, WorkspaceAction, WorkspaceId};

use crate::error::ActionError;

/// Result of a successfully dispatched action.
#[derive(Debug)]
pub struct ActionOutcome {
    pub workspace_id: WorkspaceId,
    pub action: WorkspaceAction,
    /// The transitional state the row was moved to.
    pub next_state: &'static str,
    /// False when the dispatch succeeded but the row update did not; the
    /// next import corrects the row either way.
    pub state_updated: bool,
}

/// Authorization rules: administrators may do anything; decommissioning is
/// administrator-only; everything else requires owning the workspace.
fn authorize(
    requester: &Requester,
    owner: &str,
    workspace: &WorkspaceId,
    action: WorkspaceAction,
) -> Result<(), ActionError> {
    if requester.is_admin {
        return Ok(());
    }
    if action == WorkspaceAction::Decommission {
        return Err(ActionError::AdminRequired { action });
    }
    if !requester.owns(owner) {
        return Err(ActionError::NotAuthorised {
            user: requester.user_name.clone(),
            action,
            workspace: workspace.clone(),
            owner: owner.to_string(),
        });
    }
    Ok(())
}

/// State table for each action, against the row's recorded state.
fn validate_state(action: WorkspaceAction, state: &str) -> Result<(), ActionError> {
    let allowed = match action {
        WorkspaceAction::Start => state == "STOPPED",
        WorkspaceAction::Stop => {
            matches!(state, "AVAILABLE" | "IMPAIRED" | "UNHEALTHY" | "ERROR")
        }
        WorkspaceAction::Reboot => matches!(state, "AVAILABLE" | "IMPAIRED" | "INOPERABLE"),
        WorkspaceAction::Rebuild => matches!(state, "AVAILABLE" | "ERROR"),
        WorkspaceAction::Decommission => state != "SUSPENDED",
    };
    if allowed {
        Ok(())
    } else {
        Err(ActionError::InvalidState {
            action,
            state: state.to_string(),
        })
    }
}

/// Perform one lifecycle action on behalf of `requester`.
pub async fn perform(
    provider: &dyn FleetProvider,
    table: &dyn InventoryTable,
    requester: &Requester,
    workspace_id: &WorkspaceId,
    action: WorkspaceAction,
) -> Result<ActionOutcome, ActionError> {
    let record = table
        .get(workspace_id)
        .await?
        .ok_or_else(|| ActionError::NotFound(workspace_id.clone()))?;

    authorize(requester, &record.user_name, workspace_id, action)?;
    validate_state(action, &record.state)?;

    let fleet = provider.fleet(&record.region).await?;
    fleet.submit_action(workspace_id, action).await?;

    let next_state = action.transitional_state();
    let state_updated = match table.set_state(workspace_id, next_state).await {
        Ok(()) => true,
        Err(err) => {
            tracing::error!("could not update portal row for {workspace_id}: {err}");
            false
        }
    };

    tracing::info!("{action} in progress for {workspace_id}");
    Ok(ActionOutcome {
        workspace_id: workspace_id.clone(),
        action,
        next_state,
        state_updated,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wsportal_cloud::mock::{instance, MemoryTable, MockCloud, MockFleet};
    use wsportal_cloud::CloudError;
    use wsportal_core::types::{InventoryRecord, RegionName};

    fn row(id: &str, owner: &str, state: &str) -> InventoryRecord {
        InventoryRecord {
            workspace_id: WorkspaceId::from(id),
            user_name: owner.to_string(),
            region: RegionName::from("us-east-1"),
            state: state.to_string(),
            last_touched: Utc::now(),
            running_mode: "AUTO_STOP".to_string(),
            registration_code: "ABC-DEF".to_string(),
            computer_name: None,
            ip_address: None,
            last_connected: None,
        }
    }

    fn cloud() -> MockCloud {
        MockCloud::new().with_fleet(
            MockFleet::new("us-east-1")
                .with_workspaces(vec![instance("ws-1", "jsmith", "us-east-1", "d-1")]),
        )
    }

    #[tokio::test]
    async fn owner_can_stop_an_available_workspace() {
        let cloud = cloud();
        let table = MemoryTable::with_rows([row("ws-1", "jsmith", "AVAILABLE")]);
        let requester = Requester::user("jsmith");

        let outcome = perform(
            &cloud,
            &table,
            &requester,
            &WorkspaceId::from("ws-1"),
            WorkspaceAction::Stop,
        )
        .await
        .expect("stop");

        assert_eq!(outcome.next_state, "STOPPING");
        assert!(outcome.state_updated);
        let updated = table.row(&WorkspaceId::from("ws-1")).expect("row");
        assert_eq!(updated.state, "STOPPING");
        assert_eq!(
            cloud.fleet_handle("us-east-1").submitted(),
            vec![(WorkspaceId::from("ws-1"), WorkspaceAction::Stop)]
        );
    }

    #[tokio::test]
    async fn ownership_compare_ignores_case() {
        let cloud = cloud();
        let table = MemoryTable::with_rows([row("ws-1", "JSmith", "STOPPED")]);
        let requester = Requester::user("jsmith");

        perform(
            &cloud,
            &table,
            &requester,
            &WorkspaceId::from("ws-1"),
            WorkspaceAction::Start,
        )
        .await
        .expect("case-insensitive owner must be allowed");
    }

    #[tokio::test]
    async fn non_owner_is_refused() {
        let cloud = cloud();
        let table = MemoryTable::with_rows([row("ws-1", "jsmith", "AVAILABLE")]);
        let requester = Requester::user("intruder");

        let err = perform(
            &cloud,
            &table,
            &requester,
            &WorkspaceId::from("ws-1"),
            WorkspaceAction::Stop,
        )
        .await
        .expect_err("must refuse");

        assert!(matches!(err, ActionError::NotAuthorised { .. }));
        assert!(
            cloud.fleet_handle("us-east-1").submitted().is_empty(),
            "refused actions must not reach the provider"
        );
    }

    #[tokio::test]
    async fn admin_may_act_on_other_users_workspaces() {
        let cloud = cloud();
        let table = MemoryTable::with_rows([row("ws-1", "jsmith", "AVAILABLE")]);
        let requester = Requester::admin("ops");

        perform(
            &cloud,
            &table,
            &requester,
            &WorkspaceId::from("ws-1"),
            WorkspaceAction::Reboot,
        )
        .await
        .expect("admin reboot");
    }

    #[tokio::test]
    async fn decommission_requires_admin_even_for_the_owner() {
        let cloud = cloud();
        let table = MemoryTable::with_rows([row("ws-1", "jsmith", "AVAILABLE")]);
        let requester = Requester::user("jsmith");

        let err = perform(
            &cloud,
            &table,
            &requester,
            &WorkspaceId::from("ws-1"),
            WorkspaceAction::Decommission,
        )
        .await
        .expect_err("must refuse");

        assert!(matches!(err, ActionError::AdminRequired { .. }));
    }

    #[tokio::test]
    async fn missing_row_is_not_found() {
        let cloud = cloud();
        let table = MemoryTable::new();

        let err = perform(
            &cloud,
            &table,
            &Requester::admin("ops"),
            &WorkspaceId::from("ws-absent"),
            WorkspaceAction::Stop,
        )
        .await
        .expect_err("must refuse");

        assert!(matches!(err, ActionError::NotFound(_)));
    }

    #[tokio::test]
    async fn rejected_dispatch_leaves_the_row_alone() {
        let cloud = MockCloud::new().with_fleet(
            MockFleet::new("us-east-1").with_submit_error(CloudError::Rejected {
                message: "workspace is busy".to_string(),
            }),
        );
        let table = MemoryTable::with_rows([row("ws-1", "jsmith", "AVAILABLE")]);

        let err = perform(
            &cloud,
            &table,
            &Requester::user("jsmith"),
            &WorkspaceId::from("ws-1"),
            WorkspaceAction::Stop,
        )
        .await
        .expect_err("must surface the rejection");

        assert!(matches!(err, ActionError::Cloud(CloudError::Rejected { .. })));
        let unchanged = table.row(&WorkspaceId::from("ws-1")).expect("row");
        assert_eq!(unchanged.state, "AVAILABLE");
    }

    // State table, straight from the rules the portal has always enforced.
    mod state_rules {
        use super::*;

        fn ok(action: WorkspaceAction, state: &str) {
            validate_state(action, state).expect("state must be allowed");
        }

        fn refused(action: WorkspaceAction, state: &str) {
            let err = validate_state(action, state).expect_err("state must be refused");
            assert!(matches!(err, ActionError::InvalidState { .. }));
        }

        #[test]
        fn start_only_from_stopped() {
            ok(WorkspaceAction::Start, "STOPPED");
            refused(WorkspaceAction::Start, "AVAILABLE");
            refused(WorkspaceAction::Start, "STARTING");
        }

        #[test]
        fn stop_from_running_or_broken_states() {
            for state in ["AVAILABLE", "IMPAIRED", "UNHEALTHY", "ERROR"] {
                ok(WorkspaceAction::Stop, state);
            }
            refused(WorkspaceAction::Stop, "STOPPED");
        }

        #[test]
        fn reboot_states() {
            for state in ["AVAILABLE", "IMPAIRED", "INOPERABLE"] {
                ok(WorkspaceAction::Reboot, state);
            }
            refused(WorkspaceAction::Reboot, "STOPPED");
        }

        #[test]
        fn rebuild_states() {
            ok(WorkspaceAction::Rebuild, "AVAILABLE");
            ok(WorkspaceAction::Rebuild, "ERROR");
            refused(WorkspaceAction::Rebuild, "IMPAIRED");
        }

        #[test]
        fn decommission_refused_only_when_suspended() {
            ok(WorkspaceAction::Decommission, "AVAILABLE");
            ok(WorkspaceAction::Decommission, "ERROR");
            ok(WorkspaceAction::Decommission, "STOPPED");
            refused(WorkspaceAction::Decommission, "SUSPENDED");
        }
    }
}
