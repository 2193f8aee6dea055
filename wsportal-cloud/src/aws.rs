//! AWS implementations of the provider seams.
//!
//! One shared SDK config is loaded at connect time; the EC2 client answers
//! region discovery and a WorkSpaces client is re-scoped per region on
//! demand. Every SDK error is folded into [`CloudError`] with the
//! dispatch/timeout kinds classified as connectivity failures.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_workspaces::config::Region;
use aws_sdk_workspaces::types::{
    FailedWorkspaceChangeRequest, RebootRequest, RebuildRequest, StartRequest, StopRequest,
    TerminateRequest, Workspace,
};
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_types::error::display::DisplayErrorContext;
use chrono::{DateTime, Utc};

use wsportal_core::types::{
    ConnectionStatus, DirectoryId, DirectoryRegistration, RegionName, WorkspaceAction, WorkspaceId,
    WorkspaceInstance,
};

use crate::error::CloudError;
use crate::provider::{DesktopFleet, FleetProvider, RegionCatalog};

/// Page size suggested for the paginated workspace listing.
const DESCRIBE_PAGE_SIZE: i32 = 25;

const EC2: &str = "EC2";
const WORKSPACES: &str = "WorkSpaces";

// ---------------------------------------------------------------------------
// Error classification
// ---------------------------------------------------------------------------

/// Fold an operation-specific [`SdkError`] into [`CloudError`], keeping the
/// full error chain in the message.
pub(crate) fn classify<E, R>(service: &'static str, err: SdkError<E, R>) -> CloudError
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let message = DisplayErrorContext(&err).to_string();
    if matches!(
        err,
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_)
    ) {
        CloudError::Connectivity { service, message }
    } else {
        CloudError::Api { service, message }
    }
}

/// Convert a provider epoch timestamp to UTC. Out-of-range values yield
/// `None` and the field is omitted downstream.
fn epoch_to_utc(secs: i64, nanos: u32) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, nanos)
}

// ---------------------------------------------------------------------------
// AwsCloud — account-level handle
// ---------------------------------------------------------------------------

/// Account-level AWS handle: shared credentials/config plus the EC2 client
/// used for region discovery.
pub struct AwsCloud {
    shared: SdkConfig,
    ec2: aws_sdk_ec2::Client,
}

impl AwsCloud {
    /// Load credentials and shared configuration from the environment.
    pub async fn connect() -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest()).load().await;
        let ec2 = aws_sdk_ec2::Client::new(&shared);
        Self { shared, ec2 }
    }

    /// The shared SDK config, for scoping further clients (e.g. the table).
    pub fn shared_config(&self) -> &SdkConfig {
        &self.shared
    }
}

#[async_trait]
impl RegionCatalog for AwsCloud {
    async fn enabled_regions(&self) -> Result<Vec<RegionName>, CloudError> {
        let resp = self
            .ec2
            .describe_regions()
            .send()
            .await
            .map_err(|err| classify(EC2, err))?;
        Ok(resp
            .regions()
            .iter()
            .filter_map(|region| region.region_name().map(RegionName::from))
            .collect())
    }
}

#[async_trait]
impl FleetProvider for AwsCloud {
    async fn fleet(&self, region: &RegionName) -> Result<Box<dyn DesktopFleet>, CloudError> {
        Ok(Box::new(AwsFleet::scoped(&self.shared, region.clone())))
    }
}

// ---------------------------------------------------------------------------
// AwsFleet — one region's WorkSpaces service
// ---------------------------------------------------------------------------

/// WorkSpaces client scoped to a single region.
pub struct AwsFleet {
    client: aws_sdk_workspaces::Client,
    region: RegionName,
}

impl AwsFleet {
    /// Re-scope the shared config to `region` and build a client for it.
    pub fn scoped(shared: &SdkConfig, region: RegionName) -> Self {
        let conf = aws_sdk_workspaces::config::Builder::from(shared)
            .region(Region::new(region.0.clone()))
            .build();
        Self {
            client: aws_sdk_workspaces::Client::from_conf(conf),
            region,
        }
    }

    fn instance_from_api(&self, ws: &Workspace) -> WorkspaceInstance {
        WorkspaceInstance {
            id: WorkspaceId::from(ws.workspace_id().unwrap_or_default()),
            user_name: ws.user_name().unwrap_or_default().to_string(),
            region: self.region.clone(),
            state: ws
                .state()
                .map(|state| state.as_str().to_string())
                .unwrap_or_default(),
            running_mode: ws
                .workspace_properties()
                .and_then(|props| props.running_mode())
                .map(|mode| mode.as_str().to_string())
                .unwrap_or_default(),
            computer_name: ws.computer_name().map(str::to_string),
            ip_address: ws.ip_address().map(str::to_string),
            directory_id: DirectoryId::from(ws.directory_id().unwrap_or_default()),
        }
    }
}

fn first_failure(failed: &[FailedWorkspaceChangeRequest]) -> Option<String> {
    failed.first().map(|failure| {
        failure
            .error_message()
            .unwrap_or("request failed with no message")
            .to_string()
    })
}

fn build_err(err: impl std::fmt::Display) -> CloudError {
    CloudError::Api {
        service: WORKSPACES,
        message: err.to_string(),
    }
}

#[async_trait]
impl DesktopFleet for AwsFleet {
    fn region(&self) -> &RegionName {
        &self.region
    }

    async fn list_workspaces(&self) -> Result<Vec<WorkspaceInstance>, CloudError> {
        let mut pages = self
            .client
            .describe_workspaces()
            .into_paginator()
            .page_size(DESCRIBE_PAGE_SIZE)
            .send();

        let mut instances = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|err| classify(WORKSPACES, err))?;
            instances.extend(page.workspaces().iter().map(|ws| self.instance_from_api(ws)));
        }
        tracing::debug!(
            "listed {} workspaces in {}",
            instances.len(),
            self.region
        );
        Ok(instances)
    }

    async fn connection_statuses(&self) -> Result<Vec<ConnectionStatus>, CloudError> {
        let mut statuses = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut req = self.client.describe_workspaces_connection_status();
            if let Some(token) = &next_token {
                req = req.next_token(token);
            }
            let resp = req.send().await.map_err(|err| classify(WORKSPACES, err))?;

            for status in resp.workspaces_connection_status() {
                // Entries without an id are unusable and dropped silently,
                // as are timestamps outside the representable epoch range.
                let Some(id) = status.workspace_id() else {
                    continue;
                };
                statuses.push(ConnectionStatus {
                    workspace_id: WorkspaceId::from(id),
                    last_connection: status
                        .last_known_user_connection_timestamp()
                        .and_then(|ts| epoch_to_utc(ts.secs(), ts.subsec_nanos())),
                });
            }

            next_token = resp.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }
        Ok(statuses)
    }

    async fn list_directories(&self) -> Result<Vec<DirectoryRegistration>, CloudError> {
        let resp = self
            .client
            .describe_workspace_directories()
            .send()
            .await
            .map_err(|err| classify(WORKSPACES, err))?;
        Ok(resp
            .directories()
            .iter()
            .map(|dir| DirectoryRegistration {
                id: DirectoryId::from(dir.directory_id().unwrap_or_default()),
                registration_code: dir.registration_code().unwrap_or_default().to_string(),
            })
            .collect())
    }

    async fn find_workspace(
        &self,
        id: &WorkspaceId,
    ) -> Result<Option<WorkspaceInstance>, CloudError> {
        let resp = self
            .client
            .describe_workspaces()
            .workspace_ids(id.0.clone())
            .send()
            .await
            .map_err(|err| classify(WORKSPACES, err))?;
        Ok(resp
            .workspaces()
            .first()
            .map(|ws| self.instance_from_api(ws)))
    }

    async fn submit_action(
        &self,
        id: &WorkspaceId,
        action: WorkspaceAction,
    ) -> Result<(), CloudError> {
        let failed = match action {
            WorkspaceAction::Start => {
                let request = StartRequest::builder().workspace_id(id.0.clone()).build();
                let resp = self
                    .client
                    .start_workspaces()
                    .start_workspace_requests(request)
                    .send()
                    .await
                    .map_err(|err| classify(WORKSPACES, err))?;
                first_failure(resp.failed_requests())
            }
            WorkspaceAction::Stop => {
                let request = StopRequest::builder().workspace_id(id.0.clone()).build();
                let resp = self
                    .client
                    .stop_workspaces()
                    .stop_workspace_requests(request)
                    .send()
                    .await
                    .map_err(|err| classify(WORKSPACES, err))?;
                first_failure(resp.failed_requests())
            }
            WorkspaceAction::Reboot => {
                let request = RebootRequest::builder()
                    .workspace_id(id.0.clone())
                    .build()
                    .map_err(build_err)?;
                let resp = self
                    .client
                    .reboot_workspaces()
                    .reboot_workspace_requests(request)
                    .send()
                    .await
                    .map_err(|err| classify(WORKSPACES, err))?;
                first_failure(resp.failed_requests())
            }
            WorkspaceAction::Rebuild => {
                let request = RebuildRequest::builder()
                    .workspace_id(id.0.clone())
                    .build()
                    .map_err(build_err)?;
                let resp = self
                    .client
                    .rebuild_workspaces()
                    .rebuild_workspace_requests(request)
                    .send()
                    .await
                    .map_err(|err| classify(WORKSPACES, err))?;
                first_failure(resp.failed_requests())
            }
            WorkspaceAction::Decommission => {
                let request = TerminateRequest::builder()
                    .workspace_id(id.0.clone())
                    .build()
                    .map_err(build_err)?;
                let resp = self
                    .client
                    .terminate_workspaces()
                    .terminate_workspace_requests(request)
                    .send()
                    .await
                    .map_err(|err| classify(WORKSPACES, err))?;
                first_failure(resp.failed_requests())
            }
        };

        match failed {
            Some(message) => Err(CloudError::Rejected { message }),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_conversion_accepts_ordinary_timestamps() {
        let at = epoch_to_utc(1_722_945_600, 0).expect("in range");
        assert_eq!(at.timestamp(), 1_722_945_600);
    }

    #[test]
    fn epoch_conversion_rejects_out_of_range_values() {
        assert!(epoch_to_utc(i64::MAX, 0).is_none());
        assert!(epoch_to_utc(i64::MIN, 0).is_none());
    }

    #[test]
    fn first_failure_prefers_the_provider_message() {
        let failed = vec![FailedWorkspaceChangeRequest::builder()
            .workspace_id("ws-1")
            .error_code("OperationNotSupportedException")
            .error_message("workspace is busy")
            .build()];
        assert_eq!(first_failure(&failed).as_deref(), Some("workspace is busy"));
        assert_eq!(first_failure(&[]), None);
    }
}
