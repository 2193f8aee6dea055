//! DynamoDB-backed portal table.
//!
//! Rows use typed attributes keyed by `WorkspaceId`:
//!
//! ```text
//! WorkspaceId   S  (key)
//! UserName      S
//! Region        S
//! InstanceState S
//! LastTouched   N  fractional epoch seconds at write time
//! RunningMode   S
//! RegCode       S
//! ComputerName  S  (only when known)
//! IPAddress     S  (only when known)
//! LastConnected N  epoch seconds (only when known)
//! ```

use std::collections::HashMap;

use aws_config::SdkConfig;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};

use async_trait::async_trait;

use wsportal_core::types::{InventoryRecord, RegionName, WorkspaceId};

use crate::aws::classify;
use crate::error::CloudError;
use crate::provider::InventoryTable;

const DYNAMODB: &str = "DynamoDB";

const KEY_ATTR: &str = "WorkspaceId";

// ---------------------------------------------------------------------------
// Attribute encoding
// ---------------------------------------------------------------------------

/// Fractional epoch seconds (`<secs>.<micros>`), the number format rows have
/// always carried in `LastTouched`.
fn epoch_seconds_string(at: DateTime<Utc>) -> String {
    format!("{}.{:06}", at.timestamp(), at.timestamp_subsec_micros())
}

/// Encode a record as a typed-attribute item. Optional fields are omitted
/// entirely rather than written as empty values.
pub fn encode_record(record: &InventoryRecord) -> HashMap<String, AttributeValue> {
    let mut item = HashMap::from([
        (
            KEY_ATTR.to_string(),
            AttributeValue::S(record.workspace_id.0.clone()),
        ),
        (
            "UserName".to_string(),
            AttributeValue::S(record.user_name.clone()),
        ),
        (
            "Region".to_string(),
            AttributeValue::S(record.region.0.clone()),
        ),
        (
            "InstanceState".to_string(),
            AttributeValue::S(record.state.clone()),
        ),
        (
            "LastTouched".to_string(),
            AttributeValue::N(epoch_seconds_string(record.last_touched)),
        ),
        (
            "RunningMode".to_string(),
            AttributeValue::S(record.running_mode.clone()),
        ),
        (
            "RegCode".to_string(),
            AttributeValue::S(record.registration_code.clone()),
        ),
    ]);

    if let Some(name) = &record.computer_name {
        item.insert("ComputerName".to_string(), AttributeValue::S(name.clone()));
    }
    if let Some(ip) = &record.ip_address {
        item.insert("IPAddress".to_string(), AttributeValue::S(ip.clone()));
    }
    if let Some(at) = record.last_connected {
        item.insert(
            "LastConnected".to_string(),
            AttributeValue::N(at.timestamp().to_string()),
        );
    }

    item
}

fn req_s(
    item: &HashMap<String, AttributeValue>,
    id: &str,
    attribute: &'static str,
) -> Result<String, CloudError> {
    item.get(attribute)
        .and_then(|value| value.as_s().ok())
        .cloned()
        .ok_or_else(|| CloudError::Malformed {
            workspace_id: id.to_string(),
            attribute,
        })
}

fn opt_s(item: &HashMap<String, AttributeValue>, attribute: &str) -> Option<String> {
    item.get(attribute)
        .and_then(|value| value.as_s().ok())
        .cloned()
}

fn opt_n(item: &HashMap<String, AttributeValue>, attribute: &str) -> Option<String> {
    item.get(attribute)
        .and_then(|value| value.as_n().ok())
        .cloned()
}

/// Decode a typed-attribute item back into a record.
///
/// Missing required attributes are [`CloudError::Malformed`]; an
/// unparseable `LastConnected` is dropped, matching how it is imported.
pub fn decode_record(item: &HashMap<String, AttributeValue>) -> Result<InventoryRecord, CloudError> {
    let id = item
        .get(KEY_ATTR)
        .and_then(|value| value.as_s().ok())
        .cloned()
        .ok_or(CloudError::Malformed {
            workspace_id: "<unknown>".to_string(),
            attribute: KEY_ATTR,
        })?;

    let last_touched = opt_n(item, "LastTouched")
        .and_then(|raw| raw.parse::<f64>().ok())
        .and_then(|secs| DateTime::from_timestamp_micros((secs * 1e6).round() as i64))
        .ok_or_else(|| CloudError::Malformed {
            workspace_id: id.clone(),
            attribute: "LastTouched",
        })?;

    Ok(InventoryRecord {
        user_name: req_s(item, &id, "UserName")?,
        region: RegionName(req_s(item, &id, "Region")?),
        state: req_s(item, &id, "InstanceState")?,
        running_mode: req_s(item, &id, "RunningMode")?,
        registration_code: opt_s(item, "RegCode").unwrap_or_default(),
        computer_name: opt_s(item, "ComputerName"),
        ip_address: opt_s(item, "IPAddress"),
        last_connected: opt_n(item, "LastConnected")
            .and_then(|raw| raw.parse::<i64>().ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        last_touched,
        workspace_id: WorkspaceId(id),
    })
}

// ---------------------------------------------------------------------------
// DynamoTable
// ---------------------------------------------------------------------------

/// DynamoDB implementation of [`InventoryTable`].
pub struct DynamoTable {
    client: aws_sdk_dynamodb::Client,
    table_name: String,
}

impl DynamoTable {
    pub fn new(shared: &SdkConfig, table_name: impl Into<String>) -> Self {
        Self {
            client: aws_sdk_dynamodb::Client::new(shared),
            table_name: table_name.into(),
        }
    }

    /// Point the client at an explicit endpoint (DynamoDB Local).
    pub fn with_endpoint(
        shared: &SdkConfig,
        table_name: impl Into<String>,
        endpoint_url: impl Into<String>,
    ) -> Self {
        let conf = aws_sdk_dynamodb::config::Builder::from(shared)
            .endpoint_url(endpoint_url)
            .build();
        Self {
            client: aws_sdk_dynamodb::Client::from_conf(conf),
            table_name: table_name.into(),
        }
    }

    fn key(&self, id: &WorkspaceId) -> AttributeValue {
        AttributeValue::S(id.0.clone())
    }
}

#[async_trait]
impl InventoryTable for DynamoTable {
    async fn put(&self, record: &InventoryRecord) -> Result<(), CloudError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(encode_record(record)))
            .send()
            .await
            .map_err(|err| classify(DYNAMODB, err))?;
        Ok(())
    }

    async fn get(&self, id: &WorkspaceId) -> Result<Option<InventoryRecord>, CloudError> {
        let resp = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(KEY_ATTR, self.key(id))
            .send()
            .await
            .map_err(|err| classify(DYNAMODB, err))?;
        match resp.item() {
            Some(item) => Ok(Some(decode_record(item)?)),
            None => Ok(None),
        }
    }

    async fn set_state(&self, id: &WorkspaceId, state: &str) -> Result<(), CloudError> {
        self.client
            .update_item()
            .table_name(&self.table_name)
            .key(KEY_ATTR, self.key(id))
            .update_expression("SET InstanceState = :s")
            .expression_attribute_values(":s", AttributeValue::S(state.to_string()))
            .send()
            .await
            .map_err(|err| classify(DYNAMODB, err))?;
        Ok(())
    }

    async fn delete(&self, id: &WorkspaceId) -> Result<(), CloudError> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key(KEY_ATTR, self.key(id))
            .send()
            .await
            .map_err(|err| classify(DYNAMODB, err))?;
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<InventoryRecord>, CloudError> {
        let mut records = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let resp = self
                .client
                .scan()
                .table_name(&self.table_name)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|err| classify(DYNAMODB, err))?;

            for item in resp.items() {
                match decode_record(item) {
                    Ok(record) => records.push(record),
                    Err(err) => tracing::warn!("skipping malformed portal row: {err}"),
                }
            }

            match resp.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
