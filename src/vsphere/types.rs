//! # vSphere Automation API Data Types
//!
//! This module defines the Rust structs that model the JSON objects exchanged
//! with the vSphere Automation REST API (`/api/...`) during an OVF deployment:
//! resource pool and VM lookups, content library item lookup, the OVF
//! `filter`/`deploy` calls, and power state.
//!
//! The API uses snake_case keys, so most fields need no renaming.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Where a new VM is placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentTarget {
    pub resource_pool_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
}

impl DeploymentTarget {
    pub fn resource_pool(resource_pool_id: impl Into<String>) -> Self {
        DeploymentTarget {
            resource_pool_id: resource_pool_id.into(),
            host_id: None,
            folder_id: None,
        }
    }
}

/// The deployment spec for deploying an OVF package into a resource pool.
///
/// Optional fields left as `None` are omitted from the request body so the
/// server applies its own defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourcePoolDeploymentSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    pub accept_all_eula: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_mappings: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_mappings: Option<HashMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_provisioning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_profile_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_parameters: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_datastore_id: Option<String>,
}

/// Body of `POST /api/vcenter/ovf/library-item/{id}?action=deploy`.
#[derive(Debug, Serialize)]
pub struct DeployRequest<'a> {
    pub client_token: &'a str,
    pub target: &'a DeploymentTarget,
    pub deployment_spec: &'a ResourcePoolDeploymentSpec,
}

/// Body of `POST /api/vcenter/ovf/library-item/{id}?action=filter`.
#[derive(Debug, Serialize)]
pub struct FilterRequest<'a> {
    pub target: &'a DeploymentTarget,
}

/// Body of `POST /api/content/library/item?action=find`.
#[derive(Debug, Serialize)]
pub struct FindItemSpec<'a> {
    pub name: &'a str,
}

/// Information about an OVF package as seen from a deployment target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OvfSummary {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub annotation: Option<String>,
    #[serde(default, rename = "EULAs")]
    pub eulas: Vec<String>,
    #[serde(default)]
    pub networks: Vec<String>,
    #[serde(default)]
    pub storage_groups: Vec<String>,
}

/// A localizable message as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LocalizableMessage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub default_message: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// A single error, warning or informational message from an OVF operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OvfMessage {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub message: Option<LocalizableMessage>,
}

impl OvfMessage {
    /// Human readable text of the message.
    pub fn text(&self) -> String {
        match (&self.message, &self.category) {
            (Some(m), _) if !m.default_message.is_empty() => m.default_message.clone(),
            (Some(m), _) if !m.id.is_empty() => m.id.clone(),
            (_, Some(category)) => category.clone(),
            _ => "unknown OVF message".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OvfResultInfo {
    #[serde(default)]
    pub errors: Vec<OvfMessage>,
    #[serde(default)]
    pub warnings: Vec<OvfMessage>,
    #[serde(default)]
    pub information: Vec<OvfMessage>,
}

/// Type and id of the object created by a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeployableIdentity {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
}

/// Raw result of a deploy call.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentResult {
    pub succeeded: bool,
    #[serde(default)]
    pub resource_id: Option<DeployableIdentity>,
    #[serde(default)]
    pub error: Option<OvfResultInfo>,
}

/// Typed view of a [`DeploymentResult`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentOutcome {
    Success {
        resource_type: String,
        resource_id: String,
        warnings: Vec<String>,
    },
    Failure {
        errors: Vec<String>,
    },
}

impl From<DeploymentResult> for DeploymentOutcome {
    fn from(result: DeploymentResult) -> Self {
        let info = result.error.unwrap_or_default();
        match (result.succeeded, result.resource_id) {
            (true, Some(resource)) => DeploymentOutcome::Success {
                resource_type: resource.resource_type,
                resource_id: resource.id,
                warnings: info.warnings.iter().map(OvfMessage::text).collect(),
            },
            (true, None) => DeploymentOutcome::Failure {
                errors: vec!["deployment reported success without a resource id".to_string()],
            },
            (false, _) => DeploymentOutcome::Failure {
                errors: info.errors.iter().map(OvfMessage::text).collect(),
            },
        }
    }
}

/// Element of `GET /api/vcenter/resource-pool`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourcePoolSummary {
    pub resource_pool: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PowerState {
    PoweredOn,
    PoweredOff,
    Suspended,
}

/// Body of `GET /api/vcenter/vm/{vm}/power`.
#[derive(Debug, Clone, Deserialize)]
pub struct PowerInfo {
    pub state: PowerState,
}

/// The subset of `GET /api/vcenter/vm/{vm}` this crate reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VmInfo {
    pub name: String,
    pub power_state: PowerState,
}

/// Standard error body returned with non-2xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub messages: Vec<LocalizableMessage>,
}
