//! # vSphere REST Client
//!
//! [`VsphereApi`] over the vSphere Automation REST API. Every call goes through
//! the shared [`Session`], and non-2xx responses are turned into
//! [`DeployError::Api`] using the endpoint's standard error body.

use reqwest::Method;
use reqwest::StatusCode;
use reqwest::blocking::Response;
use tracing::debug;

use crate::error::{DeployError, Result};
use crate::vsphere::session::Session;
use crate::vsphere::types::*;
use crate::vsphere::{ConnectionParams, VsphereApi};

/// Error type the endpoint reports when a power operation is a no-op.
const ALREADY_IN_DESIRED_STATE: &str = "ALREADY_IN_DESIRED_STATE";

pub struct VsphereClient {
    session: Session,
}

impl VsphereClient {
    /// Opens a session and wraps it in a client.
    pub fn connect(params: &ConnectionParams) -> Result<VsphereClient> {
        Ok(VsphereClient {
            session: Session::connect(params)?,
        })
    }

    fn vm_power(&self, vm_id: &str, action: &str) -> Result<()> {
        let res = self
            .session
            .request(Method::POST, &format!("/api/vcenter/vm/{}/power", vm_id))
            .query(&[("action", action)])
            .send()?;
        check(res)?;
        Ok(())
    }
}

/// Passes successful responses through and converts the rest into errors.
fn check(res: Response) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let text = res.text().unwrap_or_default();
    Err(api_error(status, &text))
}

/// Builds [`DeployError::Api`] from a non-2xx status and its body. Bodies that
/// are not the standard error shape are kept verbatim as the message.
fn api_error(status: StatusCode, text: &str) -> DeployError {
    let body: ApiErrorBody = serde_json::from_str(text).unwrap_or_default();
    let message = if body.messages.is_empty() {
        text.to_string()
    } else {
        body.messages
            .iter()
            .map(|m| m.default_message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    };
    DeployError::Api {
        status: status.as_u16(),
        error_type: body.error_type.unwrap_or_else(|| "UNKNOWN".to_string()),
        message,
    }
}

impl VsphereApi for VsphereClient {
    fn find_resource_pool(&self, name: &str) -> Result<Option<String>> {
        let res = self
            .session
            .request(Method::GET, "/api/vcenter/resource-pool")
            .query(&[("names", name)])
            .send()?;
        let pools: Vec<ResourcePoolSummary> = check(res)?.json()?;
        Ok(pools
            .into_iter()
            .find(|p| p.name == name)
            .map(|p| p.resource_pool))
    }

    fn find_vm(&self, vm_id: &str) -> Result<Option<VmInfo>> {
        let res = self
            .session
            .request(Method::GET, &format!("/api/vcenter/vm/{}", vm_id))
            .send()?;
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(check(res)?.json()?))
    }

    fn find_library_item(&self, name: &str) -> Result<Option<String>> {
        let res = self
            .session
            .request(Method::POST, "/api/content/library/item")
            .query(&[("action", "find")])
            .json(&FindItemSpec { name })
            .send()?;
        let ids: Vec<String> = check(res)?.json()?;
        if ids.len() > 1 {
            debug!(name, matches = ids.len(), "several library items match; using the first");
        }
        Ok(ids.into_iter().next())
    }

    fn ovf_summary(&self, library_item_id: &str, target: &DeploymentTarget) -> Result<OvfSummary> {
        let res = self
            .session
            .request(
                Method::POST,
                &format!("/api/vcenter/ovf/library-item/{}", library_item_id),
            )
            .query(&[("action", "filter")])
            .json(&FilterRequest { target })
            .send()?;
        Ok(check(res)?.json()?)
    }

    fn deploy_ovf(
        &self,
        library_item_id: &str,
        target: &DeploymentTarget,
        spec: &ResourcePoolDeploymentSpec,
        client_token: &str,
    ) -> Result<DeploymentResult> {
        let res = self
            .session
            .request(
                Method::POST,
                &format!("/api/vcenter/ovf/library-item/{}", library_item_id),
            )
            .query(&[("action", "deploy")])
            .json(&DeployRequest {
                client_token,
                target,
                deployment_spec: spec,
            })
            .send()?;
        Ok(check(res)?.json()?)
    }

    fn power_on(&self, vm_id: &str) -> Result<()> {
        self.vm_power(vm_id, "start")
    }

    fn power_state(&self, vm_id: &str) -> Result<PowerState> {
        let res = self
            .session
            .request(Method::GET, &format!("/api/vcenter/vm/{}/power", vm_id))
            .send()?;
        let info: PowerInfo = check(res)?.json()?;
        Ok(info.state)
    }

    fn power_off(&self, vm_id: &str) -> Result<()> {
        match self.vm_power(vm_id, "stop") {
            Err(DeployError::Api { error_type, .. }) if error_type == ALREADY_IN_DESIRED_STATE => {
                debug!(vm_id, "already powered off");
                Ok(())
            }
            other => other,
        }
    }

    fn delete_vm(&self, vm_id: &str) -> Result<()> {
        let res = self
            .session
            .request(Method::DELETE, &format!("/api/vcenter/vm/{}", vm_id))
            .send()?;
        check(res)?;
        Ok(())
    }
}
