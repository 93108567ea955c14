//! # vSphere Automation API Client
//!
//! This module is the boundary between the deployment workflow and the
//! management endpoint. [`VsphereApi`] lists every remote operation the workflow
//! needs (inventory lookup, content library, OVF deploy, power control), and
//! [`VsphereClient`] implements it over the REST API.
//!
//! ## Submodules
//! - `session`: Opens and closes the authenticated API session.
//! - `client`: REST implementation of [`VsphereApi`].
//! - `types`: Data structures serialized to and deserialized from the API.

/// Authenticated API session.
#[cfg(feature = "reqwest")]
pub mod session;
/// REST implementation of [`VsphereApi`].
#[cfg(feature = "reqwest")]
pub mod client;
/// Data structures for the vSphere Automation API.
pub mod types;

#[cfg(all(test, feature = "reqwest"))]
mod stub;

#[cfg(feature = "reqwest")]
pub use crate::vsphere::client::VsphereClient;
#[cfg(feature = "reqwest")]
pub use crate::vsphere::session::Session;
pub use crate::vsphere::types::*;

use std::fmt;

use crate::error::Result;

/// Parameters needed to open a session against the management endpoint.
#[derive(Clone)]
pub struct ConnectionParams {
    /// Host name (`vcenter.example.com`) or base URL (`https://host:8443`).
    pub server: String,
    pub username: String,
    pub password: String,
    /// Accept self-signed or otherwise invalid TLS certificates.
    pub skip_verification: bool,
}

impl ConnectionParams {
    /// Base URL of the endpoint. A bare host name is served over HTTPS.
    pub fn base_url(&self) -> String {
        let server = self.server.trim_end_matches('/');
        if server.contains("://") {
            server.to_string()
        } else {
            format!("https://{}", server)
        }
    }
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("skip_verification", &self.skip_verification)
            .finish()
    }
}

/// Remote operations used by the deployment workflow.
///
/// Implementations must be usable from several worker threads at once; the
/// fan-out driver shares one instance across all of its tasks.
pub trait VsphereApi {
    /// Resolves a resource pool name to its identifier.
    fn find_resource_pool(&self, name: &str) -> Result<Option<String>>;

    /// Fetches a VM by identifier. `None` if the inventory does not know it.
    fn find_vm(&self, vm_id: &str) -> Result<Option<VmInfo>>;

    /// Resolves a content library item name to its identifier.
    fn find_library_item(&self, name: &str) -> Result<Option<String>>;

    /// Summary of the OVF package in `library_item_id` as seen from `target`.
    fn ovf_summary(&self, library_item_id: &str, target: &DeploymentTarget) -> Result<OvfSummary>;

    /// Deploys the OVF package. `client_token` makes the call idempotent.
    fn deploy_ovf(
        &self,
        library_item_id: &str,
        target: &DeploymentTarget,
        spec: &ResourcePoolDeploymentSpec,
        client_token: &str,
    ) -> Result<DeploymentResult>;

    fn power_on(&self, vm_id: &str) -> Result<()>;

    fn power_state(&self, vm_id: &str) -> Result<PowerState>;

    /// Powers the VM off. A VM that is already off is not an error.
    fn power_off(&self, vm_id: &str) -> Result<()>;

    fn delete_vm(&self, vm_id: &str) -> Result<()>;
}
