// # ovf-deploy: Deploy VMs from a Content Library OVF Template
//
// This crate deploys virtual machines from an OVF item in a vSphere content
// library into a resource pool, powers them on and cleans them up again. Many
// deployments can run side by side on a bounded worker pool.
//
// The remote endpoint is reached through the `VsphereApi` trait. The REST
// implementation is enabled with the `reqwest` feature (on by default); the
// workflow itself builds without it.

/// Shared HTTP client construction. Enabled with the `reqwest` feature.
#[cfg(feature = "reqwest")]
pub mod client;

/// Error types shared by the whole crate.
pub mod error;

/// vSphere Automation API access: the `VsphereApi` trait, its REST client and wire types.
pub mod vsphere;

/// The deployment workflow: per-VM orchestration and the parallel fan-out driver.
pub mod deploy;

pub use error::{DeployError, Result};
