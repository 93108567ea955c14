//! # OVF Deployment Workflow
//!
//! Deploys VMs from a content library OVF item into a resource pool:
//! resolve the resource pool and library item, deploy, power on, then clean
//! up. [`orchestrator::Deployer`] runs that sequence for one VM, and
//! [`fanout`] runs one `Deployer` per requested VM on a bounded worker pool.

pub mod fanout;
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod mock;

pub use fanout::{FanoutReport, MAX_CONCURRENT_DEPLOYMENTS, TaskOutcome, deploy_all, run_tasks};
pub use orchestrator::Deployer;

use std::any::Any;

use uuid::Uuid;

use crate::error::{DeployError, Result};
use crate::vsphere::{ConnectionParams, DeploymentTarget, OvfSummary};

/// Validated settings for one invocation.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub connection: ConnectionParams,
    pub resource_pool_name: String,
    pub library_item_name: String,
    /// Base VM name; task `i` deploys `<vm_name>-<i>`.
    pub vm_name: String,
    pub vm_count: usize,
}

impl DeployConfig {
    /// Validates the settings. Without `vm_name` a random `vm-<uuid>` base
    /// name is generated.
    pub fn new(
        connection: ConnectionParams,
        resource_pool_name: impl Into<String>,
        library_item_name: impl Into<String>,
        vm_name: Option<String>,
        vm_count: usize,
    ) -> Result<DeployConfig> {
        let resource_pool_name = resource_pool_name.into();
        let library_item_name = library_item_name.into();
        if connection.server.trim().is_empty() {
            return Err(DeployError::Config("server must not be empty".to_string()));
        }
        if resource_pool_name.is_empty() {
            return Err(DeployError::Config(
                "resource pool name must not be empty".to_string(),
            ));
        }
        if library_item_name.is_empty() {
            return Err(DeployError::Config(
                "library item name must not be empty".to_string(),
            ));
        }
        if vm_count == 0 {
            return Err(DeployError::Config("vm count must be at least 1".to_string()));
        }
        let vm_name = vm_name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(generate_vm_name);

        Ok(DeployConfig {
            connection,
            resource_pool_name,
            library_item_name,
            vm_name,
            vm_count,
        })
    }

    /// Per-task configuration for task `index`.
    pub fn task(&self, index: usize) -> TaskConfig {
        TaskConfig {
            index,
            vm_name: format!("{}-{}", self.vm_name, index),
            resource_pool_name: self.resource_pool_name.clone(),
            library_item_name: self.library_item_name.clone(),
        }
    }

    /// One [`TaskConfig`] per requested VM, in index order.
    pub fn tasks(&self) -> Vec<TaskConfig> {
        (0..self.vm_count).map(|i| self.task(i)).collect()
    }
}

/// Everything one deployment task needs. Tasks share nothing mutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskConfig {
    pub index: usize,
    pub vm_name: String,
    pub resource_pool_name: String,
    pub library_item_name: String,
}

/// The resource pool and library item a task deploys with.
#[derive(Debug, Clone)]
pub struct ResolvedTargets {
    pub library_item_id: String,
    pub target: DeploymentTarget,
    pub summary: OvfSummary,
}

/// What a successful task produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub vm_name: String,
    pub vm_id: String,
    pub resource_type: String,
    pub warnings: Vec<String>,
}

pub fn generate_vm_name() -> String {
    format!("vm-{}", Uuid::new_v4())
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}
