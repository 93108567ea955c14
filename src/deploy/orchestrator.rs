//! # Single-VM Deployment
//!
//! [`Deployer`] deploys one VM: resolve the resource pool and library item,
//! submit the OVF deploy, power the new VM on, and finally power it off and
//! delete it again. Cleanup runs exactly once per [`Deployer::run`], whether
//! the earlier steps succeeded, failed or panicked.

use std::panic::{self, AssertUnwindSafe};

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::deploy::{ResolvedTargets, TaskConfig, TaskReport, panic_message};
use crate::error::{DeployError, Result};
use crate::vsphere::{
    DeploymentOutcome, DeploymentTarget, PowerState, ResourcePoolDeploymentSpec, VmInfo,
    VsphereApi,
};

/// A deployed VM owned by one [`Deployer`].
///
/// Set as soon as the deploy reports the VM id, so cleanup can delete the VM
/// even if the inventory lookup that follows fails.
#[derive(Debug, Clone)]
pub struct VmHandle {
    pub id: String,
    pub info: Option<VmInfo>,
}

pub struct Deployer<'a, A: VsphereApi> {
    api: &'a A,
    task: TaskConfig,
    vm: Option<VmHandle>,
}

impl<'a, A: VsphereApi> Deployer<'a, A> {
    pub fn new(api: &'a A, task: TaskConfig) -> Self {
        Deployer {
            api,
            task,
            vm: None,
        }
    }

    pub fn vm(&self) -> Option<&VmHandle> {
        self.vm.as_ref()
    }

    /// Runs the whole sequence and always cleans up afterwards.
    ///
    /// The first error of the deploy sequence is returned. A cleanup error is
    /// returned only if the sequence itself succeeded.
    pub fn run(mut self) -> Result<TaskReport> {
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.execute()));
        let cleaned = self.cleanup();
        let result = match result {
            Ok(result) => result,
            Err(payload) => Err(DeployError::UnhandledTask(panic_message(payload.as_ref()))),
        };
        match (result, cleaned) {
            (Ok(report), cleaned) => cleaned.map(|()| report),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(cleanup_err)) => {
                warn!(vm_name = %self.task.vm_name, error = %cleanup_err, "cleanup failed");
                Err(e)
            }
        }
    }

    fn execute(&mut self) -> Result<TaskReport> {
        let resolved = self.resolve_targets()?;
        let outcome = self.deploy(&resolved)?;
        self.handle_result(outcome)
    }

    /// Looks up the resource pool, the library item and its OVF summary.
    pub fn resolve_targets(&self) -> Result<ResolvedTargets> {
        let pool_name = &self.task.resource_pool_name;
        let resource_pool_id = self
            .api
            .find_resource_pool(pool_name)?
            .ok_or_else(|| DeployError::not_found("resource pool", pool_name.as_str()))?;
        info!(resource_pool = %pool_name, id = %resource_pool_id, "resource pool found");
        let target = DeploymentTarget::resource_pool(resource_pool_id);

        let item_name = &self.task.library_item_name;
        let library_item_id = self
            .api
            .find_library_item(item_name)?
            .ok_or_else(|| DeployError::not_found("library item", item_name.as_str()))?;
        let summary = self.api.ovf_summary(&library_item_id, &target)?;
        info!(
            library_item = %item_name,
            template = summary.name.as_deref().unwrap_or("-"),
            "found an OVF template to deploy"
        );

        Ok(ResolvedTargets {
            library_item_id,
            target,
            summary,
        })
    }

    /// Submits the deploy call with a fresh client token.
    pub fn deploy(&self, resolved: &ResolvedTargets) -> Result<DeploymentOutcome> {
        let spec = ResourcePoolDeploymentSpec {
            name: self.task.vm_name.clone(),
            annotation: resolved.summary.annotation.clone(),
            accept_all_eula: true,
            ..Default::default()
        };
        let client_token = Uuid::new_v4().to_string();
        info!(vm_name = %spec.name, "deploying");
        let result = self.api.deploy_ovf(
            &resolved.library_item_id,
            &resolved.target,
            &spec,
            &client_token,
        )?;
        Ok(result.into())
    }

    /// Powers on a successfully deployed VM; reports the errors of a failed
    /// deployment.
    pub fn handle_result(&mut self, outcome: DeploymentOutcome) -> Result<TaskReport> {
        match outcome {
            DeploymentOutcome::Success {
                resource_type,
                resource_id,
                warnings,
            } => {
                info!(
                    vm_name = %self.task.vm_name,
                    resource_type = %resource_type,
                    id = %resource_id,
                    "deployment successful"
                );
                for warning in &warnings {
                    warn!(vm_name = %self.task.vm_name, "OVF warning: {}", warning);
                }

                self.vm = Some(VmHandle {
                    id: resource_id.clone(),
                    info: None,
                });
                let info = self
                    .api
                    .find_vm(&resource_id)?
                    .ok_or_else(|| DeployError::not_found("VM", resource_id.as_str()))?;
                if let Some(vm) = self.vm.as_mut() {
                    vm.info = Some(info);
                }
                self.power_on(&resource_id)?;

                Ok(TaskReport {
                    vm_name: self.task.vm_name.clone(),
                    vm_id: resource_id,
                    resource_type,
                    warnings,
                })
            }
            DeploymentOutcome::Failure { errors } => {
                error!(vm_name = %self.task.vm_name, "deployment failed");
                for e in &errors {
                    error!(vm_name = %self.task.vm_name, "OVF error: {}", e);
                }
                Err(DeployError::Deployment {
                    vm_name: self.task.vm_name.clone(),
                    errors,
                })
            }
        }
    }

    fn power_on(&self, vm_id: &str) -> Result<()> {
        let power_err = |e: DeployError| DeployError::PowerOn {
            vm_id: vm_id.to_string(),
            reason: e.to_string(),
        };
        self.api.power_on(vm_id).map_err(power_err)?;
        let state = self.api.power_state(vm_id).map_err(power_err)?;
        if state != PowerState::PoweredOn {
            return Err(DeployError::PowerOn {
                vm_id: vm_id.to_string(),
                reason: format!("power state is {:?} after power-on", state),
            });
        }
        info!(vm_name = %self.task.vm_name, vm_id, "powered on");
        Ok(())
    }

    /// Powers off and deletes the VM, if one was deployed. Power-off is
    /// best-effort; deletion errors are returned.
    pub fn cleanup(&mut self) -> Result<()> {
        let Some(vm) = self.vm.take() else {
            return Ok(());
        };
        if let Err(e) = self.api.power_off(&vm.id) {
            warn!(vm_name = %self.task.vm_name, vm_id = %vm.id, error = %e, "power off failed");
        }
        self.api.delete_vm(&vm.id)?;
        info!(vm_name = %self.task.vm_name, vm_id = %vm.id, "deleted");
        Ok(())
    }
}
