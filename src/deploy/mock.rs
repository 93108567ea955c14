//! In-memory [`VsphereApi`] for tests. Records every call.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crate::error::{DeployError, Result};
use crate::vsphere::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FindResourcePool(String),
    FindVm(String),
    FindLibraryItem(String),
    OvfSummary(String),
    Deploy {
        vm_name: String,
        resource_pool_id: String,
        annotation: Option<String>,
        accept_all_eula: bool,
        client_token: String,
    },
    PowerOn(String),
    PowerState(String),
    PowerOff(String),
    Delete(String),
}

pub struct MockApi {
    pub resource_pools: HashMap<String, String>,
    pub library_items: HashMap<String, String>,
    pub summary: OvfSummary,
    /// Non-empty: every deploy fails with these messages.
    pub deploy_errors: Vec<String>,
    pub deploy_warnings: Vec<String>,
    pub deploy_delay: Duration,
    /// Deploy of this VM name panics.
    pub panic_on: Option<String>,
    pub fail_power_on: bool,
    /// Power-on succeeds but the VM stays off.
    pub ignore_power_on: bool,
    /// Deployed VMs are not visible through `find_vm`.
    pub hide_vms: bool,
    /// `find_vm` fails with a 503.
    pub fail_find_vm: bool,
    calls: Mutex<Vec<Call>>,
    vms: Mutex<HashMap<String, VmInfo>>,
    next_vm: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockApi {
    pub fn new() -> MockApi {
        MockApi {
            resource_pools: HashMap::from([("Prod-Pool".to_string(), "resgroup-9".to_string())]),
            library_items: HashMap::from([("ubuntu-ovf".to_string(), "item-1".to_string())]),
            summary: OvfSummary {
                name: Some("ubuntu".to_string()),
                annotation: Some("Ubuntu 24.04 base image".to_string()),
                ..Default::default()
            },
            deploy_errors: vec![],
            deploy_warnings: vec![],
            deploy_delay: Duration::ZERO,
            panic_on: None,
            fail_power_on: false,
            ignore_power_on: false,
            hide_vms: false,
            fail_find_vm: false,
            calls: Mutex::new(vec![]),
            vms: Mutex::new(HashMap::new()),
            next_vm: AtomicUsize::new(1),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub fn deploys(&self) -> usize {
        self.count(|c| matches!(c, Call::Deploy { .. }))
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// VMs that still exist.
    pub fn live_vms(&self) -> usize {
        self.vms.lock().unwrap().len()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn api_error(status: u16, error_type: &str, message: &str) -> DeployError {
    DeployError::Api {
        status,
        error_type: error_type.to_string(),
        message: message.to_string(),
    }
}

fn ovf_messages(texts: &[String]) -> Vec<OvfMessage> {
    texts
        .iter()
        .map(|t| OvfMessage {
            category: Some("SERVER".to_string()),
            message: Some(LocalizableMessage {
                id: "mock".to_string(),
                default_message: t.clone(),
                args: vec![],
            }),
        })
        .collect()
}

impl VsphereApi for MockApi {
    fn find_resource_pool(&self, name: &str) -> Result<Option<String>> {
        self.record(Call::FindResourcePool(name.to_string()));
        Ok(self.resource_pools.get(name).cloned())
    }

    fn find_vm(&self, vm_id: &str) -> Result<Option<VmInfo>> {
        self.record(Call::FindVm(vm_id.to_string()));
        if self.fail_find_vm {
            return Err(api_error(503, "SERVICE_UNAVAILABLE", "inventory service busy"));
        }
        if self.hide_vms {
            return Ok(None);
        }
        Ok(self.vms.lock().unwrap().get(vm_id).cloned())
    }

    fn find_library_item(&self, name: &str) -> Result<Option<String>> {
        self.record(Call::FindLibraryItem(name.to_string()));
        Ok(self.library_items.get(name).cloned())
    }

    fn ovf_summary(&self, library_item_id: &str, _target: &DeploymentTarget) -> Result<OvfSummary> {
        self.record(Call::OvfSummary(library_item_id.to_string()));
        Ok(self.summary.clone())
    }

    fn deploy_ovf(
        &self,
        _library_item_id: &str,
        target: &DeploymentTarget,
        spec: &ResourcePoolDeploymentSpec,
        client_token: &str,
    ) -> Result<DeploymentResult> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        thread::sleep(self.deploy_delay);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.record(Call::Deploy {
            vm_name: spec.name.clone(),
            resource_pool_id: target.resource_pool_id.clone(),
            annotation: spec.annotation.clone(),
            accept_all_eula: spec.accept_all_eula,
            client_token: client_token.to_string(),
        });
        if self.panic_on.as_deref() == Some(spec.name.as_str()) {
            panic!("mock deploy exploded for {}", spec.name);
        }

        if !self.deploy_errors.is_empty() {
            return Ok(DeploymentResult {
                succeeded: false,
                resource_id: None,
                error: Some(OvfResultInfo {
                    errors: ovf_messages(&self.deploy_errors),
                    ..Default::default()
                }),
            });
        }

        let id = format!("vm-{}", self.next_vm.fetch_add(1, Ordering::SeqCst));
        self.vms.lock().unwrap().insert(
            id.clone(),
            VmInfo {
                name: spec.name.clone(),
                power_state: PowerState::PoweredOff,
            },
        );
        Ok(DeploymentResult {
            succeeded: true,
            resource_id: Some(DeployableIdentity {
                resource_type: "VirtualMachine".to_string(),
                id,
            }),
            error: Some(OvfResultInfo {
                warnings: ovf_messages(&self.deploy_warnings),
                ..Default::default()
            }),
        })
    }

    fn power_on(&self, vm_id: &str) -> Result<()> {
        self.record(Call::PowerOn(vm_id.to_string()));
        if self.fail_power_on {
            return Err(api_error(500, "INTERNAL_SERVER_ERROR", "host unavailable"));
        }
        if !self.ignore_power_on
            && let Some(vm) = self.vms.lock().unwrap().get_mut(vm_id)
        {
            vm.power_state = PowerState::PoweredOn;
        }
        Ok(())
    }

    fn power_state(&self, vm_id: &str) -> Result<PowerState> {
        self.record(Call::PowerState(vm_id.to_string()));
        self.vms
            .lock()
            .unwrap()
            .get(vm_id)
            .map(|vm| vm.power_state)
            .ok_or_else(|| api_error(404, "NOT_FOUND", vm_id))
    }

    fn power_off(&self, vm_id: &str) -> Result<()> {
        self.record(Call::PowerOff(vm_id.to_string()));
        match self.vms.lock().unwrap().get_mut(vm_id) {
            Some(vm) => {
                vm.power_state = PowerState::PoweredOff;
                Ok(())
            }
            None => Err(api_error(404, "NOT_FOUND", vm_id)),
        }
    }

    fn delete_vm(&self, vm_id: &str) -> Result<()> {
        self.record(Call::Delete(vm_id.to_string()));
        match self.vms.lock().unwrap().remove(vm_id) {
            Some(_) => Ok(()),
            None => Err(api_error(404, "NOT_FOUND", vm_id)),
        }
    }
}
