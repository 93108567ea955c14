//! # Parallel Deployment
//!
//! Runs one [`Deployer`] per requested VM on a dedicated `rayon` pool. The
//! pool size bounds how many deployments are in flight. Every task's result is
//! collected on its own; a failing or panicking task never stops its siblings.

use std::panic::{self, AssertUnwindSafe};

use rayon::prelude::*;
use tracing::{error, info, info_span};

use crate::deploy::{DeployConfig, Deployer, TaskConfig, TaskReport, panic_message};
use crate::error::{DeployError, Result};
use crate::vsphere::VsphereApi;

/// Upper bound on simultaneous deployments.
pub const MAX_CONCURRENT_DEPLOYMENTS: usize = 20;

/// Result of one task.
#[derive(Debug)]
pub struct TaskOutcome {
    pub index: usize,
    pub vm_name: String,
    pub result: Result<TaskReport>,
}

#[derive(Debug, Default)]
pub struct FanoutReport {
    /// One entry per task, in index order.
    pub outcomes: Vec<TaskOutcome>,
}

impl FanoutReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }
}

/// Deploys `config.vm_count` VMs with at most [`MAX_CONCURRENT_DEPLOYMENTS`]
/// in flight.
pub fn deploy_all<A>(api: &A, config: &DeployConfig) -> Result<FanoutReport>
where
    A: VsphereApi + Sync,
{
    run_tasks(api, config.tasks(), MAX_CONCURRENT_DEPLOYMENTS)
}

/// Runs `tasks` on a pool of at most `max_concurrent` threads and waits for
/// all of them.
///
/// Errors here are about the pool itself; per-task failures are reported in
/// the returned [`FanoutReport`].
pub fn run_tasks<A>(api: &A, tasks: Vec<TaskConfig>, max_concurrent: usize) -> Result<FanoutReport>
where
    A: VsphereApi + Sync,
{
    if max_concurrent == 0 {
        return Err(DeployError::Config(
            "max concurrent deployments must be at least 1".to_string(),
        ));
    }
    if tasks.is_empty() {
        return Ok(FanoutReport::default());
    }

    let threads = max_concurrent.min(tasks.len());
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("deploy-{}", i))
        .build()?;

    info!(tasks = tasks.len(), threads, "starting deployments");
    let outcomes: Vec<TaskOutcome> = pool.install(|| {
        tasks
            .into_par_iter()
            .map(|task| run_task(api, task))
            .collect()
    });

    let report = FanoutReport { outcomes };
    info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        "deployments finished"
    );
    Ok(report)
}

fn run_task<A>(api: &A, task: TaskConfig) -> TaskOutcome
where
    A: VsphereApi,
{
    let index = task.index;
    let vm_name = task.vm_name.clone();
    let span = info_span!("task", index, vm = %vm_name);
    let _enter = span.enter();

    // Deployer::run already catches panics from the deploy sequence; this
    // covers the rest (e.g. a panicking cleanup).
    let result = panic::catch_unwind(AssertUnwindSafe(|| Deployer::new(api, task).run()))
        .unwrap_or_else(|payload| Err(DeployError::UnhandledTask(panic_message(payload.as_ref()))));

    match &result {
        Ok(report) => info!(vm_id = %report.vm_id, "task complete"),
        Err(e) => error!(error = %e, "task failed"),
    }
    TaskOutcome {
        index,
        vm_name,
        result,
    }
}
