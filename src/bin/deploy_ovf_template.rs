use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ovf_deploy::deploy::{self, DeployConfig};
use ovf_deploy::vsphere::{ConnectionParams, VsphereClient};

/// Deploys VMs from an OVF library item into a resource pool, powers them on,
/// then powers them off and deletes them.
///
/// Needs an existing library item holding an OVF template and a resource pool
/// with room for the VMs.
#[derive(Parser, Debug)]
#[command(name = "deploy_ovf_template")]
struct Args {
    /// vCenter host name or base URL
    #[arg(short = 's', long, env = "VSPHERE_SERVER")]
    server: String,

    #[arg(short = 'u', long, env = "VSPHERE_USERNAME")]
    username: String,

    #[arg(short = 'p', long, env = "VSPHERE_PASSWORD", hide_env_values = true)]
    password: String,

    /// Do not verify the server's TLS certificate
    #[arg(short = 'v', long = "skipverification", env = "VSPHERE_SKIP_VERIFICATION")]
    skip_verification: bool,

    /// Base name of the VMs (random `vm-<uuid>` if omitted)
    #[arg(short = 'n', long = "vm_name")]
    vm_name: Option<String>,

    /// The name of the resource pool to be used
    #[arg(long = "resourcepoolname")]
    resource_pool_name: String,

    /// The name of the library item to deploy. It should contain an OVF package.
    #[arg(long = "libitemname")]
    library_item_name: String,

    /// Number of VMs to be created
    #[arg(long = "vm_count", default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    vm_count: u32,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether every VM deployed successfully.
fn run() -> Result<bool> {
    let args = Args::parse();
    let config = DeployConfig::new(
        ConnectionParams {
            server: args.server,
            username: args.username,
            password: args.password,
            skip_verification: args.skip_verification,
        },
        args.resource_pool_name,
        args.library_item_name,
        args.vm_name,
        args.vm_count as usize,
    )?;

    // One session shared by all tasks; closed when `client` is dropped.
    let client = VsphereClient::connect(&config.connection)
        .with_context(|| format!("Failed to connect to {}", config.connection.server))?;

    let report = deploy::deploy_all(&client, &config)?;
    info!(
        "deployed {} of {} VM(s)",
        report.succeeded(),
        report.outcomes.len()
    );
    for outcome in &report.outcomes {
        if let Err(e) = &outcome.result {
            error!(vm_name = %outcome.vm_name, "{}", e);
        }
    }
    Ok(report.all_succeeded())
}
