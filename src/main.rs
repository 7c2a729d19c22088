use clap::Parser;
use color_eyre::eyre::{bail, WrapErr};
use color_eyre::Result;
use env_logger::Env;
use log::info;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use poolalloc::alloc::Allocator;
use poolalloc::config_loader;
use poolalloc::controller::{Controller, Event, MemoryRecorder, ServicePatch, SyncState};

/// Plan address allocations for a set of load-balanced services
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the pool configuration YAML file
    #[arg(short, long)]
    config: PathBuf,

    /// Path to a YAML list of service snapshots
    #[arg(short, long)]
    services: PathBuf,

    /// Write the plan here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Plan entry for one service
#[derive(Debug, Serialize)]
struct PlannedService {
    service: String,
    state: SyncState,
    #[serde(skip_serializing_if = "Option::is_none")]
    patch: Option<ServicePatch>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    events: Vec<Event>,
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let args = Args::parse();

    // Initialize logging with default filter level of "info"
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    info!("Configuration file: {:?}", args.config);
    info!("Services file: {:?}", args.services);

    let config = config_loader::load_optional_config(&args.config)?;
    let services = config_loader::load_services(&args.services)?;

    let recorder = Arc::new(MemoryRecorder::new());
    let mut controller = Controller::new(Allocator::new());
    controller.set_client(recorder.clone());

    if controller.set_config(config.as_ref()) == SyncState::Error {
        bail!("Configuration at '{}' was not accepted", args.config.display());
    }
    controller.mark_synced();

    let mut plan = Vec::with_capacity(services.len());
    for service in &services {
        let key = service.key();
        let outcome = controller.set_balancer(&key, service);
        plan.push(PlannedService {
            events: recorder.for_service(&key),
            service: key,
            state: outcome.state,
            patch: outcome.patch,
        });
    }
    controller.shutdown();

    for group in config.iter().flat_map(|c| c.groups.iter()) {
        if let Ok(used) = controller.allocator().pool_usage(&group.name) {
            info!("Pool {}: {} addresses in use", group.name, used);
        }
    }

    let rendered = serde_json::to_string_pretty(&plan).wrap_err("Failed to render plan")?;
    match &args.output {
        Some(path) => {
            fs::write(path, rendered)
                .wrap_err_with(|| format!("Failed to write plan to '{}'", path.display()))?;
            info!("Plan written to {:?}", path);
        }
        None => println!("{}", rendered),
    }

    Ok(())
}
