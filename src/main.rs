//! camgraph - media graph dry run
//!
//! Loads a topology file, replays device registrations in the requested
//! order and prints the pipeline that results.
//!
//! Usage:
//!   camgraph tegra.toml                        Register devices in file order
//!   camgraph tegra.toml --order ov428,vi,nvcsi Register in a chosen order
//!   camgraph tegra.toml --json                 Print the snapshot as JSON

use anyhow::{bail, Context, Result};
use camgraph::config::{topology_path, DeviceBinding, OutputFormat, Settings, TopologyFile};
use camgraph::pipeline::{GraphError, NodeTable, PipelineStatus};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "camgraph")]
#[command(about = "Replay device registrations against a topology and print the media graph")]
#[command(version)]
struct Args {
    /// Topology file
    topology: PathBuf,

    /// Registration order as comma-separated node names (default: file order)
    #[arg(short, long, value_delimiter = ',')]
    order: Vec<String>,

    /// Print the snapshot as JSON
    #[arg(long)]
    json: bool,

    /// Tear the pipeline down before exiting
    #[arg(long)]
    teardown: bool,

    /// Log filter, used when RUST_LOG is unset
    #[arg(long)]
    log_filter: Option<String>,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_logging(filter: &str, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .context("Log file path has no file name")?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Devices in registration order. Names not in `order` are left unregistered.
fn registration_order(devices: Vec<DeviceBinding>, order: &[String]) -> Result<Vec<DeviceBinding>> {
    if order.is_empty() {
        return Ok(devices);
    }
    let mut ordered = Vec::with_capacity(order.len());
    for name in order {
        let Some(binding) = devices.iter().find(|d| &d.node_name == name) else {
            bail!("No device declared for node '{}'", name);
        };
        ordered.push(binding.clone());
    }
    Ok(ordered)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::load_or_default();

    let filter = args.log_filter.as_deref().unwrap_or(&settings.log_filter);
    let log_file = args.log_file.as_deref().or(settings.log_file.as_deref());
    let _log_guard = init_logging(filter, log_file)?;

    let path = topology_path(args.topology);
    tracing::info!("Loading topology from {}", path.display());
    let loaded = TopologyFile::load(&path)?.build()?;

    let (mut coordinator, devices) = loaded.into_coordinator(NodeTable::new())?;
    let devices = registration_order(devices, &args.order)?;

    for binding in devices {
        tracing::info!("Registering '{}'", binding.node_name);
        match coordinator.register(binding.node, binding.device) {
            Ok(registration) if registration.completed => {
                tracing::info!("Pipeline completed by '{}'", binding.node_name);
            }
            Ok(_) => {}
            Err(e @ GraphError::AlreadyBound { .. }) => {
                tracing::warn!("{}", e);
            }
            Err(e) => {
                tracing::error!("Registration of '{}' failed: {}", binding.node_name, e);
            }
        }
    }

    let missing = coordinator.missing();
    if !missing.is_empty() {
        let names: Vec<&str> = missing
            .iter()
            .map(|&n| coordinator.topology().name(n).unwrap_or("?"))
            .collect();
        tracing::warn!("Still waiting for: {}", names.join(", "));
    }

    let format = if args.json {
        OutputFormat::Json
    } else {
        settings.output
    };
    let snapshot = coordinator.snapshot();
    match format {
        OutputFormat::Json => println!("{}", snapshot.to_json()?),
        OutputFormat::Text => print!("{}", snapshot),
    }

    let status = coordinator.pipeline().status();
    if args.teardown {
        coordinator.teardown()?;
    }

    if status != PipelineStatus::Complete {
        bail!("Pipeline not published (status: {})", status);
    }
    Ok(())
}
