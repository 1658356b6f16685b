//! op-ovsctl
//!
//! Command-line front end for the op-ovs wrappers:
//! - `vsctl`: bridges and ports
//! - `ofctl`: OpenFlow switches and flow tables
//! - `dpctl`: kernel datapaths
//! - `capabilities`: which OVS tools are installed

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use op_ovs::{OvsClient, OvsConfig};

mod commands;

/// Used when `RUST_LOG` is unset or empty
const DEFAULT_LOG_DIRECTIVES: &str = "op_ovs=warn,op_ovsctl=warn";

use commands::Commands;

#[derive(Parser, Debug)]
#[command(name = "op-ovsctl")]
#[command(about = "Administer Open vSwitch through ovs-vsctl, ovs-ofctl and ovs-dpctl")]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// TOML file with program paths and timeout
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Kill a tool that runs longer than this many seconds
    #[arg(short, long)]
    timeout: Option<f64>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

fn load_config(args: &Args) -> Result<OvsConfig> {
    let mut config = match &args.config {
        Some(path) => OvsConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => OvsConfig::default(),
    };
    config.apply_env().context("Invalid OP_OVS_* environment")?;

    if let Some(secs) = args.timeout {
        let timeout = Duration::try_from_secs_f64(secs)
            .with_context(|| format!("--timeout {} is not a valid number of seconds", secs))?;
        anyhow::ensure!(!timeout.is_zero(), "--timeout must be a positive number of seconds");
        config = config.with_timeout(timeout);
    }

    debug!("Using configuration: {:?}", config);
    Ok(config)
}

fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    match rust_log.map(str::trim).filter(|v| !v.is_empty()) {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::new(DEFAULT_LOG_DIRECTIVES),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from /etc/op-ovs/environment (if exists)
    op_ovs::config::load_environment();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let client = OvsClient::new(&config);

    match commands::dispatch(&client, args.command).await {
        Ok(output) => output.print(args.json),
        Err(e) => {
            warn!("Hint: {}", e.suggestion());
            Err(e.into())
        }
    }
}
