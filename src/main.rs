//! `rust_mca` — emulate spectrum acquisition with the Monte-Carlo method.
//!
//! Builds the simulated device from the command line and the vendor input
//! deck, registers it as `effcalc_mca` and serves the LSRM TCP protocol
//! until interrupted.

use anyhow::{bail, Context, Result};
use clap::Parser;
use rust_mca::acquisition::EffCalcMca;
use rust_mca::config::read_channels;
use rust_mca::nuclide::Nuclide;
use rust_mca::physics::MonteCarloEngine;
use rust_mca::registry::McaRegistry;
use rust_mca::server::LsrmServer;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Registry name of the single emulated device.
const DEVICE_NAME: &str = "effcalc_mca";

#[derive(Parser, Debug)]
#[command(
    name = "rust_mca",
    about = "emulate spectrum acquisition with the Monte-Carlo method and serve it as an LSRM MCA"
)]
struct Cli {
    /// Element Z, A, M (exactly three values, or none)
    #[arg(value_name = "Z_A_M", num_args = 0..=3)]
    positional: Vec<u32>,

    /// Nuclide as string, e.g. Co-60 or Cs-137m
    #[arg(short, long)]
    nuclide: Option<String>,

    /// Acquire time interval, s
    #[arg(short = 't', long = "time", default_value_t = 1)]
    time: u32,

    /// Seed for the random generator (0 = random seed)
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// LSRM server port
    #[arg(short, long, default_value_t = 23)]
    port: u16,

    /// Activity for the source in Bq
    #[arg(long, default_value_t = 1000.0)]
    activity: f64,

    /// Path to the calculation input deck carrying the channel count
    #[arg(long, default_value = "tccfcalc.in")]
    config: PathBuf,

    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,
}

/// Resolve the nuclide from positionals, `--nuclide`, or the default source.
fn nuclide_from_args(cli: &Cli) -> Result<Nuclide> {
    match cli.positional.as_slice() {
        [z, a, m] => Ok(Nuclide::new(*z, *a, *m)),
        [] => match &cli.nuclide {
            Some(text) => Ok(text.parse()?),
            None => Ok(Nuclide::default_source()),
        },
        _ => bail!("need 3 or 0 positional arguments"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if cli.time == 0 {
        bail!("acquire time interval must be positive");
    }
    if !cli.activity.is_finite() || cli.activity <= 0.0 {
        bail!("activity must be a positive number of Bq");
    }

    let nuclide = nuclide_from_args(&cli)?;
    info!(%nuclide, "configured source");

    let channels = read_channels(&cli.config)
        .with_context(|| format!("reading channel count from {}", cli.config.display()))?;

    // A prepare failure is fatal: no device gets registered.
    let engine = MonteCarloEngine::prepare(nuclide, channels, cli.seed)?;
    let mca = EffCalcMca::spawn(DEVICE_NAME, Box::new(engine), cli.time, cli.activity);
    let registry = Arc::new(McaRegistry::new().with_device(DEVICE_NAME, Arc::new(mca)));

    let listener = TcpListener::bind(("127.0.0.1", cli.port))
        .await
        .with_context(|| format!("binding LSRM server port {}", cli.port))?;
    let server = LsrmServer::new(Arc::clone(&registry));

    tokio::select! {
        result = server.serve(listener) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
            registry.shutdown_all();
        }
    }

    Ok(())
}
