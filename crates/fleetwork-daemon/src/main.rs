//! fleetwork daemon
//!
//! Runs the execution controller against an in-memory control plane,
//! optionally seeded from a JSON file, and serves `/healthz` and
//! `/metrics`.

use clap::Parser;
use fleetwork_daemon::{DaemonConfig, DaemonError, DaemonResult, Seed, Server};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// fleetwork daemon CLI
#[derive(Parser)]
#[command(name = "fleetworkd")]
#[command(about = "fleetwork - Work execution controller daemon", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "FLEETWORK_CONFIG")]
    config: Option<String>,

    /// Listen address for health and metrics
    #[arg(short, long, env = "FLEETWORK_LISTEN_ADDR")]
    listen: Option<String>,

    /// JSON file with clusters and Works to load at startup
    #[arg(short, long, env = "FLEETWORK_SEED")]
    seed: Option<String>,

    /// Log level
    #[arg(long, env = "FLEETWORK_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "FLEETWORK_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    let mut config =
        DaemonConfig::load(cli.config.as_deref()).map_err(|e| DaemonError::Config(e.to_string()))?;

    // CLI overrides
    if let Some(listen) = &cli.listen {
        config.server.listen_addr = listen
            .parse()
            .map_err(|e| DaemonError::Config(format!("Invalid listen address: {}", e)))?;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let seed = cli.seed.as_deref().map(Seed::load).transpose()?;
    if let Some(seed) = &seed {
        info!(
            clusters = seed.clusters.len(),
            works = seed.works.len(),
            "Loaded seed"
        );
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.server.listen_addr,
        workers = config.execution.workers,
        "Starting fleetwork daemon"
    );

    let server = Server::new(config, seed).await?;
    server.run().await
}
