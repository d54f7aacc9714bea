//! Mainline HTTP server binary.
//!
//! Opens the graph store, then serves the analysis API until interrupted.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use mainline::config::parse_database_url;
use mainline::{MainlineConfig, Network, Store};
use mainline_http::{AppState, router};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Serve mainline network analysis over HTTP.
#[derive(Parser)]
#[command(name = "mainline-http")]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Graph store location (`sqlite://path` or a path)
    #[arg(short, long)]
    database: Option<String>,

    /// Address to listen on; overrides `server.bind`
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => MainlineConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => MainlineConfig::default(),
    };
    let database = match &args.database {
        Some(url) => parse_database_url(url)?,
        None => config.database_path()?,
    };
    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());

    let store = Store::open(&database)
        .with_context(|| format!("opening graph store {}", database.display()))?;
    let network = Network::with_store(store, config)?;
    let status = network.status()?;
    if !status.graph_loaded {
        tracing::warn!("No graph loaded; run `mainline build` to enable graph queries");
    }

    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    tracing::info!(
        address = %listener.local_addr()?,
        edges = status.edge_count,
        "Starting mainline-http"
    );

    axum::serve(listener, router(AppState::new(network)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
