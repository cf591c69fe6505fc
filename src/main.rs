//! Gateway entry point.
//!
//! Startup order: configuration first, then observability, then the core,
//! and the listener last so traffic only arrives once everything is ready.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use edge_gateway::config::{load_config, ConfigWatcher, GatewayConfig};
use edge_gateway::lifecycle::{signals, Shutdown};
use edge_gateway::observability::metrics;
use edge_gateway::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "edge-gateway", about = "Health-aware reverse-proxy traffic router", version)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Watch the configuration file and hot-reload on change.
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!(
                    "edge_gateway={},tower_http=info",
                    config.observability.log_level
                ))
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        bind_address = %config.listener.bind_address,
        backends = config.backends.len(),
        blocked_ips = config.policy.blocked_ips.len(),
        path_prefix = %config.proxy.path_prefix,
        "configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => {
                tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    "failed to parse metrics address"
                );
            }
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(&shutdown);

    // The watcher handle must outlive the server for the watch to stay
    // registered.
    let mut _watcher_guard = None;
    let config_updates = match (&cli.config, cli.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            _watcher_guard = Some(watcher.run()?);
            updates
        }
        (None, true) => {
            tracing::warn!("--watch has no effect without --config");
            closed_channel()
        }
        _ => closed_channel(),
    };

    let server = HttpServer::new(config);
    server
        .run(listener, config_updates, shutdown.subscribe())
        .await?;

    tracing::info!("shutdown complete");
    Ok(())
}

/// A receiver with no sender; the reload task sees it as already drained.
fn closed_channel() -> mpsc::UnboundedReceiver<GatewayConfig> {
    let (_tx, rx) = mpsc::unbounded_channel();
    rx
}
