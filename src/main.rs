//! Webhook fan-out relay.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────────┐
//!                          │                  WEBHOOK RELAY                   │
//!                          │                                                  │
//!   Webhook caller         │  ┌──────────┐   ┌─────────────┐                  │
//!   ───────────────────────┼─▶│  http    │──▶│   handler   │── 202 ───────────┼──▶ caller
//!                          │  │  server  │   │ method/loop │                  │
//!                          │  └──────────┘   └──────┬──────┘                  │
//!                          │                        │ detached               │
//!                          │                        ▼                        │
//!                          │                ┌──────────────┐   ┌──────────┐  │
//!                          │                │  dispatcher  │──▶│ headers  │  │
//!                          │                │  semaphore   │   │ + trace  │  │
//!                          │                └──────┬───────┘   └──────────┘  │
//!                          │                       │ one task per destination│
//!                          └───────────────────────┼─────────────────────────┘
//!                                                  ▼
//!                                    Destination A, B, ... (best-effort)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use webhook_relay::config::load_config;
use webhook_relay::forward::{Dispatcher, DispatcherConfig};
use webhook_relay::http::HttpServer;
use webhook_relay::lifecycle::{signals, Shutdown};
use webhook_relay::observability::{logging, metrics};
use webhook_relay::relay::resolve_relays;

#[derive(Parser)]
#[command(name = "webhook-relay")]
#[command(about = "Fan inbound webhooks out to multiple destinations", long_about = None)]
struct Cli {
    /// Path to the JSON or TOML config file.
    #[arg(short, long, env = "WEBHOOK_RELAY_CONFIG")]
    config: Option<PathBuf>,
}

/// Older deployments set this name instead of `WEBHOOK_RELAY_CONFIG`.
const LEGACY_CONFIG_ENV: &str = "WEBHOOKRELAY_CONFIG";

impl Cli {
    fn config_path(&self) -> Option<PathBuf> {
        self.config
            .clone()
            .or_else(|| std::env::var_os(LEGACY_CONFIG_ENV).map(PathBuf::from))
            .filter(|path| !path.as_os_str().is_empty())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let Some(config_path) = cli.config_path() else {
        eprintln!("missing config: pass --config or set WEBHOOK_RELAY_CONFIG");
        std::process::exit(2);
    };

    let config = match load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load config {}: {}", config_path.display(), e);
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.observability);
    tracing::info!("webhook-relay v{} starting", env!("CARGO_PKG_VERSION"));

    let relays = resolve_relays(&config).inspect_err(|e| {
        tracing::error!(error = %e, "Failed to resolve relays");
    })?;

    let dispatcher = Dispatcher::new(DispatcherConfig {
        concurrency: config.server.concurrency,
        forward_timeout: config.server.forward_timeout(),
    })?;

    tracing::info!(
        listen_addr = %config.server.listen_addr,
        relay_count = relays.len(),
        concurrency = dispatcher.concurrency(),
        forward_timeout_ms = dispatcher.forward_timeout().as_millis() as u64,
        "Configuration loaded"
    );
    for relay in &relays {
        let methods: Vec<&str> = relay.methods.iter().map(|m| m.as_str()).collect();
        tracing::info!(
            name = %relay.name,
            id = %relay.id,
            path = %relay.listen_path,
            methods = ?methods,
            destinations = relay.destinations.len(),
            "Relay registered"
        );
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.server.listen_addr).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_termination().await;
        shutdown.trigger();
    });

    let server = HttpServer::new(&config.server, relays, Arc::new(dispatcher.clone()));
    let result = server.run(listener, server_shutdown).await;

    // Attempts still waiting for a slot give up; running ones are not awaited.
    dispatcher.shutdown();

    result?;
    tracing::info!("Shutdown complete");
    Ok(())
}
