//! Autodrain Server
//!
//! Runs one drain worker per configured account and exposes a WebSocket
//! control channel for starting, stopping and watching them.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use autodrain_core::events::EventSink;
use autodrain_core::keys::MnemonicDeriver;
use autodrain_core::ledger::HorizonLedger;
use autodrain_core::processors::Orchestrator;
use clap::Parser;
use config::ConfigLoader;
use server::{build_router, run_server};
use shutdown::{shutdown_signal, stop_workers};
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Autodrain - keeps accounts drained above a reserve
#[derive(Parser, Debug)]
#[command(name = "autodrain-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "AUTODRAIN_CONFIG", default_value = "./autodrain.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long, env = "AUTODRAIN_LISTEN")]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting autodrain-server v{}", env!("CARGO_PKG_VERSION"));

    let loaded = ConfigLoader::new(&args.config, args.listen)
        .load()
        .map_err(|e| {
            tracing::error!("Failed to load configuration: {}", e);
            e
        })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let listen_addr = loaded.server.listen;
    let grace = loaded.server.shutdown_grace;

    let sink = EventSink::new(loaded.events.mode, loaded.events.buffer);
    let ledger = Arc::new(HorizonLedger::new(loaded.ledger.horizon));
    let deriver = Arc::new(
        MnemonicDeriver::new(loaded.ledger.derivation_path)
            .with_passphrase(loaded.ledger.mnemonic_passphrase),
    );
    let orchestrator = Orchestrator::new(ledger, deriver, loaded.worker, sink);

    let state = AppState::new(orchestrator.clone(), loaded.validation, grace);
    let router = build_router(state);

    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr, shutdown_signal()).await;

    stop_workers(&orchestrator, grace).await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
///
/// `AUTODRAIN_LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,autodrain_core=debug,tower_http=debug"));
    let json = std::env::var("AUTODRAIN_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}
