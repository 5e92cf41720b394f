//! Validated runtime configuration.
//!
//! Worker and ledger types come from `autodrain-core`; only the pieces that
//! belong to the server itself are defined here.

use autodrain_core::events::SinkMode;
use autodrain_core::keys::DerivationPath;
use autodrain_core::ledger::HorizonConfig;
use std::net::SocketAddr;
use std::time::Duration;

pub use autodrain_core::config::WorkerPolicy;
pub use autodrain_sdk::objects::ReservePolicy;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub shutdown_grace: Duration,
}

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub horizon: HorizonConfig,
    pub derivation_path: DerivationPath,
    pub mnemonic_passphrase: String,
}

#[derive(Debug, Clone, Copy)]
pub struct EventsConfig {
    pub mode: SinkMode,
    pub buffer: usize,
}
