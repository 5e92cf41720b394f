//! TOML file configuration structures.
//!
//! These structs directly map to the `autodrain.toml` file format. Every
//! field has a default, so an empty file is valid.

use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub server: ServerConfig,
    pub ledger: LedgerConfig,
    pub worker: WorkerConfig,
    pub validation: ValidationConfig,
    pub events: EventsConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:3000").
    pub listen: SocketAddr,
    /// How long shutdown waits for workers to finish their iteration.
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 3000)),
            shutdown_grace_secs: 10,
        }
    }
}

/// Remote ledger and key derivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub horizon_url: String,
    pub network_passphrase: String,
    pub derivation_path: String,
    /// Optional BIP-39 passphrase applied to every mnemonic.
    pub mnemonic_passphrase: String,
    pub tx_validity_secs: u64,
    pub fallback_base_fee: u32,
    pub http_timeout_secs: u64,
    /// Prefix for transaction links in success logs. Empty disables links.
    pub explorer_tx_url: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            horizon_url: "https://apimainnet.vercel.app".to_string(),
            network_passphrase: "Pi Network".to_string(),
            derivation_path: "m/44'/314159'/0'".to_string(),
            mnemonic_passphrase: String::new(),
            tx_validity_secs: 30,
            fallback_base_fee: 100,
            http_timeout_secs: 30,
            explorer_tx_url: "https://blockexplorer.minepi.com/mainnet/transactions".to_string(),
        }
    }
}

/// Worker pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub idle_delay_ms: u64,
    pub jitter_min_ms: u64,
    pub jitter_max_ms: u64,
    pub warn_interval_secs: u64,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    /// Per-call ledger timeout. Unset means no limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            idle_delay_ms: 100,
            jitter_min_ms: 50,
            jitter_max_ms: 800,
            warn_interval_secs: 5,
            backoff_base_ms: 100,
            backoff_max_ms: 5000,
            request_timeout_ms: None,
        }
    }
}

/// Bounds on the reserve amount sent by clients. Decimal strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub min_reserve: String,
    pub default_reserve: String,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_reserve: "1.0".to_string(),
            default_reserve: "1.01".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkModeConfig {
    #[default]
    Exclusive,
    FanOut,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub mode: SinkModeConfig,
    pub buffer: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            mode: SinkModeConfig::default(),
            buffer: 256,
        }
    }
}
