//! Configuration module for autodrain-server.
//!
//! Handles loading configuration from TOML files and CLI arguments, and
//! converting it into validated runtime structs.

pub mod file;
pub mod runtime;

use crate::config::file::{FileConfig, SinkModeConfig};
use crate::config::runtime::{
    EventsConfig, LedgerConfig, ReservePolicy, ServerConfig, WorkerPolicy,
};
use autodrain_core::config::BackoffPolicy;
use autodrain_core::events::SinkMode;
use autodrain_core::ledger::HorizonConfig;
use autodrain_core::utils::jitter::JitterRange;
use rust_decimal::Decimal;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub ledger: LedgerConfig,
    pub worker: WorkerPolicy,
    pub validation: ReservePolicy,
    pub events: EventsConfig,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// A missing file falls back to the defaults.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let mut file_config = match std::fs::read_to_string(&self.config_path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    path = %self.config_path.display(),
                    "Config file not found, using defaults"
                );
                FileConfig::default()
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        build_loaded_config(file_config)
    }
}

pub fn build_loaded_config(file_config: FileConfig) -> Result<LoadedConfig, ConfigError> {
    let FileConfig {
        server,
        ledger,
        worker,
        validation,
        events,
    } = file_config;

    let horizon_url = Url::parse(&ledger.horizon_url).map_err(|e| {
        ConfigError::ValidationError(format!("invalid horizon_url {:?}: {e}", ledger.horizon_url))
    })?;
    let derivation_path = ledger
        .derivation_path
        .parse()
        .map_err(|e| ConfigError::ValidationError(format!("{e}")))?;
    let horizon = HorizonConfig {
        base_url: horizon_url,
        network_passphrase: ledger.network_passphrase,
        tx_validity: Duration::from_secs(ledger.tx_validity_secs),
        fallback_base_fee: ledger.fallback_base_fee,
        http_timeout: Duration::from_secs(ledger.http_timeout_secs),
    };

    if worker.backoff_base_ms > worker.backoff_max_ms {
        return Err(ConfigError::ValidationError(format!(
            "backoff_base_ms ({}) exceeds backoff_max_ms ({})",
            worker.backoff_base_ms, worker.backoff_max_ms
        )));
    }
    let explorer = ledger.explorer_tx_url.trim();
    let policy = WorkerPolicy {
        idle_delay: Duration::from_millis(worker.idle_delay_ms),
        jitter: JitterRange::from_millis(worker.jitter_min_ms, worker.jitter_max_ms),
        warn_interval: Duration::from_secs(worker.warn_interval_secs),
        backoff: BackoffPolicy {
            base: Duration::from_millis(worker.backoff_base_ms),
            max: Duration::from_millis(worker.backoff_max_ms),
        },
        request_timeout: worker.request_timeout_ms.map(Duration::from_millis),
        explorer_tx_url: (!explorer.is_empty()).then(|| explorer.to_string()),
    };

    let minimum = parse_decimal("min_reserve", &validation.min_reserve)?;
    let default = parse_decimal("default_reserve", &validation.default_reserve)?;
    if minimum.is_sign_negative() {
        return Err(ConfigError::ValidationError(
            "min_reserve must not be negative".to_string(),
        ));
    }
    if default < minimum {
        return Err(ConfigError::ValidationError(format!(
            "default_reserve ({default}) is below min_reserve ({minimum})"
        )));
    }

    if events.buffer == 0 {
        return Err(ConfigError::ValidationError(
            "events.buffer must be positive".to_string(),
        ));
    }
    let mode = match events.mode {
        SinkModeConfig::Exclusive => SinkMode::Exclusive,
        SinkModeConfig::FanOut => SinkMode::FanOut,
    };

    Ok(LoadedConfig {
        server: ServerConfig {
            listen: server.listen,
            shutdown_grace: Duration::from_secs(server.shutdown_grace_secs),
        },
        ledger: LedgerConfig {
            horizon,
            derivation_path,
            mnemonic_passphrase: ledger.mnemonic_passphrase,
        },
        worker: policy,
        validation: ReservePolicy { minimum, default },
        events: EventsConfig {
            mode,
            buffer: events.buffer,
        },
    })
}

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, ConfigError> {
    Decimal::from_str(value.trim())
        .map_err(|e| ConfigError::ValidationError(format!("invalid {field} {value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_build() {
        let loaded = build_loaded_config(FileConfig::default()).unwrap();
        assert_eq!(loaded.validation.minimum, Decimal::ONE);
        assert_eq!(loaded.validation.default, Decimal::new(101, 2));
        assert_eq!(loaded.worker.warn_interval, Duration::from_secs(5));
        assert_eq!(loaded.worker.request_timeout, None);
        assert_eq!(loaded.events.mode, SinkMode::Exclusive);
        assert_eq!(
            loaded.worker.explorer_link("h").as_deref(),
            Some("https://blockexplorer.minepi.com/mainnet/transactions/h")
        );
        assert_eq!(loaded.ledger.derivation_path.indices(), &[44, 314159, 0]);
    }

    #[test]
    fn test_rejects_inconsistent_reserve() {
        let mut config = FileConfig::default();
        config.validation.default_reserve = "0.5".to_string();
        assert!(matches!(
            build_loaded_config(config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_rejects_bad_derivation_path() {
        let mut config = FileConfig::default();
        config.ledger.derivation_path = "m/44/0".to_string();
        assert!(build_loaded_config(config).is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let loader = ConfigLoader::new(
            "/nonexistent/autodrain.toml",
            Some("127.0.0.1:9999".parse().unwrap()),
        );
        let loaded = loader.load().unwrap();
        assert_eq!(loaded.server.listen.port(), 9999);
    }

    #[test]
    fn test_empty_explorer_disables_links() {
        let mut config = FileConfig::default();
        config.ledger.explorer_tx_url = " ".to_string();
        let loaded = build_loaded_config(config).unwrap();
        assert_eq!(loaded.worker.explorer_link("h"), None);
    }
}
