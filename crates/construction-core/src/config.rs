//! Engine configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use chain_rvn::network::RvnNetwork;
use chain_rvn::script::ScriptKind;

use crate::error::ConstructionError;
use crate::logging::LogFormat;

/// Whether the engine may reach its collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Online,
    /// Metadata and Submit are refused; the pure phases still work.
    Offline,
}

/// Configuration for a construction engine.
///
/// Can be loaded from a TOML file via [`ConstructionConfig::from_toml_file`]
/// or built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstructionConfig {
    /// Which network to construct for.
    #[serde(default = "default_network")]
    pub network: RvnNetwork,

    #[serde(default = "default_mode")]
    pub mode: Mode,

    /// Address template returned by Derive.
    #[serde(default = "default_address_kind")]
    pub default_address_kind: ScriptKind,

    /// Blocks within which the node's fee estimate should confirm.
    #[serde(default = "default_confirmation_target")]
    pub confirmation_target: i64,

    /// How far below the tip the replay-protection block is taken.
    #[serde(default = "default_replay_protection_depth")]
    pub replay_protection_depth: i64,

    /// Bound on collaborator calls when the caller supplies none.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_network() -> RvnNetwork {
    RvnNetwork::Mainnet
}

fn default_mode() -> Mode {
    Mode::Online
}

fn default_address_kind() -> ScriptKind {
    ScriptKind::PayToPubkeyHash
}

fn default_confirmation_target() -> i64 {
    2
}

fn default_replay_protection_depth() -> i64 {
    100
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_log_format() -> LogFormat {
    LogFormat::Human
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ConstructionConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, ConstructionError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConstructionError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConstructionError> {
        let config: Self = toml::from_str(s).map_err(|e| ConstructionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ConstructionError> {
        toml::to_string_pretty(self).map_err(|e| ConstructionError::Config(e.to_string()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    fn validate(&self) -> Result<(), ConstructionError> {
        if self.confirmation_target < 1 {
            return Err(ConstructionError::Config(format!(
                "confirmation_target must be positive, got {}",
                self.confirmation_target
            )));
        }
        if self.replay_protection_depth < 0 {
            return Err(ConstructionError::Config(format!(
                "replay_protection_depth must not be negative, got {}",
                self.replay_protection_depth
            )));
        }
        Ok(())
    }
}

impl Default for ConstructionConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            mode: default_mode(),
            default_address_kind: default_address_kind(),
            confirmation_target: default_confirmation_target(),
            replay_protection_depth: default_replay_protection_depth(),
            request_timeout_ms: default_request_timeout_ms(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = ConstructionConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = ConstructionConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = ConstructionConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.network, RvnNetwork::Mainnet);
        assert_eq!(config.mode, Mode::Online);
        assert_eq!(config.confirmation_target, 2);
        assert_eq!(config.replay_protection_depth, 100);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.log_format, LogFormat::Human);
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            network = "testnet"
            mode = "offline"
            default_address_kind = "pay_to_witness_pubkey_hash"
            log_format = "json"
        "#;
        let config = ConstructionConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.network, RvnNetwork::Testnet);
        assert_eq!(config.mode, Mode::Offline);
        assert_eq!(config.default_address_kind, ScriptKind::PayToWitnessPubkeyHash);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.log_level, "info"); // default
    }

    #[test]
    fn unknown_network_is_config_error() {
        let err = ConstructionConfig::from_toml_str(r#"network = "regtest""#).unwrap_err();
        assert!(matches!(err, ConstructionError::Config(_)));
    }

    #[test]
    fn zero_confirmation_target_is_rejected() {
        assert!(ConstructionConfig::from_toml_str("confirmation_target = 0").is_err());
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = ConstructionConfig::from_toml_file("/nonexistent/construction.toml").unwrap_err();
        assert!(matches!(err, ConstructionError::Config(_)));
    }
}
