//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching config/engine.toml.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::adapters::oracle::StaticOracleConfig;
use crate::application::{AggregatorConfig, MultiChainConfig};
use crate::domain::{Protocol, RebalanceConfig, RiskLevel, RiskProfile};
use crate::strategy::OptimizerParams;

/// Main configuration structure matching config/engine.toml
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub aggregator: AggregatorSection,
    #[serde(default)]
    pub optimizer: OptimizerParams,
    #[serde(default)]
    pub rebalance: RebalanceConfig,
    #[serde(default)]
    pub risk: RiskSection,
    #[serde(default)]
    pub oracle: StaticOracleConfig,
    #[serde(default)]
    pub multi_chain: MultiChainConfig,
    pub snapshot: SnapshotSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Aggregator configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AggregatorSection {
    /// Tokens scanned when a position query names none
    pub default_tokens: Vec<String>,
    /// Per-adapter deadline in milliseconds
    pub adapter_timeout_ms: u64,
}

impl Default for AggregatorSection {
    fn default() -> Self {
        let defaults = AggregatorConfig::default();
        Self {
            default_tokens: defaults.default_tokens,
            adapter_timeout_ms: u64::try_from(defaults.adapter_timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Default risk profile section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RiskSection {
    pub level: RiskLevel,
    /// Overrides the level's TVL floor
    pub min_protocol_tvl: Option<Decimal>,
    pub preferred_protocols: Option<Vec<Protocol>>,
    pub excluded_protocols: Option<Vec<Protocol>>,
}

/// Market snapshot section
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotSection {
    /// TOML file with markets, protocol metrics and positions
    pub path: String,
}

impl SnapshotSection {
    /// Get snapshot path with environment variable override
    /// Checks YIELD_SNAPSHOT_PATH env var first, falls back to config value
    pub fn get_path(&self) -> PathBuf {
        let raw = std::env::var("YIELD_SNAPSHOT_PATH").unwrap_or_else(|_| self.path.clone());
        PathBuf::from(shellexpand::tilde(&raw).to_string())
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let expanded = shellexpand::tilde(&path.as_ref().to_string_lossy()).to_string();
    let content = std::fs::read_to_string(expanded)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Aggregator
        if self.aggregator.default_tokens.is_empty() {
            return Err(ConfigError::ValidationError(
                "default_tokens cannot be empty".to_string(),
            ));
        }
        if self.aggregator.default_tokens.iter().any(|t| t.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "default_tokens cannot contain blank symbols".to_string(),
            ));
        }
        if self.aggregator.adapter_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "adapter_timeout_ms must be > 0".to_string(),
            ));
        }

        // Optimizer
        self.optimizer
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        // Rebalance
        if self.rebalance.min_apy_delta < Decimal::ZERO {
            return Err(ConfigError::ValidationError(format!(
                "min_apy_delta must be >= 0, got {}",
                self.rebalance.min_apy_delta
            )));
        }
        if self.rebalance.max_gas_cost_usd < Decimal::ZERO {
            return Err(ConfigError::ValidationError(format!(
                "max_gas_cost_usd must be >= 0, got {}",
                self.rebalance.max_gas_cost_usd
            )));
        }

        // Risk
        if let Some(tvl) = self.risk.min_protocol_tvl {
            if tvl < Decimal::ZERO {
                return Err(ConfigError::ValidationError(format!(
                    "min_protocol_tvl must be >= 0, got {}",
                    tvl
                )));
            }
        }

        // Oracle
        self.oracle.validate().map_err(ConfigError::ValidationError)?;

        // Multi-chain
        if self.multi_chain.chains.is_empty() || self.multi_chain.chains.contains(&0) {
            return Err(ConfigError::ValidationError(
                "multi_chain.chains must list non-zero chain ids".to_string(),
            ));
        }
        if self.multi_chain.default_position_size_usd <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(format!(
                "default_position_size_usd must be > 0, got {}",
                self.multi_chain.default_position_size_usd
            )));
        }
        if self.multi_chain.default_hold_period_days == 0 {
            return Err(ConfigError::ValidationError(
                "default_hold_period_days must be > 0".to_string(),
            ));
        }
        if self.multi_chain.min_protocol_tvl < Decimal::ZERO {
            return Err(ConfigError::ValidationError(format!(
                "multi_chain.min_protocol_tvl must be >= 0, got {}",
                self.multi_chain.min_protocol_tvl
            )));
        }

        // Snapshot
        if self.snapshot.path.is_empty() {
            return Err(ConfigError::ValidationError(
                "snapshot path cannot be empty".to_string(),
            ));
        }

        // Logging
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging level must be one of {:?}, got {}",
                LOG_LEVELS, self.logging.level
            )));
        }

        Ok(())
    }

    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig::default()
            .with_default_tokens(self.aggregator.default_tokens.clone())
            .with_adapter_timeout(Duration::from_millis(self.aggregator.adapter_timeout_ms))
    }

    pub fn risk_profile(&self) -> RiskProfile {
        RiskProfile {
            level: self.risk.level,
            preferred_protocols: self.risk.preferred_protocols.clone(),
            excluded_protocols: self.risk.excluded_protocols.clone(),
            min_protocol_tvl: self.risk.min_protocol_tvl,
        }
    }
}
