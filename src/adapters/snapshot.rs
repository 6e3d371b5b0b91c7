//! Snapshot Protocol Adapters
//!
//! Serves markets, protocol metrics and wallet positions from a TOML market
//! snapshot instead of live RPC calls. One `SnapshotAdapter` is registered per
//! protocol; all of them share the same parsed snapshot.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::{ChainId, Opportunity, Position, Protocol, ProtocolMetrics};
use crate::ports::{AdapterError, ProtocolAdapter};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse snapshot: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid snapshot row: {0}")]
    Invalid(String),
}

/// One token market of one protocol on one chain
#[derive(Debug, Clone, Deserialize)]
pub struct MarketRow {
    pub protocol: Protocol,
    pub token: String,
    #[serde(default)]
    pub token_address: String,
    pub chain_id: ChainId,
    pub supply_apy: Decimal,
    #[serde(default)]
    pub borrow_apy: Option<Decimal>,
    pub tvl: Decimal,
    pub liquidity: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsRow {
    pub protocol: Protocol,
    pub chain_id: ChainId,
    pub tvl_usd: Decimal,
    #[serde(default)]
    pub total_borrows_usd: Option<Decimal>,
    pub available_liquidity_usd: Decimal,
    pub avg_supply_apy: Decimal,
    #[serde(default = "healthy")]
    pub is_healthy: bool,
}

fn healthy() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionRow {
    pub wallet: String,
    pub protocol: Protocol,
    pub token: String,
    #[serde(default)]
    pub token_address: String,
    pub chain_id: ChainId,
    pub amount: String,
    pub amount_formatted: Decimal,
    pub value_usd: Decimal,
    pub apy: Decimal,
    #[serde(default)]
    pub earned_yield: Option<Decimal>,
    #[serde(default)]
    pub deposited_at: Option<DateTime<Utc>>,
}

/// Parsed market snapshot file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketSnapshot {
    /// When the data was captured; opportunities carry this timestamp
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
    #[serde(default)]
    pub markets: Vec<MarketRow>,
    #[serde(default)]
    pub metrics: Vec<MetricsRow>,
    #[serde(default)]
    pub positions: Vec<PositionRow>,
}

impl MarketSnapshot {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SnapshotError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SnapshotError> {
        let snapshot: MarketSnapshot = toml::from_str(content)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    fn validate(&self) -> Result<(), SnapshotError> {
        for row in &self.markets {
            let label = format!("{} {} on chain {}", row.protocol, row.token, row.chain_id);
            if row.token.trim().is_empty() {
                return Err(SnapshotError::Invalid(format!("{}: empty token", row.protocol)));
            }
            if row.tvl < Decimal::ZERO || row.liquidity < Decimal::ZERO {
                return Err(SnapshotError::Invalid(format!("{}: negative TVL or liquidity", label)));
            }
        }
        for row in &self.metrics {
            if row.tvl_usd < Decimal::ZERO || row.available_liquidity_usd < Decimal::ZERO {
                return Err(SnapshotError::Invalid(format!(
                    "{} metrics on chain {}: negative TVL or liquidity",
                    row.protocol, row.chain_id
                )));
            }
        }
        for row in &self.positions {
            row.to_position()
                .map_err(|e| SnapshotError::Invalid(format!("{} position of {}: {}", row.protocol, row.wallet, e)))?;
        }
        Ok(())
    }

    /// One adapter per known protocol, sharing this snapshot
    pub fn adapters(self) -> Vec<Arc<dyn ProtocolAdapter>> {
        let shared = Arc::new(self);
        Protocol::ALL
            .into_iter()
            .map(|protocol| Arc::new(SnapshotAdapter::new(protocol, Arc::clone(&shared))) as Arc<dyn ProtocolAdapter>)
            .collect()
    }

    fn market(&self, protocol: Protocol, token: &str, chain_id: ChainId) -> Option<&MarketRow> {
        self.markets.iter().find(|row| {
            row.protocol == protocol && row.chain_id == chain_id && row.token.eq_ignore_ascii_case(token)
        })
    }
}

impl PositionRow {
    fn to_position(&self) -> Result<Position, crate::domain::PositionError> {
        let mut position = Position::new(
            self.protocol,
            self.token.clone(),
            self.token_address.clone(),
            self.chain_id,
            self.amount.clone(),
            self.amount_formatted,
            self.value_usd,
            self.apy,
        )?;
        if let Some(earned) = self.earned_yield {
            position = position.with_earned_yield(earned);
        }
        if let Some(at) = self.deposited_at {
            position = position.with_deposited_at(at);
        }
        Ok(position)
    }
}

/// Protocol adapter answering from a shared snapshot
#[derive(Debug, Clone)]
pub struct SnapshotAdapter {
    protocol: Protocol,
    snapshot: Arc<MarketSnapshot>,
}

impl SnapshotAdapter {
    pub fn new(protocol: Protocol, snapshot: Arc<MarketSnapshot>) -> Self {
        Self { protocol, snapshot }
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.snapshot.as_of.unwrap_or_else(Utc::now)
    }
}

#[async_trait]
impl ProtocolAdapter for SnapshotAdapter {
    fn protocol(&self) -> Protocol {
        self.protocol
    }

    fn supports_token(&self, token: &str, chain_id: ChainId) -> bool {
        self.snapshot.market(self.protocol, token, chain_id).is_some()
    }

    async fn market(&self, token: &str, chain_id: ChainId) -> Result<Opportunity, AdapterError> {
        let row = self
            .snapshot
            .market(self.protocol, token, chain_id)
            .ok_or_else(|| AdapterError::unsupported(token, chain_id))?;

        tracing::debug!("{} snapshot market {} on chain {}", self.protocol, row.token, chain_id);

        let mut opp = Opportunity::new(
            self.protocol,
            row.token.clone(),
            row.token_address.clone(),
            chain_id,
            row.supply_apy,
            row.tvl,
            row.liquidity,
        );
        opp.timestamp = self.timestamp();
        if let Some(borrow) = row.borrow_apy {
            opp = opp.with_borrow_apy(borrow);
        }
        Ok(opp)
    }

    async fn protocol_metrics(&self, chain_id: ChainId) -> Result<ProtocolMetrics, AdapterError> {
        let row = self
            .snapshot
            .metrics
            .iter()
            .find(|row| row.protocol == self.protocol && row.chain_id == chain_id)
            .ok_or_else(|| {
                AdapterError::Network(format!("no {} metrics for chain {}", self.protocol, chain_id))
            })?;

        Ok(ProtocolMetrics {
            protocol: self.protocol,
            chain_id,
            tvl_usd: row.tvl_usd,
            total_borrows_usd: row.total_borrows_usd,
            available_liquidity_usd: row.available_liquidity_usd,
            avg_supply_apy: row.avg_supply_apy,
            is_healthy: row.is_healthy,
            last_updated: self.timestamp(),
        })
    }

    async fn position(
        &self,
        wallet: &str,
        token: &str,
        chain_id: ChainId,
    ) -> Result<Option<Position>, AdapterError> {
        let row = self.snapshot.positions.iter().find(|row| {
            row.protocol == self.protocol
                && row.chain_id == chain_id
                && row.wallet.eq_ignore_ascii_case(wallet)
                && row.token.eq_ignore_ascii_case(token)
        });

        match row {
            Some(row) => row
                .to_position()
                .map(Some)
                .map_err(|e| AdapterError::Malformed(e.to_string())),
            None => Ok(None),
        }
    }
}
