use async_trait::async_trait;
use rust_decimal::Decimal;
use std::time::Duration;
use thiserror::Error;

use crate::domain::{ChainId, Opportunity, Position, Protocol, ProtocolMetrics};

/// Protocol adapter error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdapterError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Unsupported market: {token} on chain {chain_id}")]
    Unsupported { token: String, chain_id: ChainId },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Adapter task failed: {0}")]
    Internal(String),
}

impl AdapterError {
    pub fn unsupported(token: &str, chain_id: ChainId) -> Self {
        AdapterError::Unsupported {
            token: token.to_string(),
            chain_id,
        }
    }
}

/// One yield source the aggregator can query
///
/// Implementations are registered as `Arc<dyn ProtocolAdapter>` and called
/// from spawned tasks, so every method takes owned-or-borrowed plain data and
/// the adapter itself must be `Send + Sync`.
#[async_trait]
pub trait ProtocolAdapter: Send + Sync {
    fn protocol(&self) -> Protocol;

    /// Cheap local check; `false` means the market will not be queried
    fn supports_token(&self, token: &str, chain_id: ChainId) -> bool;

    async fn supply_apy(&self, token: &str, chain_id: ChainId) -> Result<Decimal, AdapterError> {
        self.market(token, chain_id).await.map(|m| m.supply_apy)
    }

    /// `Ok(None)` for sources without a borrow side
    async fn borrow_apy(&self, token: &str, chain_id: ChainId) -> Result<Option<Decimal>, AdapterError> {
        self.market(token, chain_id).await.map(|m| m.borrow_apy)
    }

    /// Normalized opportunity with pool metrics
    async fn market(&self, token: &str, chain_id: ChainId) -> Result<Opportunity, AdapterError>;

    async fn protocol_metrics(&self, chain_id: ChainId) -> Result<ProtocolMetrics, AdapterError>;

    /// `Ok(None)` when the wallet holds nothing in this market
    async fn position(
        &self,
        wallet: &str,
        token: &str,
        chain_id: ChainId,
    ) -> Result<Option<Position>, AdapterError>;
}
