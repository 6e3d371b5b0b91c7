//! Scriptable adapters for tests and offline demos

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::protocol::{AdapterError, ProtocolAdapter};
use crate::domain::{ChainId, Opportunity, Position, Protocol, ProtocolMetrics};

#[derive(Debug, Clone, PartialEq)]
enum Script {
    Respond,
    Fail(AdapterError),
    Panic,
}

/// Mock protocol adapter that records calls and returns scripted data
///
/// Clones share the call log, so a test can keep one handle while the
/// aggregator owns another.
#[derive(Debug, Clone)]
pub struct MockProtocolAdapter {
    protocol: Protocol,
    markets: HashMap<(String, ChainId), Opportunity>,
    positions: HashMap<(String, String, ChainId), Position>,
    metrics: HashMap<ChainId, ProtocolMetrics>,
    unsupported: Vec<String>,
    script: Script,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<String>>>,
}

fn market_key(token: &str, chain_id: ChainId) -> (String, ChainId) {
    (token.to_ascii_uppercase(), chain_id)
}

fn position_key(wallet: &str, token: &str, chain_id: ChainId) -> (String, String, ChainId) {
    (wallet.to_ascii_lowercase(), token.to_ascii_uppercase(), chain_id)
}

impl MockProtocolAdapter {
    pub fn new(protocol: Protocol) -> Self {
        Self {
            protocol,
            markets: HashMap::new(),
            positions: HashMap::new(),
            metrics: HashMap::new(),
            unsupported: Vec::new(),
            script: Script::Respond,
            delay: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Builder method to serve an opportunity for its token/chain
    pub fn with_market(mut self, opportunity: Opportunity) -> Self {
        let key = market_key(&opportunity.token, opportunity.chain_id);
        self.markets.insert(key, opportunity);
        self
    }

    /// Shorthand for a market with `liquidity = tvl / 2`
    pub fn with_apy(self, token: &str, chain_id: ChainId, apy: Decimal, tvl: Decimal) -> Self {
        let protocol = self.protocol;
        let address = format!("0x{}", token.to_ascii_lowercase());
        self.with_market(Opportunity::new(
            protocol,
            token,
            address,
            chain_id,
            apy,
            tvl,
            tvl / Decimal::TWO,
        ))
    }

    pub fn with_position(mut self, wallet: &str, position: Position) -> Self {
        let key = position_key(wallet, &position.token, position.chain_id);
        self.positions.insert(key, position);
        self
    }

    pub fn with_metrics(mut self, metrics: ProtocolMetrics) -> Self {
        self.metrics.insert(metrics.chain_id, metrics);
        self
    }

    /// Report `supports_token == false` for this symbol
    pub fn without_token(mut self, token: &str) -> Self {
        self.unsupported.push(token.to_ascii_uppercase());
        self
    }

    /// Every async call fails with `error`
    pub fn with_failure(mut self, error: AdapterError) -> Self {
        self.script = Script::Fail(error);
        self
    }

    /// Every async call panics inside the adapter task
    pub fn panicking(mut self) -> Self {
        self.script = Script::Panic;
        self
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get all recorded calls, as "method:args"
    pub fn calls(&self) -> Vec<String> {
        self.log().clone()
    }

    pub fn call_count(&self) -> usize {
        self.log().len()
    }

    fn log(&self) -> MutexGuard<'_, Vec<String>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn enter(&self, call: String) -> Result<(), AdapterError> {
        self.log().push(call);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.script {
            Script::Respond => Ok(()),
            Script::Fail(error) => Err(error.clone()),
            Script::Panic => panic!("{} adapter panicked", self.protocol),
        }
    }
}

#[async_trait]
impl ProtocolAdapter for MockProtocolAdapter {
    fn protocol(&self) -> Protocol {
        self.protocol
    }

    fn supports_token(&self, token: &str, _chain_id: ChainId) -> bool {
        !self.unsupported.contains(&token.to_ascii_uppercase())
    }

    async fn market(&self, token: &str, chain_id: ChainId) -> Result<Opportunity, AdapterError> {
        self.enter(format!("market:{}:{}", token, chain_id)).await?;
        let mut opportunity = self
            .markets
            .get(&market_key(token, chain_id))
            .cloned()
            .ok_or_else(|| AdapterError::unsupported(token, chain_id))?;
        opportunity.timestamp = chrono::Utc::now();
        Ok(opportunity)
    }

    async fn protocol_metrics(&self, chain_id: ChainId) -> Result<ProtocolMetrics, AdapterError> {
        self.enter(format!("metrics:{}", chain_id)).await?;
        self.metrics
            .get(&chain_id)
            .cloned()
            .ok_or_else(|| AdapterError::Network(format!("no metrics for chain {}", chain_id)))
    }

    async fn position(
        &self,
        wallet: &str,
        token: &str,
        chain_id: ChainId,
    ) -> Result<Option<Position>, AdapterError> {
        self.enter(format!("position:{}:{}:{}", wallet, token, chain_id))
            .await?;
        Ok(self
            .positions
            .get(&position_key(wallet, token, chain_id))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_mock_serves_market_and_records_call() {
        let mock = MockProtocolAdapter::new(Protocol::Aave).with_apy("USDC", 1, dec!(4.5), dec!(1000));

        let opp = mock.market("usdc", 1).await.unwrap();
        assert_eq!(opp.supply_apy, dec!(4.5));
        assert_eq!(opp.liquidity, dec!(500));
        assert_eq!(mock.calls(), vec!["market:usdc:1".to_string()]);
    }

    #[tokio::test]
    async fn test_mock_default_apy_methods_go_through_market() {
        let mock = MockProtocolAdapter::new(Protocol::Morpho).with_apy("USDC", 1, dec!(6), dec!(10));

        assert_eq!(mock.supply_apy("USDC", 1).await.unwrap(), dec!(6));
        assert_eq!(mock.borrow_apy("USDC", 1).await.unwrap(), None);
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_unknown_market_is_unsupported() {
        let mock = MockProtocolAdapter::new(Protocol::Compound);
        let err = mock.market("DAI", 1).await.unwrap_err();
        assert_eq!(err, AdapterError::unsupported("DAI", 1));
    }

    #[tokio::test]
    async fn test_mock_scripted_failure() {
        let mock = MockProtocolAdapter::new(Protocol::Aave)
            .with_apy("USDC", 1, dec!(4.5), dec!(1000))
            .with_failure(AdapterError::Network("rpc down".into()));

        assert!(mock.market("USDC", 1).await.is_err());
        assert!(mock.position("0xabc", "USDC", 1).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_clones_share_call_log() {
        let mock = MockProtocolAdapter::new(Protocol::Aave);
        let handle = mock.clone();
        let _ = mock.position("0xABC", "USDC", 1).await;
        assert_eq!(handle.call_count(), 1);
    }
}
