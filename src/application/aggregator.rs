//! Yield Aggregator
//!
//! Fans a request out to every registered protocol adapter, one tokio task
//! per adapter, and settles all of them. An adapter that errors, panics or
//! exceeds `adapter_timeout` becomes an entry in the result's error map; the
//! other adapters' answers are unaffected.

use futures::future::join_all;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::error::{require_chain, require_token, require_wallet, EngineError};
use crate::domain::math::weighted_average;
use crate::domain::{
    filter, round2, sort_by_apy_descending, AggregatedMetrics, AggregationResult, ChainId,
    Opportunity, OpportunityFilter, PositionSummary, Protocol, ProtocolComparison,
    ProtocolMetrics, SortKey,
};
use crate::ports::{AdapterError, ProtocolAdapter};

/// Aggregator tuning
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorConfig {
    /// Tokens scanned by `get_all_positions` when none are given
    pub default_tokens: Vec<String>,
    /// Per-adapter deadline for one call
    pub adapter_timeout: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            default_tokens: vec!["USDC".to_string(), "USDT".to_string()],
            adapter_timeout: Duration::from_secs(10),
        }
    }
}

impl AggregatorConfig {
    pub fn with_default_tokens(mut self, tokens: Vec<String>) -> Self {
        self.default_tokens = tokens;
        self
    }

    pub fn with_adapter_timeout(mut self, timeout: Duration) -> Self {
        self.adapter_timeout = timeout;
        self
    }
}

/// Successful answers plus the failure reason per protocol
type Settled<T> = (Vec<(Protocol, T)>, BTreeMap<Protocol, String>);

/// Combines yield data from every registered protocol adapter
pub struct YieldAggregator {
    adapters: BTreeMap<Protocol, Arc<dyn ProtocolAdapter>>,
    config: AggregatorConfig,
}

impl YieldAggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self {
            adapters: BTreeMap::new(),
            config,
        }
    }

    /// Register an adapter; a later adapter for the same protocol replaces the earlier one
    pub fn with_adapter(mut self, adapter: Arc<dyn ProtocolAdapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn register(&mut self, adapter: Arc<dyn ProtocolAdapter>) {
        let protocol = adapter.protocol();
        if self.adapters.insert(protocol, adapter).is_some() {
            tracing::debug!("Replaced adapter for {}", protocol);
        }
    }

    /// Registered protocols, in registry order
    pub fn protocols(&self) -> Vec<Protocol> {
        self.adapters.keys().copied().collect()
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Query every adapter admitted by `filter` and sort the answers by APY
    ///
    /// Adapter failures land in `errors`; only bad caller input is an `Err`.
    /// The filter's thresholds and limit are applied after the fan-out, and
    /// the result is always ordered by supply APY.
    pub async fn fetch_all_opportunities(
        &self,
        token: &str,
        chain_id: ChainId,
        filter: Option<&OpportunityFilter>,
    ) -> Result<AggregationResult, EngineError> {
        require_token(token)?;
        require_chain(chain_id)?;

        let selected: Vec<Arc<dyn ProtocolAdapter>> = self
            .adapters
            .iter()
            .filter(|(protocol, _)| filter.map_or(true, |f| f.includes_protocol(**protocol)))
            .map(|(_, adapter)| Arc::clone(adapter))
            .collect();

        let (answers, errors) = self.market_fan_out(selected, token, chain_id).await;
        let successful = answers.len();

        let mut opportunities: Vec<Opportunity> = answers.into_iter().map(|(_, opp)| opp).collect();
        for opp in &opportunities {
            if opp.has_liquidity_anomaly() {
                tracing::warn!(
                    "{} {} reports liquidity {} above TVL {}",
                    opp.protocol,
                    opp.token,
                    opp.liquidity,
                    opp.tvl
                );
            }
        }

        opportunities = match filter {
            Some(f) => {
                let by_apy = OpportunityFilter {
                    sort_by: SortKey::Apy,
                    ..f.clone()
                };
                crate::domain::filter(&opportunities, &by_apy)
            }
            None => sort_by_apy_descending(opportunities),
        };

        let result = AggregationResult::from_sorted(token, chain_id, opportunities, successful, errors);
        tracing::info!(
            "{} on chain {}: {} opportunities, {} ok / {} failed",
            token,
            chain_id,
            result.opportunities.len(),
            result.successful_protocols,
            result.failed_protocols
        );
        Ok(result)
    }

    /// Highest-APY opportunity across all adapters
    pub async fn get_best_opportunity(
        &self,
        token: &str,
        chain_id: ChainId,
    ) -> Result<Option<Opportunity>, EngineError> {
        Ok(self.fetch_all_opportunities(token, chain_id, None).await?.best)
    }

    /// Every position `wallet` holds in `tokens` (or the default set)
    ///
    /// Markets where the wallet holds nothing, and lookups that fail, are
    /// skipped.
    pub async fn get_all_positions(
        &self,
        wallet: &str,
        chain_id: ChainId,
        tokens: Option<&[String]>,
    ) -> Result<PositionSummary, EngineError> {
        require_wallet(wallet)?;
        require_chain(chain_id)?;
        let tokens = tokens.unwrap_or(self.config.default_tokens.as_slice());
        if tokens.is_empty() {
            return Err(EngineError::invalid("token list must not be empty"));
        }
        for token in tokens {
            require_token(token)?;
        }

        // Symbols are case-insensitive; each market is looked up once
        let mut seen = HashSet::new();
        let unique: Vec<&String> = tokens
            .iter()
            .filter(|token| seen.insert(token.trim().to_ascii_uppercase()))
            .collect();

        let lookups = unique.into_iter().map(|token| {
            let adapters: Vec<_> = self.adapters.values().cloned().collect();
            let wallet = wallet.to_string();
            let token = token.clone();
            self.settle_all(adapters, Some(token.clone()), chain_id, move |adapter| {
                let wallet = wallet.clone();
                let token = token.clone();
                async move { adapter.position(&wallet, &token, chain_id).await }
            })
        });

        let mut positions = Vec::new();
        for (answers, errors) in join_all(lookups).await {
            for (protocol, reason) in errors {
                tracing::warn!("Skipping {} position lookup: {}", protocol, reason);
            }
            positions.extend(answers.into_iter().filter_map(|(_, position)| position));
        }

        let summary = PositionSummary::from_positions(positions);
        tracing::info!(
            "{} positions for {} on chain {}, total ${}",
            summary.positions.len(),
            wallet,
            chain_id,
            summary.total_value_usd
        );
        Ok(summary)
    }

    /// Protocol-wide TVL, liquidity and APY roll-up for one chain
    pub async fn get_aggregated_metrics(&self, chain_id: ChainId) -> Result<AggregatedMetrics, EngineError> {
        require_chain(chain_id)?;

        let adapters: Vec<_> = self.adapters.values().cloned().collect();
        let total_protocol_count = adapters.len();
        let (answers, errors) = self
            .settle_all(adapters, None, chain_id, move |adapter| async move {
                adapter.protocol_metrics(chain_id).await
            })
            .await;

        let protocol_metrics: Vec<ProtocolMetrics> = answers.into_iter().map(|(_, m)| m).collect();

        let total_tvl_usd: Decimal = protocol_metrics.iter().map(|m| m.tvl_usd).sum();
        let total_available_liquidity_usd: Decimal =
            protocol_metrics.iter().map(|m| m.available_liquidity_usd).sum();
        let weighted_avg_supply_apy =
            weighted_average(protocol_metrics.iter().map(|m| (m.tvl_usd, m.avg_supply_apy)));

        // Strictly greater: first protocol wins ties, zero APY names no winner
        let mut best_supply_apy = Decimal::ZERO;
        let mut best_protocol = None;
        for metrics in &protocol_metrics {
            if metrics.avg_supply_apy > best_supply_apy {
                best_supply_apy = metrics.avg_supply_apy;
                best_protocol = Some(metrics.protocol);
            }
        }

        let healthy_protocol_count = protocol_metrics.iter().filter(|m| m.is_healthy).count();

        Ok(AggregatedMetrics {
            chain_id,
            total_tvl_usd: round2(total_tvl_usd),
            total_available_liquidity_usd: round2(total_available_liquidity_usd),
            weighted_avg_supply_apy: round2(weighted_avg_supply_apy),
            best_supply_apy,
            best_protocol,
            healthy_protocol_count,
            total_protocol_count,
            protocol_metrics,
            errors,
            timestamp: chrono::Utc::now(),
        })
    }

    /// Head-to-head on one market, querying only `a` and `b`
    pub async fn compare_protocols(
        &self,
        token: &str,
        chain_id: ChainId,
        a: Protocol,
        b: Protocol,
    ) -> Result<ProtocolComparison, EngineError> {
        if a == b {
            return Err(EngineError::invalid(format!("cannot compare {} with itself", a)));
        }

        let pair = OpportunityFilter::new().with_protocols(vec![a, b]);
        let result = self.fetch_all_opportunities(token, chain_id, Some(&pair)).await?;

        let find = |p: Protocol| result.opportunities.iter().find(|o| o.protocol == p).cloned();
        let protocol1 = find(a);
        let protocol2 = find(b);

        let (winner, apy_difference) = match (&protocol1, &protocol2) {
            (None, None) => (a, Decimal::ZERO),
            (Some(o1), None) => (a, o1.supply_apy),
            (None, Some(o2)) => (b, o2.supply_apy),
            (Some(o1), Some(o2)) => {
                let winner = if o1.supply_apy >= o2.supply_apy { a } else { b };
                (winner, (o1.supply_apy - o2.supply_apy).abs())
            }
        };

        Ok(ProtocolComparison {
            winner,
            apy_difference,
            protocol1,
            protocol2,
        })
    }

    /// Opportunities for several tokens, flattened and sorted by APY
    pub async fn fetch_opportunities_for_tokens(
        &self,
        tokens: &[String],
        chain_id: ChainId,
    ) -> Result<Vec<Opportunity>, EngineError> {
        if tokens.is_empty() {
            return Err(EngineError::invalid("token list must not be empty"));
        }
        for token in tokens {
            require_token(token)?;
        }
        require_chain(chain_id)?;

        let results = join_all(
            tokens
                .iter()
                .map(|token| self.fetch_all_opportunities(token, chain_id, None)),
        )
        .await;

        let mut all = Vec::new();
        for result in results {
            all.extend(result?.opportunities);
        }
        Ok(sort_by_apy_descending(all))
    }

    /// Sorted, filtered opportunity list without the aggregation envelope
    pub async fn leaderboard(
        &self,
        token: &str,
        chain_id: ChainId,
        opportunity_filter: &OpportunityFilter,
    ) -> Result<Vec<Opportunity>, EngineError> {
        let result = self.fetch_all_opportunities(token, chain_id, None).await?;
        Ok(filter(&result.opportunities, opportunity_filter))
    }

    async fn market_fan_out(
        &self,
        adapters: Vec<Arc<dyn ProtocolAdapter>>,
        token: &str,
        chain_id: ChainId,
    ) -> Settled<Opportunity> {
        let token_owned = token.to_string();
        self.settle_all(adapters, Some(token.to_string()), chain_id, move |adapter| {
            let token = token_owned.clone();
            async move { adapter.market(&token, chain_id).await }
        })
        .await
    }

    /// Run `call` against every adapter on its own task and settle all of them
    ///
    /// With `token` set, adapters that do not support it are recorded as
    /// `Unsupported` without being called.
    async fn settle_all<T, F, Fut>(
        &self,
        adapters: Vec<Arc<dyn ProtocolAdapter>>,
        token: Option<String>,
        chain_id: ChainId,
        call: F,
    ) -> Settled<T>
    where
        T: Send + 'static,
        F: Fn(Arc<dyn ProtocolAdapter>) -> Fut,
        Fut: Future<Output = Result<T, AdapterError>> + Send + 'static,
    {
        let timeout = self.config.adapter_timeout;
        let mut errors = BTreeMap::new();
        let mut protocols = Vec::with_capacity(adapters.len());
        let mut handles = Vec::with_capacity(adapters.len());

        for adapter in adapters {
            let protocol = adapter.protocol();
            if let Some(token) = &token {
                if !adapter.supports_token(token, chain_id) {
                    let err = AdapterError::unsupported(token, chain_id);
                    tracing::warn!("{} skipped: {}", protocol, err);
                    errors.insert(protocol, err.to_string());
                    continue;
                }
            }

            tracing::debug!("Querying {} on chain {}", protocol, chain_id);
            let fut = call(adapter);
            protocols.push(protocol);
            handles.push(tokio::spawn(async move {
                match tokio::time::timeout(timeout, fut).await {
                    Ok(result) => result,
                    Err(_) => Err(AdapterError::Timeout(timeout)),
                }
            }));
        }

        let mut answers = Vec::with_capacity(handles.len());
        for (protocol, joined) in protocols.into_iter().zip(join_all(handles).await) {
            let outcome = match joined {
                Ok(result) => result,
                Err(join_err) if join_err.is_panic() => {
                    Err(AdapterError::Internal("adapter panicked".to_string()))
                }
                Err(join_err) => Err(AdapterError::Internal(join_err.to_string())),
            };

            match outcome {
                Ok(value) => answers.push((protocol, value)),
                Err(err) => {
                    tracing::warn!("{} failed on chain {}: {}", protocol, chain_id, err);
                    errors.insert(protocol, err.to_string());
                }
            }
        }

        (answers, errors)
    }
}
