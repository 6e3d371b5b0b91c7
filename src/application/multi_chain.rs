//! Multi-Chain Optimizer
//!
//! Evaluates the same token on every configured chain, splits the position
//! across each chain's protocols according to the risk level and picks the
//! chain with the best yield after gas.

use chrono::Utc;
use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::aggregator::YieldAggregator;
use super::error::{require_positive, require_token, EngineError};
use crate::domain::allocation::{allocate, blended_apy, net_apy, weighted_gas_cost};
use crate::domain::math::HUNDRED;
use crate::domain::protocol::{ARBITRUM, BASE, ETHEREUM, POLYGON};
use crate::domain::{
    chain_name, gas_cost_usd, round2, ChainId, ChainOpportunity, ChainResult, GasSummary,
    MultiChainResult, OpportunityFilter, ProtocolAllocation, RiskLevel, TargetApyRange,
};
use crate::ports::GasOracle;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiChainConfig {
    pub chains: Vec<ChainId>,
    /// Protocols below this TVL are left out of every allocation
    pub min_protocol_tvl: Decimal,
    pub default_position_size_usd: Decimal,
    pub default_hold_period_days: u32,
}

impl Default for MultiChainConfig {
    fn default() -> Self {
        Self {
            chains: vec![ETHEREUM, BASE, ARBITRUM, POLYGON],
            min_protocol_tvl: dec!(10000000),
            default_position_size_usd: dec!(10000),
            default_hold_period_days: 30,
        }
    }
}

/// Finds the chain and protocol split with the best net yield
pub struct MultiChainOptimizer {
    aggregator: Arc<YieldAggregator>,
    oracle: Arc<dyn GasOracle>,
    config: MultiChainConfig,
}

impl MultiChainOptimizer {
    pub fn new(aggregator: Arc<YieldAggregator>, oracle: Arc<dyn GasOracle>) -> Self {
        Self {
            aggregator,
            oracle,
            config: MultiChainConfig::default(),
        }
    }

    pub fn with_config(mut self, config: MultiChainConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &MultiChainConfig {
        &self.config
    }

    /// Evaluate every configured chain and recommend the best one
    ///
    /// Chains whose data cannot be fetched, or that have nothing above the
    /// TVL floor, are skipped.
    pub async fn optimize_across_chains(
        &self,
        token: &str,
        risk_level: RiskLevel,
        position_size_usd: Decimal,
        hold_period_days: u32,
    ) -> Result<MultiChainResult, EngineError> {
        require_token(token)?;
        require_positive("position size", position_size_usd)?;
        if hold_period_days == 0 {
            return Err(EngineError::invalid("hold period must be at least one day"));
        }

        let evaluations = self.config.chains.iter().map(|chain_id| {
            self.evaluate_chain(token, *chain_id, risk_level, position_size_usd, hold_period_days)
        });
        let mut chain_results: Vec<ChainResult> =
            join_all(evaluations).await.into_iter().flatten().collect();

        // First configured chain wins ties
        let mut best_index: Option<usize> = None;
        for (index, result) in chain_results.iter().enumerate() {
            let better = best_index.map_or(true, |b| result.net_apy > chain_results[b].net_apy);
            if better {
                best_index = Some(index);
            }
        }
        let Some(best_index) = best_index else {
            tracing::warn!("No chain produced an allocation for {} ({})", token, risk_level);
            return Err(EngineError::NoOpportunities {
                token: token.to_string(),
                risk_level,
            });
        };
        chain_results[best_index].is_recommended = true;
        let best = &chain_results[best_index];

        let target = TargetApyRange::for_level(risk_level);
        let confidence = chain_confidence(best, &target, position_size_usd);
        let gas_estimate = gas_summary(best);

        tracing::info!(
            "Best chain for {} {} ${}: {} at {}% net ({}% blended, confidence {})",
            risk_level,
            token,
            position_size_usd,
            best.chain_name,
            best.net_apy,
            best.blended_apy,
            confidence
        );

        Ok(MultiChainResult {
            token: token.to_string(),
            risk_level,
            position_size_usd,
            hold_period_days,
            best_chain_id: best.chain_id,
            best_chain_name: best.chain_name.clone(),
            allocation: best.allocation.clone(),
            expected_blended_apy: best.blended_apy,
            target_apy_range: target,
            gas_estimate,
            net_apy: best.net_apy,
            confidence,
            chain_results,
            timestamp: Utc::now(),
        })
    }

    async fn evaluate_chain(
        &self,
        token: &str,
        chain_id: ChainId,
        risk_level: RiskLevel,
        position_size_usd: Decimal,
        hold_period_days: u32,
    ) -> Option<ChainResult> {
        let filter = OpportunityFilter::new().with_min_tvl(self.config.min_protocol_tvl);
        let (aggregation, gas_price, native_price) = tokio::join!(
            self.aggregator.fetch_all_opportunities(token, chain_id, Some(&filter)),
            self.oracle.gas_price_gwei(chain_id),
            self.oracle.native_price_usd(chain_id),
        );

        let aggregation = match aggregation {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", chain_name(chain_id), e);
                return None;
            }
        };
        let (gas_price_gwei, native_price_usd) = match (gas_price, native_price) {
            (Ok(gwei), Ok(native)) => (gwei, native),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!("Skipping {}: gas data unavailable: {}", chain_name(chain_id), e);
                return None;
            }
        };
        if aggregation.is_empty() {
            tracing::debug!("No {} markets on {}", token, chain_name(chain_id));
            return None;
        }

        let name = chain_name(chain_id);
        let opportunities: Vec<ChainOpportunity> = aggregation
            .opportunities
            .into_iter()
            .map(|opp| {
                let deposit = gas_cost_usd(opp.protocol.deposit_gas_units(), gas_price_gwei, native_price_usd);
                let withdraw = gas_cost_usd(opp.protocol.withdraw_gas_units(), gas_price_gwei, native_price_usd);
                ChainOpportunity {
                    chain_id,
                    chain_name: name.clone(),
                    protocol: opp.protocol,
                    supply_apy: opp.supply_apy,
                    tvl: opp.tvl,
                    liquidity: opp.liquidity,
                    gas_price_gwei,
                    deposit_gas_cost_usd: deposit,
                    withdraw_gas_cost_usd: withdraw,
                    total_gas_cost_usd: deposit + withdraw,
                }
            })
            .collect();

        let allocation = allocate(&opportunities, risk_level);
        let blended = blended_apy(&allocation);
        let gas = weighted_gas_cost(&allocation, &opportunities);
        let net = net_apy(blended, gas, hold_period_days, position_size_usd);

        tracing::debug!(
            "{}: blended {}% gas ${} net {}%",
            name,
            blended,
            gas.round_dp(4),
            net.round_dp(4)
        );

        Some(ChainResult {
            chain_id,
            chain_name: name,
            opportunities,
            allocation,
            blended_apy: round2(blended),
            total_gas_cost_usd: round2(gas),
            net_apy: round2(net),
            is_recommended: false,
        })
    }
}

/// Base 50, adjusted for hitting the target band, protocol depth and gas share
fn chain_confidence(best: &ChainResult, target: &TargetApyRange, position_size_usd: Decimal) -> u8 {
    let mut score: i64 = 50;

    if target.contains(best.net_apy) {
        score += 20;
    } else if best.net_apy >= target.min * dec!(0.8) {
        score += 10;
    }

    if !best.opportunities.is_empty() {
        let total_tvl: Decimal = best.opportunities.iter().map(|o| o.tvl).sum();
        let avg_tvl = total_tvl / Decimal::from(best.opportunities.len());
        if avg_tvl > dec!(1000000000) {
            score += 15;
        } else if avg_tvl > dec!(100000000) {
            score += 10;
        }
    }

    let gas_share = best.total_gas_cost_usd / position_size_usd * HUNDRED;
    if gas_share < dec!(0.1) {
        score += 10;
    } else if gas_share > Decimal::ONE {
        score -= 10;
    }

    score.clamp(0, 100) as u8
}

fn gas_summary(best: &ChainResult) -> GasSummary {
    let weighted = |pick: fn(&ChainOpportunity) -> Decimal| -> Decimal {
        best.allocation
            .iter()
            .filter_map(|a: &ProtocolAllocation| {
                best.opportunities
                    .iter()
                    .find(|o| o.protocol == a.protocol)
                    .map(|o| pick(o) * Decimal::from(a.percentage) / HUNDRED)
            })
            .sum()
    };
    GasSummary {
        gas_price_gwei: best
            .opportunities
            .first()
            .map(|o| o.gas_price_gwei)
            .unwrap_or_default(),
        deposit_usd: round2(weighted(|o| o.deposit_gas_cost_usd)),
        withdraw_usd: round2(weighted(|o| o.withdraw_gas_cost_usd)),
        total_usd: best.total_gas_cost_usd,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::AggregatorConfig;
    use crate::domain::Protocol;
    use crate::ports::mocks::MockProtocolAdapter;
    use crate::ports::oracle::MockGasOracle;
    use crate::ports::OracleError;

    fn oracle() -> MockGasOracle {
        let mut oracle = MockGasOracle::new();
        oracle.expect_gas_price_gwei().returning(|chain| match chain {
            ETHEREUM => Ok(dec!(30)),
            BASE => Ok(dec!(0.01)),
            ARBITRUM => Ok(dec!(0.1)),
            other => Err(OracleError::UnknownChain(other)),
        });
        oracle.expect_native_price_usd().returning(|_| Ok(dec!(3000)));
        oracle
    }

    fn optimizer(adapters: Vec<MockProtocolAdapter>) -> MultiChainOptimizer {
        let mut aggregator = YieldAggregator::new(AggregatorConfig::default());
        for adapter in adapters {
            aggregator.register(Arc::new(adapter));
        }
        MultiChainOptimizer::new(Arc::new(aggregator), Arc::new(oracle()))
    }

    #[tokio::test]
    async fn test_cheap_gas_chain_wins() {
        let aave = MockProtocolAdapter::new(Protocol::Aave)
            .with_apy("USDC", ETHEREUM, dec!(5), dec!(2000000000))
            .with_apy("USDC", BASE, dec!(4.5), dec!(500000000));

        let result = optimizer(vec![aave])
            .optimize_across_chains("USDC", RiskLevel::Moderate, dec!(10000), 30)
            .await
            .unwrap();

        // Ethereum: 450k gas at 30 gwei = $40.50 round trip, ~4.93 points of drag
        assert_eq!(result.best_chain_id, BASE);
        assert_eq!(result.chain_results.len(), 2);
        let eth = result.chain_results.iter().find(|c| c.chain_id == ETHEREUM).unwrap();
        assert_eq!(eth.total_gas_cost_usd, dec!(40.50));
        assert!(!eth.is_recommended);
        assert!(result.net_apy > eth.net_apy);
        assert_eq!(result.allocation.len(), 1);
        assert_eq!(result.allocation[0].percentage, 100);
        assert_eq!(result.target_apy_range.min, dec!(4));
    }

    #[tokio::test]
    async fn test_allocation_spans_protocols() {
        let aave = MockProtocolAdapter::new(Protocol::Aave).with_apy("USDC", BASE, dec!(4), dec!(900000000));
        let compound =
            MockProtocolAdapter::new(Protocol::Compound).with_apy("USDC", BASE, dec!(6), dec!(300000000));
        let morpho =
            MockProtocolAdapter::new(Protocol::Morpho).with_apy("USDC", BASE, dec!(10), dec!(100000000));

        let result = optimizer(vec![aave, compound, morpho])
            .optimize_across_chains("USDC", RiskLevel::Conservative, dec!(10000), 30)
            .await
            .unwrap();

        let split: Vec<(Protocol, u32)> = result.allocation.iter().map(|a| (a.protocol, a.percentage)).collect();
        assert_eq!(
            split,
            vec![(Protocol::Aave, 55), (Protocol::Compound, 30), (Protocol::Morpho, 15)]
        );
        assert_eq!(result.expected_blended_apy, dec!(5.5));
    }

    #[tokio::test]
    async fn test_tvl_floor_and_missing_gas_skip_chains() {
        // Polygon has no gas data in this oracle; Arbitrum is below the floor
        let aave = MockProtocolAdapter::new(Protocol::Aave)
            .with_apy("USDC", POLYGON, dec!(9), dec!(500000000))
            .with_apy("USDC", ARBITRUM, dec!(9), dec!(5000000))
            .with_apy("USDC", ETHEREUM, dec!(3), dec!(500000000));

        let result = optimizer(vec![aave])
            .optimize_across_chains("USDC", RiskLevel::Aggressive, dec!(1000000), 365)
            .await
            .unwrap();

        assert_eq!(result.best_chain_id, ETHEREUM);
        assert_eq!(result.chain_results.len(), 1);
    }

    #[tokio::test]
    async fn test_no_chain_is_an_error() {
        let aave = MockProtocolAdapter::new(Protocol::Aave);
        let err = optimizer(vec![aave])
            .optimize_across_chains("USDC", RiskLevel::Moderate, dec!(10000), 30)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NoOpportunities { .. }));
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let opt = optimizer(vec![]);
        assert!(opt.optimize_across_chains("", RiskLevel::Moderate, dec!(1), 30).await.is_err());
        assert!(opt.optimize_across_chains("USDC", RiskLevel::Moderate, dec!(0), 30).await.is_err());
        assert!(opt.optimize_across_chains("USDC", RiskLevel::Moderate, dec!(1), 0).await.is_err());
    }

    #[test]
    fn test_confidence_rewards_target_band_and_depth() {
        let opp = ChainOpportunity {
            chain_id: BASE,
            chain_name: "Base".to_string(),
            protocol: Protocol::Aave,
            supply_apy: dec!(4.5),
            tvl: dec!(2000000000),
            liquidity: dec!(1000000000),
            gas_price_gwei: dec!(0.01),
            deposit_gas_cost_usd: dec!(0.01),
            withdraw_gas_cost_usd: dec!(0.01),
            total_gas_cost_usd: dec!(0.02),
        };
        let result = ChainResult {
            chain_id: BASE,
            chain_name: "Base".to_string(),
            opportunities: vec![opp],
            allocation: vec![],
            blended_apy: dec!(4.5),
            total_gas_cost_usd: dec!(0.02),
            net_apy: dec!(4.5),
            is_recommended: true,
        };
        let target = TargetApyRange::for_level(RiskLevel::Moderate);
        // 50 + 20 band + 15 depth + 10 negligible gas
        assert_eq!(chain_confidence(&result, &target, dec!(10000)), 95);

        let expensive = ChainResult {
            total_gas_cost_usd: dec!(200),
            net_apy: dec!(1),
            ..result
        };
        // 50 + 0 + 15 - 10
        assert_eq!(chain_confidence(&expensive, &target, dec!(10000)), 55);
    }
}
