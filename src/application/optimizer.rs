//! Yield Optimizer
//!
//! Cross-references a wallet's position with the aggregator's opportunity
//! list and produces one hold/move recommendation. Ranking is delegated to
//! the selected strategy; gas cost, break-even time and confidence are
//! computed here so every strategy reports them the same way.

use rust_decimal::Decimal;
use std::sync::Arc;

use super::aggregator::YieldAggregator;
use super::error::{require_chain, require_non_negative, require_positive, require_token, require_wallet, EngineError};
use crate::domain::math::{annual_gain, monthly_gain, percent_of};
use crate::domain::{
    break_even_days, gas_cost_usd, round2, Action, AggregationResult, BreakEven, ChainId,
    Opportunity, Position, PositionComparison, RebalanceConfig, RebalanceRecommendation,
    RiskLevel, RiskProfile, StrategyKind,
};
use crate::ports::{estimate_gas, GasOracle};
use crate::strategy::{
    confidence_score, strategy_for, ConfidenceInputs, CurrentHolding, MoveCheck, OptimizerParams,
    RankingContext, RankingStrategy,
};

/// Analyzes positions and recommends where capital should sit
pub struct YieldOptimizer {
    aggregator: Arc<YieldAggregator>,
    params: OptimizerParams,
    rebalance: RebalanceConfig,
    default_risk: RiskProfile,
    gas_oracle: Option<Arc<dyn GasOracle>>,
}

/// Outcome of the move/hold decision before it is dressed up as a recommendation
struct Decision {
    action: Action,
    reason: String,
}

impl YieldOptimizer {
    pub fn new(aggregator: Arc<YieldAggregator>, params: OptimizerParams) -> Self {
        Self {
            aggregator,
            params,
            rebalance: RebalanceConfig::default(),
            default_risk: RiskProfile::default(),
            gas_oracle: None,
        }
    }

    pub fn with_rebalance_config(mut self, config: RebalanceConfig) -> Self {
        self.rebalance = config;
        self
    }

    pub fn with_default_risk(mut self, risk: RiskProfile) -> Self {
        self.default_risk = risk;
        self
    }

    /// Price moves in `optimize_position` with live gas data
    pub fn with_gas_oracle(mut self, oracle: Arc<dyn GasOracle>) -> Self {
        self.gas_oracle = Some(oracle);
        self
    }

    pub fn params(&self) -> &OptimizerParams {
        &self.params
    }

    pub fn aggregator(&self) -> &YieldAggregator {
        &self.aggregator
    }

    /// Recommend what `wallet` should do with its `token` on `chain_id`
    ///
    /// The position lookup, the opportunity fan-out and the gas oracle are
    /// queried concurrently.
    pub async fn optimize_position(
        &self,
        wallet: &str,
        token: &str,
        chain_id: ChainId,
        risk: Option<RiskProfile>,
        strategy: Option<StrategyKind>,
    ) -> Result<RebalanceRecommendation, EngineError> {
        require_wallet(wallet)?;
        require_token(token)?;
        require_chain(chain_id)?;

        let risk = risk.unwrap_or_else(|| self.default_risk.clone());
        let strategy = strategy_for(strategy.unwrap_or(self.params.default_strategy));
        let tokens = [token.to_string()];

        let (positions, aggregation, gas) = tokio::join!(
            self.aggregator.get_all_positions(wallet, chain_id, Some(&tokens[..])),
            self.aggregator.fetch_all_opportunities(token, chain_id, None),
            self.oracle_move_cost(chain_id),
        );
        let positions = positions?;
        let aggregation = aggregation?;

        let mut warnings = Vec::new();
        let move_cost = match gas {
            Some(Ok(cost)) => Some(cost),
            Some(Err(reason)) => {
                warnings.push(format!("Gas oracle unavailable: {}", reason));
                None
            }
            None => None,
        };

        let current = positions.position_for(token).map(CurrentHolding::from);
        Ok(self.recommend(
            current,
            aggregation,
            &risk,
            strategy.as_ref(),
            move_cost,
            &self.rebalance,
            warnings,
        ))
    }

    /// Measure an explicit position against the best live opportunity
    ///
    /// `None` only when no adapter returned an opportunity.
    pub async fn compare_position(
        &self,
        position: &Position,
        token: &str,
        chain_id: ChainId,
    ) -> Result<Option<PositionComparison>, EngineError> {
        require_token(token)?;
        require_chain(chain_id)?;
        require_non_negative("position value", position.value_usd)?;

        let aggregation = self.aggregator.fetch_all_opportunities(token, chain_id, None).await?;
        let Some(best) = aggregation.best else {
            return Ok(None);
        };

        let apy_delta = best.supply_apy - position.apy;
        let apy_improvement_percent = if position.apy.is_zero() {
            None
        } else {
            percent_of(apy_delta, position.apy).map(round2)
        };

        Ok(Some(PositionComparison {
            current_protocol: position.protocol,
            current_apy: position.apy,
            recommended_protocol: best.protocol,
            recommended_apy: best.supply_apy,
            apy_delta,
            apy_improvement_percent,
            estimated_monthly_gain_usd: round2(monthly_gain(apy_delta, position.value_usd)),
            estimated_annual_gain_usd: round2(annual_gain(apy_delta, position.value_usd)),
        }))
    }

    /// Same ranking as `optimize_position`, for an explicit position and explicit gas inputs
    ///
    /// Gas fields are filled only when both `gas_price_gwei` and
    /// `native_price_usd` are given.
    pub async fn get_rebalance_recommendation(
        &self,
        position: &Position,
        token: &str,
        chain_id: ChainId,
        config: Option<RebalanceConfig>,
        gas_price_gwei: Option<Decimal>,
        native_price_usd: Option<Decimal>,
    ) -> Result<RebalanceRecommendation, EngineError> {
        require_token(token)?;
        require_chain(chain_id)?;
        require_positive("position value", position.value_usd)?;
        if let Some(gwei) = gas_price_gwei {
            require_non_negative("gas price", gwei)?;
        }
        if let Some(price) = native_price_usd {
            require_non_negative("native price", price)?;
        }

        let config = config.unwrap_or_else(|| self.rebalance.clone());
        let move_cost = match (gas_price_gwei, native_price_usd) {
            (Some(gwei), Some(price)) => Some(gas_cost_usd(self.params.rebalance_gas_units, gwei, price)),
            _ => None,
        };

        let aggregation = self.aggregator.fetch_all_opportunities(token, chain_id, None).await?;
        let strategy = strategy_for(self.params.default_strategy);

        Ok(self.recommend(
            Some(CurrentHolding::from(position)),
            aggregation,
            &self.default_risk,
            strategy.as_ref(),
            move_cost,
            &config,
            Vec::new(),
        ))
    }

    /// Whether moving from `current_apy` to `new_apy` pays off
    ///
    /// All three must hold: annual gain beats gas, the delta meets
    /// `min_apy_delta`, gas stays within `max_gas_cost_usd`.
    pub fn is_rebalance_worth_it(
        &self,
        current_apy: Decimal,
        new_apy: Decimal,
        position_value_usd: Decimal,
        gas_cost_usd: Decimal,
        config: Option<&RebalanceConfig>,
    ) -> Result<bool, EngineError> {
        require_non_negative("current APY", current_apy)?;
        require_non_negative("new APY", new_apy)?;
        require_non_negative("position value", position_value_usd)?;
        require_non_negative("gas cost", gas_cost_usd)?;

        let config = config.unwrap_or(&self.rebalance);
        if !config.enabled {
            return Ok(false);
        }

        let apy_delta = new_apy - current_apy;
        let net_gain = annual_gain(apy_delta, position_value_usd) - gas_cost_usd;

        Ok(net_gain > Decimal::ZERO
            && apy_delta >= config.min_apy_delta
            && gas_cost_usd <= config.max_gas_cost_usd)
    }

    /// Days until the APY improvement has paid for the gas
    pub fn estimate_break_even_days(
        &self,
        apy_delta: Decimal,
        position_value_usd: Decimal,
        gas_cost_usd: Decimal,
    ) -> Result<BreakEven, EngineError> {
        require_non_negative("position value", position_value_usd)?;
        require_non_negative("gas cost", gas_cost_usd)?;
        Ok(break_even_days(apy_delta, position_value_usd, gas_cost_usd))
    }

    async fn oracle_move_cost(&self, chain_id: ChainId) -> Option<Result<Decimal, String>> {
        let oracle = self.gas_oracle.as_ref()?;
        Some(
            estimate_gas(oracle.as_ref(), chain_id, self.params.rebalance_gas_units)
                .await
                .map(|estimate| estimate.gas_cost_usd)
                .map_err(|e| {
                    tracing::warn!("Gas oracle failed for chain {}: {}", chain_id, e);
                    e.to_string()
                }),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn recommend(
        &self,
        current: Option<CurrentHolding>,
        aggregation: AggregationResult,
        risk: &RiskProfile,
        strategy: &dyn RankingStrategy,
        move_cost: Option<Decimal>,
        config: &RebalanceConfig,
        mut warnings: Vec<String>,
    ) -> RebalanceRecommendation {
        let total_found = aggregation.opportunities.len();
        let admitted: Vec<Opportunity> = aggregation
            .opportunities
            .iter()
            .filter(|opp| risk.admits(opp))
            .cloned()
            .collect();

        let ctx = RankingContext {
            risk,
            current,
            move_cost_usd: move_cost,
            params: &self.params,
        };
        let ranked = strategy.rank(admitted, &ctx);
        let top = ranked.first().cloned();

        // Candidate move figures, reported even when the decision is hold
        let candidate_delta = match (&top, current) {
            (Some(t), Some(c)) => t.supply_apy - c.apy,
            (Some(t), None) => t.supply_apy,
            (None, _) => Decimal::ZERO,
        };
        let value = current.map(|c| c.value_usd);
        let break_even = match (move_cost, value, &top) {
            (Some(cost), Some(v), Some(_)) => Some(break_even_days(candidate_delta, v, cost)),
            _ => None,
        };
        let net_gain_after_gas = match (move_cost, value, &top) {
            (Some(cost), Some(v), Some(_)) => Some(annual_gain(candidate_delta, v) - cost),
            _ => None,
        };

        let decision = self.decide(
            top.as_ref(),
            &ctx,
            strategy,
            config,
            candidate_delta,
            net_gain_after_gas,
            move_cost,
            break_even,
            total_found,
        );

        let confidence = match &top {
            Some(target) => confidence_score(
                &ConfidenceInputs {
                    apy_delta: candidate_delta,
                    target_liquidity: target.liquidity,
                    position_value: value,
                    gas_known: move_cost.is_some(),
                    break_even,
                },
                &self.params.confidence,
                self.params.thin_liquidity_multiple,
                self.params.max_break_even_days,
            ),
            None => 0,
        };

        self.collect_warnings(&mut warnings, top.as_ref(), risk, value, move_cost, &aggregation);

        let is_move = decision.action == Action::Move;
        let (apy_delta, monthly, annual) = match (is_move, value) {
            (true, Some(v)) => (
                candidate_delta,
                round2(monthly_gain(candidate_delta, v)),
                round2(annual_gain(candidate_delta, v)),
            ),
            (true, None) => (candidate_delta, Decimal::ZERO, Decimal::ZERO),
            (false, _) => (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
        };

        tracing::info!(
            "{} {} via {}: {} (confidence {})",
            decision.action,
            aggregation.token,
            strategy.kind(),
            decision.reason,
            confidence
        );

        RebalanceRecommendation {
            action: decision.action,
            strategy: strategy.kind(),
            current_protocol: current.map(|c| c.protocol),
            current_apy: current.map(|c| c.apy),
            recommended_protocol: top.as_ref().filter(|_| is_move).map(|t| t.protocol),
            recommended_apy: top.as_ref().filter(|_| is_move).map(|t| t.supply_apy),
            apy_delta,
            estimated_monthly_gain: monthly,
            estimated_annual_gain: annual,
            estimated_gas_cost: move_cost.filter(|_| top.is_some()).map(round2),
            net_gain_after_gas: net_gain_after_gas.map(round2),
            break_even_days: break_even,
            confidence,
            reason: decision.reason,
            warnings,
            ranked_opportunities: ranked,
            timestamp: chrono::Utc::now(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn decide(
        &self,
        top: Option<&Opportunity>,
        ctx: &RankingContext<'_>,
        strategy: &dyn RankingStrategy,
        config: &RebalanceConfig,
        apy_delta: Decimal,
        net_gain: Option<Decimal>,
        move_cost: Option<Decimal>,
        break_even: Option<BreakEven>,
        total_found: usize,
    ) -> Decision {
        let hold = |reason: String| Decision {
            action: Action::Hold,
            reason,
        };

        let Some(target) = top else {
            return if total_found == 0 {
                hold("No opportunities available".to_string())
            } else {
                hold(format!(
                    "No opportunities pass the {} risk filter",
                    ctx.risk.level
                ))
            };
        };

        if !config.enabled {
            return hold("Rebalancing is disabled".to_string());
        }

        let Some(current) = ctx.current else {
            return Decision {
                action: Action::Move,
                reason: format!(
                    "No current position; best entry is {} at {}% APY",
                    target.protocol,
                    round2(target.supply_apy)
                ),
            };
        };

        if current.protocol == target.protocol {
            return hold("Already in the best protocol".to_string());
        }

        let required = strategy.required_apy_delta(target, ctx, config);
        if apy_delta < required {
            return hold(format!(
                "APY improvement ({}%) below threshold ({}%)",
                round2(apy_delta),
                required
            ));
        }

        if let Some(net) = net_gain {
            if net <= Decimal::ZERO {
                return hold(format!(
                    "Gas cost outweighs the annual gain (net {})",
                    round2(net)
                ));
            }
        }

        let check = MoveCheck {
            gas_cost_usd: move_cost,
            break_even,
        };
        if let Some(reason) = strategy.reject_move(&check, ctx, config) {
            return hold(reason);
        }

        Decision {
            action: Action::Move,
            reason: format!(
                "Better yield available: {} offers {}% APY (+{} points)",
                target.protocol,
                round2(target.supply_apy),
                round2(apy_delta)
            ),
        }
    }

    fn collect_warnings(
        &self,
        warnings: &mut Vec<String>,
        top: Option<&Opportunity>,
        risk: &RiskProfile,
        position_value: Option<Decimal>,
        move_cost: Option<Decimal>,
        aggregation: &AggregationResult,
    ) {
        if let Some(target) = top {
            if target.supply_apy > self.params.high_apy_warning {
                warnings.push("High APY may indicate elevated risk".to_string());
            }
            if target.tvl < self.params.low_tvl_warning {
                warnings.push("Protocol has relatively low TVL".to_string());
            }
            if let Some(value) = position_value {
                if target.liquidity < value * self.params.thin_liquidity_multiple {
                    warnings.push(format!(
                        "Thin liquidity: {} has ${} available for a ${} position",
                        target.protocol,
                        round2(target.liquidity),
                        round2(value)
                    ));
                }
            }
            if target.has_liquidity_anomaly() {
                warnings.push(format!("{} reports liquidity above TVL", target.protocol));
            }
        }

        if risk.level == RiskLevel::Aggressive {
            warnings.push("Aggressive risk profile selected".to_string());
        }

        if move_cost.is_none() && !warnings.iter().any(|w| w.starts_with("Gas oracle")) {
            warnings.push("Gas data unavailable; net gain not computed".to_string());
        }

        if let Some(failures) = aggregation.failure_summary() {
            warnings.push(format!("Unavailable protocols: {}", failures));
        }
    }
}
