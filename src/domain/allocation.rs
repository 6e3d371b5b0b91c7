//! Cross-chain allocation model
//!
//! Splits a position across the protocols of one chain according to the
//! risk level, then prices the split net of gas.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::math::{DAYS_PER_YEAR, HUNDRED};
use super::protocol::{ChainId, Protocol};
use super::risk::RiskLevel;

/// Net APY band a risk level aims for (percent)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetApyRange {
    pub min: Decimal,
    pub max: Decimal,
}

impl TargetApyRange {
    pub fn for_level(level: RiskLevel) -> Self {
        match level {
            RiskLevel::Conservative => Self { min: dec!(3), max: dec!(4) },
            RiskLevel::Moderate => Self { min: dec!(4), max: dec!(5) },
            RiskLevel::Aggressive => Self { min: dec!(5), max: dec!(6) },
        }
    }

    pub fn contains(&self, apy: Decimal) -> bool {
        apy >= self.min && apy <= self.max
    }
}

/// One protocol's offer on one chain, with the gas to enter and leave it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainOpportunity {
    pub chain_id: ChainId,
    pub chain_name: String,
    pub protocol: Protocol,
    pub supply_apy: Decimal,
    pub tvl: Decimal,
    pub liquidity: Decimal,
    pub gas_price_gwei: Decimal,
    pub deposit_gas_cost_usd: Decimal,
    pub withdraw_gas_cost_usd: Decimal,
    pub total_gas_cost_usd: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolAllocation {
    pub protocol: Protocol,
    /// Whole percent; a chain's allocations sum to 100
    pub percentage: u32,
    pub expected_apy: Decimal,
    pub tvl: Decimal,
    pub rationale: String,
}

/// Allocation and net yield for one chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainResult {
    pub chain_id: ChainId,
    pub chain_name: String,
    pub opportunities: Vec<ChainOpportunity>,
    pub allocation: Vec<ProtocolAllocation>,
    pub blended_apy: Decimal,
    /// Allocation-weighted deposit + withdraw gas
    pub total_gas_cost_usd: Decimal,
    /// Blended APY minus annualized gas drag, floored at zero
    pub net_apy: Decimal,
    pub is_recommended: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasSummary {
    pub gas_price_gwei: Decimal,
    pub deposit_usd: Decimal,
    pub withdraw_usd: Decimal,
    pub total_usd: Decimal,
}

/// Best chain for a position plus every chain that was evaluated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiChainResult {
    pub token: String,
    pub risk_level: RiskLevel,
    pub position_size_usd: Decimal,
    pub hold_period_days: u32,
    pub best_chain_id: ChainId,
    pub best_chain_name: String,
    pub allocation: Vec<ProtocolAllocation>,
    pub expected_blended_apy: Decimal,
    pub target_apy_range: TargetApyRange,
    pub gas_estimate: GasSummary,
    pub net_apy: Decimal,
    pub confidence: u8,
    pub chain_results: Vec<ChainResult>,
    pub timestamp: DateTime<Utc>,
}

fn base_splits(level: RiskLevel) -> [u32; 3] {
    match level {
        RiskLevel::Conservative => [55, 30, 15],
        RiskLevel::Moderate => [40, 35, 25],
        RiskLevel::Aggressive => [70, 25, 5],
    }
}

fn rationale(level: RiskLevel, rank: usize) -> &'static str {
    let lines: [&str; 3] = match level {
        RiskLevel::Conservative => [
            "Highest TVL - most established and stable protocol",
            "Secondary stable protocol for diversification",
            "Minimal allocation for yield enhancement",
        ],
        RiskLevel::Moderate => [
            "Best balance of yield and stability",
            "Secondary balanced opportunity",
            "Diversification across protocols",
        ],
        RiskLevel::Aggressive => [
            "Maximum yield - highest APY protocol",
            "Secondary high-yield opportunity",
            "Minimal diversification",
        ],
    };
    lines.get(rank).copied().unwrap_or("Additional allocation")
}

/// Split percentages for `count` protocols, renormalized to sum to 100
pub fn split_percentages(level: RiskLevel, count: usize) -> Vec<u32> {
    let splits: Vec<u32> = base_splits(level).into_iter().take(count).collect();
    let total: u32 = splits.iter().sum();
    if total == 100 || total == 0 {
        return splits;
    }

    let mut scaled: Vec<u32> = splits
        .iter()
        .map(|p| {
            let share = Decimal::from(*p) / Decimal::from(total) * HUNDRED;
            share
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .try_into()
                .unwrap_or(0)
        })
        .collect();

    // Rounding slack goes to the top-ranked protocol
    let sum: u32 = scaled.iter().sum();
    if let Some(first) = scaled.first_mut() {
        *first = (*first + 100).saturating_sub(sum);
    }
    scaled
}

/// Order a chain's opportunities by the level's preference
pub fn rank_for_level(mut opportunities: Vec<ChainOpportunity>, level: RiskLevel) -> Vec<ChainOpportunity> {
    match level {
        RiskLevel::Conservative => opportunities.sort_by(|a, b| b.tvl.cmp(&a.tvl)),
        RiskLevel::Aggressive => {
            opportunities.sort_by(|a, b| b.supply_apy.cmp(&a.supply_apy).then_with(|| b.tvl.cmp(&a.tvl)))
        }
        RiskLevel::Moderate => {
            let max_apy = opportunities.iter().map(|o| o.supply_apy).max().unwrap_or_default();
            let max_tvl = opportunities.iter().map(|o| o.tvl).max().unwrap_or_default();
            let norm = |value: Decimal, max: Decimal| {
                if max > Decimal::ZERO {
                    value / max
                } else {
                    Decimal::ZERO
                }
            };
            let score = |o: &ChainOpportunity| {
                norm(o.supply_apy, max_apy) * dec!(0.4) + norm(o.tvl, max_tvl) * dec!(0.6)
            };
            opportunities.sort_by(|a, b| match score(b).cmp(&score(a)) {
                Ordering::Equal => b.supply_apy.cmp(&a.supply_apy),
                other => other,
            });
        }
    }
    opportunities
}

/// Allocation for one chain's opportunities
pub fn allocate(opportunities: &[ChainOpportunity], level: RiskLevel) -> Vec<ProtocolAllocation> {
    let ranked = rank_for_level(opportunities.to_vec(), level);
    let splits = split_percentages(level, ranked.len());

    ranked
        .into_iter()
        .zip(splits)
        .enumerate()
        .map(|(rank, (opp, percentage))| ProtocolAllocation {
            protocol: opp.protocol,
            percentage,
            expected_apy: opp.supply_apy,
            tvl: opp.tvl,
            rationale: rationale(level, rank).to_string(),
        })
        .collect()
}

/// `Σ(apy · pct) / 100`
pub fn blended_apy(allocation: &[ProtocolAllocation]) -> Decimal {
    allocation
        .iter()
        .map(|a| a.expected_apy * Decimal::from(a.percentage) / HUNDRED)
        .sum()
}

/// Allocation-weighted round-trip gas for the chain
pub fn weighted_gas_cost(allocation: &[ProtocolAllocation], opportunities: &[ChainOpportunity]) -> Decimal {
    allocation
        .iter()
        .filter_map(|a| {
            opportunities
                .iter()
                .find(|o| o.protocol == a.protocol)
                .map(|o| o.total_gas_cost_usd * Decimal::from(a.percentage) / HUNDRED)
        })
        .sum()
}

/// Blended APY minus gas amortized over the hold period, never below zero
pub fn net_apy(blended: Decimal, gas_cost_usd: Decimal, hold_period_days: u32, position_size_usd: Decimal) -> Decimal {
    if position_size_usd <= Decimal::ZERO || hold_period_days == 0 {
        return Decimal::ZERO;
    }
    let annualized = gas_cost_usd * DAYS_PER_YEAR / Decimal::from(hold_period_days);
    let drag = annualized / position_size_usd * HUNDRED;
    (blended - drag).max(Decimal::ZERO)
}
