//! Optimizer outputs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::math::BreakEven;
use super::opportunity::Opportunity;
use super::protocol::Protocol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Hold,
    Move,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Hold => f.write_str("HOLD"),
            Action::Move => f.write_str("MOVE"),
        }
    }
}

/// Scoring rule used to rank candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    #[default]
    HighestYield,
    RiskAdjusted,
    GasAware,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::HighestYield,
        StrategyKind::RiskAdjusted,
        StrategyKind::GasAware,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::HighestYield => "highest-yield",
            StrategyKind::RiskAdjusted => "risk-adjusted",
            StrategyKind::GasAware => "gas-aware",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("Unknown strategy: {0} (expected highest-yield, risk-adjusted or gas-aware)")]
pub struct UnknownStrategy(pub String);

impl FromStr for StrategyKind {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "highest-yield" => Ok(StrategyKind::HighestYield),
            "risk-adjusted" => Ok(StrategyKind::RiskAdjusted),
            "gas-aware" => Ok(StrategyKind::GasAware),
            other => Err(UnknownStrategy(other.to_string())),
        }
    }
}

/// Cost of one withdraw + deposit pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasEstimate {
    pub gas_units: u64,
    pub gas_price_gwei: Decimal,
    pub native_price_usd: Decimal,
    pub gas_cost_native: Decimal,
    pub gas_cost_usd: Decimal,
}

/// Terminal output of the optimizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceRecommendation {
    pub action: Action,
    pub strategy: StrategyKind,
    pub current_protocol: Option<Protocol>,
    pub current_apy: Option<Decimal>,
    /// Absent when holding
    pub recommended_protocol: Option<Protocol>,
    pub recommended_apy: Option<Decimal>,
    /// Zero when holding
    pub apy_delta: Decimal,
    pub estimated_monthly_gain: Decimal,
    pub estimated_annual_gain: Decimal,
    /// Present only when gas inputs were available
    pub estimated_gas_cost: Option<Decimal>,
    pub net_gain_after_gas: Option<Decimal>,
    pub break_even_days: Option<BreakEven>,
    /// 0-100
    pub confidence: u8,
    pub reason: String,
    pub warnings: Vec<String>,
    pub ranked_opportunities: Vec<Opportunity>,
    pub timestamp: DateTime<Utc>,
}

impl RebalanceRecommendation {
    pub fn is_move(&self) -> bool {
        self.action == Action::Move
    }
}

/// Explicit position measured against the best live opportunity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionComparison {
    pub current_protocol: Protocol,
    pub current_apy: Decimal,
    pub recommended_protocol: Protocol,
    pub recommended_apy: Decimal,
    pub apy_delta: Decimal,
    /// `delta / current * 100`, absent when the current APY is zero
    pub apy_improvement_percent: Option<Decimal>,
    pub estimated_monthly_gain_usd: Decimal,
    pub estimated_annual_gain_usd: Decimal,
}
