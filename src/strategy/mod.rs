//! Strategy Layer - Ranking rules and confidence scoring
//!
//! Every strategy ranks an already risk-filtered opportunity list and states
//! how much APY improvement it requires before a move is worth making:
//! - `HighestYield`: raw supply APY
//! - `RiskAdjusted`: weighted APY / TVL tier / protocol trust score
//! - `GasAware`: APY net of the move's gas cost amortized over the hold period

pub mod confidence;
pub mod gas_aware;
pub mod highest_yield;
pub mod params;
pub mod risk_adjusted;

pub use confidence::{score as confidence_score, ConfidenceInputs};
pub use gas_aware::GasAwareStrategy;
pub use highest_yield::HighestYieldStrategy;
pub use params::{ConfidenceWeights, OptimizerParams, ParamsError, DEFAULT_REBALANCE_GAS_UNITS};
pub use risk_adjusted::RiskAdjustedStrategy;

use rust_decimal::Decimal;

use crate::domain::{BreakEven, Opportunity, Position, Protocol, RebalanceConfig, RiskProfile, StrategyKind};

/// The part of a position ranking cares about
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentHolding {
    pub protocol: Protocol,
    pub apy: Decimal,
    pub value_usd: Decimal,
}

impl From<&Position> for CurrentHolding {
    fn from(position: &Position) -> Self {
        Self {
            protocol: position.protocol,
            apy: position.apy,
            value_usd: position.value_usd,
        }
    }
}

/// Everything a strategy may consult while ranking
#[derive(Debug, Clone, Copy)]
pub struct RankingContext<'a> {
    pub risk: &'a RiskProfile,
    pub current: Option<CurrentHolding>,
    /// USD cost of one move, when gas inputs are known
    pub move_cost_usd: Option<Decimal>,
    pub params: &'a OptimizerParams,
}

/// Facts about the candidate move handed to `reject_move`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveCheck {
    pub gas_cost_usd: Option<Decimal>,
    pub break_even: Option<BreakEven>,
}

/// Ranking rule for the optimizer
pub trait RankingStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Order `opportunities` best first; may drop entries the strategy refuses
    fn rank(&self, opportunities: Vec<Opportunity>, ctx: &RankingContext<'_>) -> Vec<Opportunity>;

    /// Minimum APY delta for moving into `target`
    fn required_apy_delta(
        &self,
        _target: &Opportunity,
        _ctx: &RankingContext<'_>,
        config: &RebalanceConfig,
    ) -> Decimal {
        config.min_apy_delta
    }

    /// Extra veto after the delta and net-gain checks passed; returns the reason
    fn reject_move(
        &self,
        _check: &MoveCheck,
        _ctx: &RankingContext<'_>,
        _config: &RebalanceConfig,
    ) -> Option<String> {
        None
    }
}

/// Strategy implementation for a kind
pub fn strategy_for(kind: StrategyKind) -> Box<dyn RankingStrategy> {
    match kind {
        StrategyKind::HighestYield => Box::new(HighestYieldStrategy),
        StrategyKind::RiskAdjusted => Box::new(RiskAdjustedStrategy),
        StrategyKind::GasAware => Box::new(GasAwareStrategy),
    }
}
