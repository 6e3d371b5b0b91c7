//! Risk-Adjusted Strategy
//!
//! Score = APY score * w_apy + TVL tier * w_tvl + trust score * w_trust,
//! with weights picked by risk level. Conservative profiles also drop APYs
//! above 15% and demand a larger improvement before moving.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::cmp::Ordering;

use super::{RankingContext, RankingStrategy};
use crate::domain::opportunity::compare_apy_descending;
use crate::domain::{Opportunity, RebalanceConfig, RiskLevel, StrategyKind};

/// APY treated as a perfect APY score
const APY_CEILING: Decimal = dec!(20);
/// Conservative profiles never rank APYs above this
const CONSERVATIVE_MAX_APY: Decimal = dec!(15);
const CONSERVATIVE_MIN_DELTA: Decimal = dec!(1.5);
/// Added when the target is less trusted than the current protocol
const LOWER_TRUST_EXTRA_DELTA: Decimal = dec!(0.5);

struct Weights {
    apy: Decimal,
    tvl: Decimal,
    trust: Decimal,
}

fn weights(level: RiskLevel) -> Weights {
    match level {
        RiskLevel::Conservative => Weights {
            apy: dec!(0.3),
            tvl: dec!(0.5),
            trust: dec!(0.2),
        },
        RiskLevel::Moderate => Weights {
            apy: dec!(0.45),
            tvl: dec!(0.35),
            trust: dec!(0.2),
        },
        RiskLevel::Aggressive => Weights {
            apy: dec!(0.6),
            tvl: dec!(0.2),
            trust: dec!(0.2),
        },
    }
}

/// $1B+ = 100, $500M = 75, $100M = 50, $10M = 25, else 10
pub fn tvl_tier(tvl: Decimal) -> Decimal {
    if tvl >= dec!(1000000000) {
        dec!(100)
    } else if tvl >= dec!(500000000) {
        dec!(75)
    } else if tvl >= dec!(100000000) {
        dec!(50)
    } else if tvl >= dec!(10000000) {
        dec!(25)
    } else {
        dec!(10)
    }
}

pub fn risk_adjusted_score(opp: &Opportunity, level: RiskLevel) -> Decimal {
    let w = weights(level);
    let apy_score = (opp.supply_apy.max(Decimal::ZERO) / APY_CEILING).min(Decimal::ONE) * dec!(100);
    let trust = Decimal::from(opp.protocol.trust_score());
    apy_score * w.apy + tvl_tier(opp.tvl) * w.tvl + trust * w.trust
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RiskAdjustedStrategy;

impl RankingStrategy for RiskAdjustedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RiskAdjusted
    }

    fn rank(&self, opportunities: Vec<Opportunity>, ctx: &RankingContext<'_>) -> Vec<Opportunity> {
        let level = ctx.risk.level;
        let mut kept: Vec<(Decimal, Opportunity)> = opportunities
            .into_iter()
            .filter(|opp| level != RiskLevel::Conservative || opp.supply_apy <= CONSERVATIVE_MAX_APY)
            .map(|opp| (risk_adjusted_score(&opp, level), opp))
            .collect();

        kept.sort_by(|(sa, a), (sb, b)| match sb.cmp(sa) {
            Ordering::Equal => compare_apy_descending(a, b),
            other => other,
        });
        kept.into_iter().map(|(_, opp)| opp).collect()
    }

    fn required_apy_delta(
        &self,
        target: &Opportunity,
        ctx: &RankingContext<'_>,
        config: &RebalanceConfig,
    ) -> Decimal {
        let mut required = match ctx.risk.level {
            RiskLevel::Conservative => config.min_apy_delta.max(CONSERVATIVE_MIN_DELTA),
            _ => config.min_apy_delta,
        };
        if let Some(current) = ctx.current {
            if target.protocol.trust_score() < current.protocol.trust_score() {
                required += LOWER_TRUST_EXTRA_DELTA;
            }
        }
        required
    }
}
