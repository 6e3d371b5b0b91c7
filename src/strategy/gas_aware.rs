//! Gas-Aware Strategy
//!
//! Ranks by APY net of the move's gas cost, amortized over the hold period
//! and expressed as APY points on the position. Staying put costs nothing,
//! so the current protocol competes at its full APY.

use rust_decimal::Decimal;
use std::cmp::Ordering;

use super::{MoveCheck, RankingContext, RankingStrategy};
use crate::domain::math::{DAYS_PER_YEAR, HUNDRED};
use crate::domain::opportunity::compare_apy_descending;
use crate::domain::{Opportunity, RebalanceConfig, StrategyKind};

#[derive(Debug, Clone, Copy, Default)]
pub struct GasAwareStrategy;

impl GasAwareStrategy {
    /// APY points the move cost eats over the hold period, zero when unknown
    ///
    /// Saturates at `Decimal::MAX` for dust positions.
    pub fn gas_drag(ctx: &RankingContext<'_>, opp: &Opportunity) -> Decimal {
        let (Some(cost), Some(current)) = (ctx.move_cost_usd, ctx.current) else {
            return Decimal::ZERO;
        };
        if current.protocol == opp.protocol || current.value_usd <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let hold_days = Decimal::from(ctx.params.hold_period_days.max(1));
        cost.saturating_mul(DAYS_PER_YEAR)
            .checked_div(hold_days)
            .and_then(|annualized| annualized.checked_div(current.value_usd))
            .map_or(Decimal::MAX, |share| share.saturating_mul(HUNDRED))
    }

    pub fn net_apy(ctx: &RankingContext<'_>, opp: &Opportunity) -> Decimal {
        opp.supply_apy.saturating_sub(Self::gas_drag(ctx, opp))
    }
}

impl RankingStrategy for GasAwareStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::GasAware
    }

    fn rank(&self, opportunities: Vec<Opportunity>, ctx: &RankingContext<'_>) -> Vec<Opportunity> {
        let mut scored: Vec<(Decimal, Opportunity)> = opportunities
            .into_iter()
            .map(|opp| (Self::net_apy(ctx, &opp), opp))
            .collect();
        scored.sort_by(|(na, a), (nb, b)| match nb.cmp(na) {
            Ordering::Equal => compare_apy_descending(a, b),
            other => other,
        });
        scored.into_iter().map(|(_, opp)| opp).collect()
    }

    fn reject_move(
        &self,
        check: &MoveCheck,
        ctx: &RankingContext<'_>,
        config: &RebalanceConfig,
    ) -> Option<String> {
        let gas = check.gas_cost_usd?;
        if gas > config.max_gas_cost_usd {
            return Some(format!(
                "Gas cost ${} exceeds maximum ${}",
                gas.round_dp(2),
                config.max_gas_cost_usd
            ));
        }
        match check.break_even {
            Some(be) if !be.is_within(ctx.params.max_break_even_days) => Some(format!(
                "Break-even ({}) exceeds {} days",
                be, ctx.params.max_break_even_days
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BreakEven, Protocol, RiskProfile};
    use crate::strategy::{CurrentHolding, OptimizerParams};
    use rust_decimal_macros::dec;

    fn opp(protocol: Protocol, apy: Decimal) -> Opportunity {
        Opportunity::new(protocol, "USDC", "0x", 1, apy, dec!(1000000), dec!(500000))
    }

    #[test]
    fn test_small_position_stays_put() {
        // $1000 position, $40 move, 365-day hold -> 4 points of drag
        let risk = RiskProfile::aggressive();
        let params = OptimizerParams::default().with_hold_period(365);
        let ctx = RankingContext {
            risk: &risk,
            current: Some(CurrentHolding {
                protocol: Protocol::Aave,
                apy: dec!(4),
                value_usd: dec!(1000),
            }),
            move_cost_usd: Some(dec!(40)),
            params: &params,
        };
        assert_eq!(GasAwareStrategy::gas_drag(&ctx, &opp(Protocol::Morpho, dec!(6))), dec!(4));

        let ranked = GasAwareStrategy.rank(
            vec![opp(Protocol::Morpho, dec!(6)), opp(Protocol::Aave, dec!(4))],
            &ctx,
        );
        assert_eq!(ranked[0].protocol, Protocol::Aave);
    }

    #[test]
    fn test_dust_position_saturates_drag() {
        let risk = RiskProfile::aggressive();
        let params = OptimizerParams::default();
        let ctx = RankingContext {
            risk: &risk,
            current: Some(CurrentHolding {
                protocol: Protocol::Aave,
                apy: dec!(4),
                value_usd: dec!(0.0000000000000000001),
            }),
            move_cost_usd: Some(dec!(1000000000)),
            params: &params,
        };
        assert_eq!(GasAwareStrategy::gas_drag(&ctx, &opp(Protocol::Morpho, dec!(6))), Decimal::MAX);

        let ranked = GasAwareStrategy.rank(
            vec![opp(Protocol::Morpho, dec!(6)), opp(Protocol::Aave, dec!(4))],
            &ctx,
        );
        assert_eq!(ranked[0].protocol, Protocol::Aave);
    }

    #[test]
    fn test_without_gas_data_ranks_by_apy() {
        let risk = RiskProfile::aggressive();
        let params = OptimizerParams::default();
        let ctx = RankingContext {
            risk: &risk,
            current: None,
            move_cost_usd: None,
            params: &params,
        };
        let ranked = GasAwareStrategy.rank(
            vec![opp(Protocol::Aave, dec!(4)), opp(Protocol::Morpho, dec!(6))],
            &ctx,
        );
        assert_eq!(ranked[0].protocol, Protocol::Morpho);
    }

    #[test]
    fn test_reject_move() {
        let risk = RiskProfile::aggressive();
        let params = OptimizerParams::default();
        let ctx = RankingContext {
            risk: &risk,
            current: None,
            move_cost_usd: None,
            params: &params,
        };
        let config = RebalanceConfig::default();

        let ok = MoveCheck {
            gas_cost_usd: Some(dec!(10)),
            break_even: Some(BreakEven::Days(90)),
        };
        assert!(GasAwareStrategy.reject_move(&ok, &ctx, &config).is_none());

        let slow = MoveCheck {
            break_even: Some(BreakEven::Days(91)),
            ..ok
        };
        assert!(GasAwareStrategy.reject_move(&slow, &ctx, &config).is_some());

        let pricey = MoveCheck {
            gas_cost_usd: Some(dec!(50.01)),
            ..ok
        };
        assert!(GasAwareStrategy.reject_move(&pricey, &ctx, &config).is_some());

        let unknown = MoveCheck {
            gas_cost_usd: None,
            break_even: None,
        };
        assert!(GasAwareStrategy.reject_move(&unknown, &ctx, &config).is_none());
    }
}
