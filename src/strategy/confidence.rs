//! Confidence scoring for recommendations
//!
//! Additive points on top of a base value, clamped to 0-100. Every input
//! moves the score in one direction only, so the score is monotonic in APY
//! delta, liquidity depth and break-even time.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::params::ConfidenceWeights;
use crate::domain::BreakEven;

/// What the scorer knows about one candidate move
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceInputs {
    pub apy_delta: Decimal,
    pub target_liquidity: Decimal,
    /// Unknown when there is no current position
    pub position_value: Option<Decimal>,
    pub gas_known: bool,
    pub break_even: Option<BreakEven>,
}

pub fn score(
    inputs: &ConfidenceInputs,
    weights: &ConfidenceWeights,
    thin_liquidity_multiple: Decimal,
    max_break_even_days: u64,
) -> u8 {
    let mut points = weights.base;

    let delta_points = (inputs.apy_delta.max(Decimal::ZERO) * weights.per_apy_point).min(weights.max_apy_bonus);
    points += delta_points;

    if let Some(value) = inputs.position_value.filter(|v| *v > Decimal::ZERO) {
        let ratio = inputs.target_liquidity.checked_div(value).unwrap_or(Decimal::MAX);
        if ratio < thin_liquidity_multiple {
            points -= weights.thin_liquidity_penalty;
        } else if ratio >= dec!(100) {
            points += weights.deep_liquidity_bonus;
        } else if ratio >= dec!(10) {
            points += weights.liquidity_bonus;
        }
    }

    if !inputs.gas_known {
        points -= weights.missing_gas_penalty;
    }

    match inputs.break_even {
        Some(BreakEven::Days(days)) if days <= 7 => points += weights.fast_break_even_bonus,
        Some(BreakEven::Days(days)) if days <= 30 => points += weights.break_even_bonus,
        Some(BreakEven::Days(days)) if days <= max_break_even_days => {}
        Some(_) => points -= weights.slow_break_even_penalty,
        None => {}
    }

    points
        .round()
        .clamp(Decimal::ZERO, dec!(100))
        .to_u8()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(delta: Decimal) -> ConfidenceInputs {
        ConfidenceInputs {
            apy_delta: delta,
            target_liquidity: dec!(1000000),
            position_value: Some(dec!(50000)),
            gas_known: true,
            break_even: None,
        }
    }

    fn default_score(i: &ConfidenceInputs) -> u8 {
        score(i, &ConfidenceWeights::default(), dec!(2), 90)
    }

    #[test]
    fn test_base_case() {
        // ratio 20 -> +5, delta 1 -> +10
        assert_eq!(default_score(&inputs(dec!(1))), 65);
    }

    #[test]
    fn test_monotonic_in_delta() {
        let mut last = 0;
        for tenths in 0..60 {
            let s = default_score(&inputs(Decimal::new(tenths, 1)));
            assert!(s >= last);
            last = s;
        }
    }

    #[test]
    fn test_monotonic_in_liquidity() {
        let mut last = 0;
        for liquidity in [dec!(1), dec!(99999), dec!(100000), dec!(500000), dec!(5000000), dec!(50000000)] {
            let mut i = inputs(dec!(1));
            i.target_liquidity = liquidity;
            let s = default_score(&i);
            assert!(s >= last);
            last = s;
        }
    }

    #[test]
    fn test_monotonic_in_break_even() {
        let ladder = [
            BreakEven::Days(1),
            BreakEven::Days(7),
            BreakEven::Days(8),
            BreakEven::Days(30),
            BreakEven::Days(31),
            BreakEven::Days(90),
            BreakEven::Days(91),
            BreakEven::Never,
        ];
        let mut last = 100;
        for be in ladder {
            let mut i = inputs(dec!(1));
            i.break_even = Some(be);
            let s = default_score(&i);
            assert!(s <= last);
            last = s;
        }
    }

    #[test]
    fn test_dust_position_saturates_liquidity_ratio() {
        let mut i = inputs(dec!(1));
        i.target_liquidity = dec!(1000000000000000000000000000);
        i.position_value = Some(dec!(0.0000000000000000001));
        // delta 1 -> +10, ratio saturated -> +15
        assert_eq!(default_score(&i), 75);
    }

    #[test]
    fn test_missing_gas_lowers_score() {
        let mut i = inputs(dec!(1));
        let with_gas = default_score(&i);
        i.gas_known = false;
        assert!(default_score(&i) < with_gas);
    }

    #[test]
    fn test_clamped() {
        let mut high = inputs(dec!(50));
        high.target_liquidity = dec!(1000000000);
        high.break_even = Some(BreakEven::Days(1));
        assert_eq!(default_score(&high), 100);

        let low = ConfidenceInputs {
            apy_delta: dec!(-5),
            target_liquidity: dec!(0),
            position_value: Some(dec!(1000)),
            gas_known: false,
            break_even: Some(BreakEven::Never),
        };
        let weights = ConfidenceWeights {
            base: dec!(10),
            ..ConfidenceWeights::default()
        };
        assert_eq!(score(&low, &weights, dec!(2), 90), 0);
    }
}
