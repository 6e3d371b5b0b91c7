//! Decimal helpers shared by the aggregator and optimizer
//!
//! All rates are percentages ("4.82" = 4.82% APY) and all amounts are USD.
//! Nothing here touches binary floating point.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DAYS_PER_YEAR: Decimal = dec!(365);
pub const MONTHS_PER_YEAR: Decimal = dec!(12);
pub const HUNDRED: Decimal = dec!(100);
/// gwei -> native token
pub const GWEI: Decimal = dec!(0.000000001);

/// Days needed to recover a one-off cost from an APY improvement
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakEven {
    Days(u64),
    /// The improvement never pays the cost back
    Never,
}

impl BreakEven {
    pub fn days(&self) -> Option<u64> {
        match self {
            BreakEven::Days(d) => Some(*d),
            BreakEven::Never => None,
        }
    }

    pub fn is_within(&self, max_days: u64) -> bool {
        matches!(self, BreakEven::Days(d) if *d <= max_days)
    }
}

impl fmt::Display for BreakEven {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakEven::Days(d) => write!(f, "{} days", d),
            BreakEven::Never => f.write_str("never"),
        }
    }
}

/// Annual USD gain from an APY delta on a position
pub fn annual_gain(apy_delta: Decimal, value_usd: Decimal) -> Decimal {
    apy_delta / HUNDRED * value_usd
}

pub fn monthly_gain(apy_delta: Decimal, value_usd: Decimal) -> Decimal {
    annual_gain(apy_delta, value_usd) / MONTHS_PER_YEAR
}

/// Gain over an arbitrary number of days
pub fn gain_over_days(apy: Decimal, value_usd: Decimal, days: u32) -> Decimal {
    apy / HUNDRED / DAYS_PER_YEAR * value_usd * Decimal::from(days)
}

/// `ceil(gas / daily_gain)`, `Never` when the daily gain is not positive
///
/// A quotient beyond `Decimal::MAX` is also `Never`.
pub fn break_even_days(apy_delta: Decimal, value_usd: Decimal, cost_usd: Decimal) -> BreakEven {
    let daily_gain = apy_delta / HUNDRED / DAYS_PER_YEAR * value_usd;
    if daily_gain <= Decimal::ZERO {
        return BreakEven::Never;
    }
    if cost_usd <= Decimal::ZERO {
        return BreakEven::Days(0);
    }
    match cost_usd
        .checked_div(daily_gain)
        .and_then(|days| days.ceil().to_u64())
    {
        Some(days) => BreakEven::Days(days),
        None => BreakEven::Never,
    }
}

/// USD cost of `gas_units` at `gas_price_gwei` with the native token at `native_price_usd`
pub fn gas_cost_usd(gas_units: u64, gas_price_gwei: Decimal, native_price_usd: Decimal) -> Decimal {
    Decimal::from(gas_units) * gas_price_gwei * GWEI * native_price_usd
}

/// `part / whole * 100`, `None` when `whole` is zero
pub fn percent_of(part: Decimal, whole: Decimal) -> Option<Decimal> {
    if whole.is_zero() {
        None
    } else {
        part.checked_div(whole).map(|ratio| ratio * HUNDRED)
    }
}

/// `Σ(weight·value) / Σ(weight)`, zero when total weight is zero
pub fn weighted_average<I>(pairs: I) -> Decimal
where
    I: IntoIterator<Item = (Decimal, Decimal)>,
{
    let (weighted_sum, total_weight) = pairs
        .into_iter()
        .fold((Decimal::ZERO, Decimal::ZERO), |(sum, total), (weight, value)| {
            (sum + weight * value, total + weight)
        });
    if total_weight.is_zero() {
        Decimal::ZERO
    } else {
        weighted_sum / total_weight
    }
}

/// Two decimal places, midpoint away from zero
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}

/// "1234.5" -> "1,234.50"
pub fn format_usd(value: Decimal) -> String {
    let rounded = round2(value);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}${}.{}", if negative { "-" } else { "" }, grouped, frac_part)
}
