use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use super::math::{round2, weighted_average};
use super::protocol::{ChainId, Protocol};

/// A wallet's current holding in one protocol/token/chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub protocol: Protocol,
    pub token: String,
    pub token_address: String,
    pub chain_id: ChainId,
    /// Raw smallest-unit integer amount
    pub amount: String,
    /// Human readable amount, e.g. "1000.50"
    pub amount_formatted: Decimal,
    pub value_usd: Decimal,
    /// APY currently earned by this position
    pub apy: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earned_yield: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deposited_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Error, PartialEq)]
pub enum PositionError {
    #[error("Invalid position value: {0} USD")]
    InvalidValue(Decimal),
    #[error("Invalid raw amount: {0:?}")]
    InvalidAmount(String),
}

impl Position {
    pub fn new(
        protocol: Protocol,
        token: impl Into<String>,
        token_address: impl Into<String>,
        chain_id: ChainId,
        amount: impl Into<String>,
        amount_formatted: Decimal,
        value_usd: Decimal,
        apy: Decimal,
    ) -> Result<Self, PositionError> {
        let amount = amount.into();
        if amount.is_empty() || !amount.chars().all(|c| c.is_ascii_digit()) {
            return Err(PositionError::InvalidAmount(amount));
        }
        if value_usd < Decimal::ZERO {
            return Err(PositionError::InvalidValue(value_usd));
        }

        Ok(Self {
            protocol,
            token: token.into(),
            token_address: token_address.into(),
            chain_id,
            amount,
            amount_formatted,
            value_usd,
            apy,
            earned_yield: None,
            deposited_at: None,
        })
    }

    pub fn with_earned_yield(mut self, earned: Decimal) -> Self {
        self.earned_yield = Some(earned);
        self
    }

    pub fn with_deposited_at(mut self, at: DateTime<Utc>) -> Self {
        self.deposited_at = Some(at);
        self
    }
}

/// A wallet's positions rolled up across protocols and tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSummary {
    pub positions: Vec<Position>,
    pub total_value_usd: Decimal,
    /// USD-value-weighted mean APY, zero when there are no positions
    pub weighted_avg_apy: Decimal,
    pub total_yield_earned: Decimal,
    /// Distinct protocols holding at least one position
    pub protocol_count: usize,
    pub best_position: Option<Position>,
    pub timestamp: DateTime<Utc>,
}

impl PositionSummary {
    pub fn from_positions(positions: Vec<Position>) -> Self {
        let total_value_usd: Decimal = positions.iter().map(|p| p.value_usd).sum();
        let weighted_avg_apy = weighted_average(positions.iter().map(|p| (p.value_usd, p.apy)));
        let total_yield_earned: Decimal = positions.iter().filter_map(|p| p.earned_yield).sum();
        let protocol_count = positions
            .iter()
            .map(|p| p.protocol)
            .collect::<BTreeSet<_>>()
            .len();

        // First position wins ties
        let best_position = positions
            .iter()
            .fold(None::<&Position>, |best, p| match best {
                Some(b) if b.apy >= p.apy => Some(b),
                _ => Some(p),
            })
            .cloned();

        Self {
            positions,
            total_value_usd: round2(total_value_usd),
            weighted_avg_apy: round2(weighted_avg_apy),
            total_yield_earned: round2(total_yield_earned),
            protocol_count,
            best_position,
            timestamp: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Position in `token`, highest value first
    pub fn position_for(&self, token: &str) -> Option<&Position> {
        self.positions
            .iter()
            .filter(|p| p.token.eq_ignore_ascii_case(token))
            .max_by(|a, b| a.value_usd.cmp(&b.value_usd))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn position(protocol: Protocol, value: Decimal, apy: Decimal) -> Position {
        Position::new(protocol, "USDC", "0xA0b8", 1, "1000000", value, value, apy).unwrap()
    }

    #[test]
    fn test_new_rejects_negative_value() {
        let result = Position::new(Protocol::Aave, "USDC", "0x", 1, "1", dec!(1), dec!(-1), dec!(4));
        assert_eq!(result.unwrap_err(), PositionError::InvalidValue(dec!(-1)));
    }

    #[test]
    fn test_new_rejects_non_integer_amount() {
        let result = Position::new(Protocol::Aave, "USDC", "0x", 1, "10.5", dec!(1), dec!(1), dec!(4));
        assert!(matches!(result, Err(PositionError::InvalidAmount(_))));
    }

    #[test]
    fn test_weighted_avg_apy() {
        let summary = PositionSummary::from_positions(vec![
            position(Protocol::Aave, dec!(100), dec!(4)),
            position(Protocol::Compound, dec!(300), dec!(8)),
        ]);
        assert_eq!(summary.weighted_avg_apy, dec!(7.00));
        assert_eq!(summary.total_value_usd, dec!(400));
        assert_eq!(summary.protocol_count, 2);
        assert_eq!(summary.best_position.unwrap().protocol, Protocol::Compound);
    }

    #[test]
    fn test_empty_summary_is_zero_not_nan() {
        let summary = PositionSummary::from_positions(Vec::new());
        assert!(summary.is_empty());
        assert_eq!(summary.weighted_avg_apy, Decimal::ZERO);
        assert_eq!(summary.total_value_usd, Decimal::ZERO);
        assert!(summary.best_position.is_none());
    }

    #[test]
    fn test_protocol_count_is_distinct() {
        let mut usdt = position(Protocol::Aave, dec!(50), dec!(3));
        usdt.token = "USDT".to_string();
        let summary = PositionSummary::from_positions(vec![
            position(Protocol::Aave, dec!(100), dec!(4)),
            usdt,
        ]);
        assert_eq!(summary.protocol_count, 1);
        assert_eq!(summary.position_for("usdt").unwrap().value_usd, dec!(50));
    }

    #[test]
    fn test_total_yield_earned() {
        let summary = PositionSummary::from_positions(vec![
            position(Protocol::Aave, dec!(100), dec!(4)).with_earned_yield(dec!(1.25)),
            position(Protocol::Morpho, dec!(100), dec!(6)),
            position(Protocol::Compound, dec!(100), dec!(5)).with_earned_yield(dec!(2)),
        ]);
        assert_eq!(summary.total_yield_earned, dec!(3.25));
    }
}
