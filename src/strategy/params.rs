//! Optimizer Parameters
//!
//! Tunables for ranking and confidence scoring. Defaults match the values
//! the engine ships with in `config/engine.toml`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::StrategyKind;

/// Withdraw + approve + deposit, in gas units
pub const DEFAULT_REBALANCE_GAS_UNITS: u64 = 465_000;

/// Main optimizer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerParams {
    /// Strategy used when the caller does not pick one
    pub default_strategy: StrategyKind,
    /// Gas units for one full rebalance
    pub rebalance_gas_units: u64,
    /// Gas-aware moves must pay for themselves within this many days
    pub max_break_even_days: u64,
    /// Horizon gas is amortized over when ranking net of gas
    pub hold_period_days: u32,
    /// Liquidity below this multiple of the position value is "thin"
    pub thin_liquidity_multiple: Decimal,
    /// APY above this raises a risk warning (percent)
    pub high_apy_warning: Decimal,
    /// TVL below this raises a warning (USD)
    pub low_tvl_warning: Decimal,
    pub confidence: ConfidenceWeights,
}

impl Default for OptimizerParams {
    fn default() -> Self {
        Self {
            default_strategy: StrategyKind::HighestYield,
            rebalance_gas_units: DEFAULT_REBALANCE_GAS_UNITS,
            max_break_even_days: 90,
            hold_period_days: 180,
            thin_liquidity_multiple: dec!(2),
            high_apy_warning: dec!(15),
            low_tvl_warning: dec!(50000000),
            confidence: ConfidenceWeights::default(),
        }
    }
}

impl OptimizerParams {
    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.default_strategy = strategy;
        self
    }

    pub fn with_gas_units(mut self, units: u64) -> Self {
        self.rebalance_gas_units = units;
        self
    }

    pub fn with_hold_period(mut self, days: u32) -> Self {
        self.hold_period_days = days;
        self
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.rebalance_gas_units == 0 {
            return Err(ParamsError::InvalidGasUnits(self.rebalance_gas_units));
        }
        if self.max_break_even_days == 0 {
            return Err(ParamsError::InvalidBreakEvenDays(self.max_break_even_days));
        }
        if self.hold_period_days == 0 || self.hold_period_days > 3650 {
            return Err(ParamsError::InvalidHoldPeriod(self.hold_period_days));
        }
        if self.thin_liquidity_multiple < Decimal::ONE {
            return Err(ParamsError::InvalidLiquidityMultiple(self.thin_liquidity_multiple));
        }
        self.confidence.validate()?;
        Ok(())
    }
}

/// Points added to or removed from the base confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceWeights {
    pub base: Decimal,
    /// Per percentage point of APY delta
    pub per_apy_point: Decimal,
    pub max_apy_bonus: Decimal,
    /// Target liquidity at least 100x the position
    pub deep_liquidity_bonus: Decimal,
    /// Target liquidity at least 10x the position
    pub liquidity_bonus: Decimal,
    /// Target liquidity below the thin multiple
    pub thin_liquidity_penalty: Decimal,
    pub missing_gas_penalty: Decimal,
    /// Break-even within a week
    pub fast_break_even_bonus: Decimal,
    /// Break-even within a month
    pub break_even_bonus: Decimal,
    /// Break-even beyond the maximum (or never)
    pub slow_break_even_penalty: Decimal,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            base: dec!(50),
            per_apy_point: dec!(10),
            max_apy_bonus: dec!(30),
            deep_liquidity_bonus: dec!(15),
            liquidity_bonus: dec!(5),
            thin_liquidity_penalty: dec!(20),
            missing_gas_penalty: dec!(10),
            fast_break_even_bonus: dec!(15),
            break_even_bonus: dec!(5),
            slow_break_even_penalty: dec!(15),
        }
    }
}

impl ConfidenceWeights {
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.base < Decimal::ZERO || self.base > dec!(100) {
            return Err(ParamsError::InvalidConfidenceBase(self.base));
        }
        let weights = [
            ("per_apy_point", self.per_apy_point),
            ("max_apy_bonus", self.max_apy_bonus),
            ("deep_liquidity_bonus", self.deep_liquidity_bonus),
            ("liquidity_bonus", self.liquidity_bonus),
            ("thin_liquidity_penalty", self.thin_liquidity_penalty),
            ("missing_gas_penalty", self.missing_gas_penalty),
            ("fast_break_even_bonus", self.fast_break_even_bonus),
            ("break_even_bonus", self.break_even_bonus),
            ("slow_break_even_penalty", self.slow_break_even_penalty),
        ];
        for (name, value) in weights {
            if value < Decimal::ZERO {
                return Err(ParamsError::NegativeWeight(name, value));
            }
        }
        // Tiers must not invert, or confidence stops being monotonic
        if self.liquidity_bonus > self.deep_liquidity_bonus {
            return Err(ParamsError::InvertedTiers("liquidity_bonus", "deep_liquidity_bonus"));
        }
        if self.break_even_bonus > self.fast_break_even_bonus {
            return Err(ParamsError::InvertedTiers("break_even_bonus", "fast_break_even_bonus"));
        }
        Ok(())
    }
}

/// Parameter validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamsError {
    #[error("Invalid rebalance gas units: {0} (must be > 0)")]
    InvalidGasUnits(u64),
    #[error("Invalid max break-even days: {0} (must be > 0)")]
    InvalidBreakEvenDays(u64),
    #[error("Invalid hold period: {0} days (must be 1-3650)")]
    InvalidHoldPeriod(u32),
    #[error("Invalid thin liquidity multiple: {0} (minimum 1)")]
    InvalidLiquidityMultiple(Decimal),
    #[error("Invalid confidence base: {0} (must be 0-100)")]
    InvalidConfidenceBase(Decimal),
    #[error("Confidence weight {0} must not be negative (got {1})")]
    NegativeWeight(&'static str, Decimal),
    #[error("Confidence weight {0} must not exceed {1}")]
    InvertedTiers(&'static str, &'static str),
}
