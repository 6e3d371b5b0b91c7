use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::opportunity::Opportunity;
use super::protocol::Protocol;

/// Default TVL floor for conservative profiles ($200M)
pub const CONSERVATIVE_MIN_TVL: Decimal = dec!(200000000);
/// Default TVL floor for moderate profiles ($50M)
pub const MODERATE_MIN_TVL: Decimal = dec!(50000000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Conservative,
    #[default]
    Moderate,
    Aggressive,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Conservative => "conservative",
            RiskLevel::Moderate => "moderate",
            RiskLevel::Aggressive => "aggressive",
        }
    }

    /// TVL floor applied when the profile does not set one
    pub fn default_min_tvl(&self) -> Option<Decimal> {
        match self {
            RiskLevel::Conservative => Some(CONSERVATIVE_MIN_TVL),
            RiskLevel::Moderate => Some(MODERATE_MIN_TVL),
            RiskLevel::Aggressive => None,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("Unknown risk level: {0} (expected conservative, moderate or aggressive)")]
pub struct UnknownRiskLevel(pub String);

impl FromStr for RiskLevel {
    type Err = UnknownRiskLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conservative" => Ok(RiskLevel::Conservative),
            "moderate" => Ok(RiskLevel::Moderate),
            "aggressive" => Ok(RiskLevel::Aggressive),
            other => Err(UnknownRiskLevel(other.to_string())),
        }
    }
}

/// Caller preference biasing ranking toward safety or raw yield
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub level: RiskLevel,
    #[serde(default)]
    pub preferred_protocols: Option<Vec<Protocol>>,
    #[serde(default)]
    pub excluded_protocols: Option<Vec<Protocol>>,
    /// Overrides the level's default TVL floor
    #[serde(default)]
    pub min_protocol_tvl: Option<Decimal>,
}

impl RiskProfile {
    pub fn new(level: RiskLevel) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    pub fn conservative() -> Self {
        Self::new(RiskLevel::Conservative)
    }

    pub fn moderate() -> Self {
        Self::new(RiskLevel::Moderate)
    }

    pub fn aggressive() -> Self {
        Self::new(RiskLevel::Aggressive)
    }

    pub fn with_min_tvl(mut self, min_tvl: Decimal) -> Self {
        self.min_protocol_tvl = Some(min_tvl);
        self
    }

    pub fn preferring(mut self, protocols: Vec<Protocol>) -> Self {
        self.preferred_protocols = Some(protocols);
        self
    }

    pub fn excluding(mut self, protocols: Vec<Protocol>) -> Self {
        self.excluded_protocols = Some(protocols);
        self
    }

    /// Effective TVL floor, `None` means no floor
    pub fn tvl_floor(&self) -> Option<Decimal> {
        self.min_protocol_tvl.or_else(|| self.level.default_min_tvl())
    }

    /// Pre-ranking filter: protocol lists and TVL floor
    pub fn admits(&self, opp: &Opportunity) -> bool {
        if let Some(preferred) = &self.preferred_protocols {
            if !preferred.is_empty() && !preferred.contains(&opp.protocol) {
                return false;
            }
        }
        if let Some(excluded) = &self.excluded_protocols {
            if excluded.contains(&opp.protocol) {
                return false;
            }
        }
        match self.tvl_floor() {
            Some(floor) => opp.tvl >= floor,
            None => true,
        }
    }
}

/// Thresholds deciding whether a move is worth making
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebalanceConfig {
    /// Minimum APY improvement in percentage points
    pub min_apy_delta: Decimal,
    /// Absolute ceiling on the gas bill for one rebalance
    pub max_gas_cost_usd: Decimal,
    pub enabled: bool,
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self {
            min_apy_delta: dec!(1.0),
            max_gas_cost_usd: dec!(50),
            enabled: true,
        }
    }
}

impl RebalanceConfig {
    pub fn with_min_apy_delta(mut self, delta: Decimal) -> Self {
        self.min_apy_delta = delta;
        self
    }

    pub fn with_max_gas_cost(mut self, max: Decimal) -> Self {
        self.max_gas_cost_usd = max;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opp(protocol: Protocol, tvl: Decimal) -> Opportunity {
        Opportunity::new(protocol, "USDC", "0x", 1, dec!(5), tvl, tvl)
    }

    #[test]
    fn test_conservative_floor() {
        let profile = RiskProfile::conservative();
        assert!(profile.admits(&opp(Protocol::Aave, dec!(200000000))));
        assert!(!profile.admits(&opp(Protocol::Aave, dec!(199999999.99))));
    }

    #[test]
    fn test_aggressive_has_no_floor() {
        let profile = RiskProfile::aggressive();
        assert_eq!(profile.tvl_floor(), None);
        assert!(profile.admits(&opp(Protocol::Morpho, dec!(1))));
    }

    #[test]
    fn test_explicit_floor_overrides_level() {
        let profile = RiskProfile::conservative().with_min_tvl(dec!(1000));
        assert!(profile.admits(&opp(Protocol::Aave, dec!(1000))));
    }

    #[test]
    fn test_protocol_lists() {
        let profile = RiskProfile::aggressive()
            .preferring(vec![Protocol::Aave, Protocol::Compound])
            .excluding(vec![Protocol::Compound]);
        assert!(profile.admits(&opp(Protocol::Aave, dec!(1))));
        assert!(!profile.admits(&opp(Protocol::Compound, dec!(1))));
        assert!(!profile.admits(&opp(Protocol::Morpho, dec!(1))));
    }

    #[test]
    fn test_risk_level_parse() {
        assert_eq!("Conservative".parse::<RiskLevel>().unwrap(), RiskLevel::Conservative);
        assert!("yolo".parse::<RiskLevel>().is_err());
    }

    #[test]
    fn test_rebalance_defaults() {
        let config = RebalanceConfig::default();
        assert_eq!(config.min_apy_delta, dec!(1.0));
        assert_eq!(config.max_gas_cost_usd, dec!(50));
        assert!(config.enabled);
    }
}
