//! Result shapes produced by the aggregator

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::opportunity::Opportunity;
use super::protocol::{ChainId, Protocol};

/// Output of one opportunity fan-out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub token: String,
    pub chain_id: ChainId,
    /// Sorted by supply APY, highest first
    pub opportunities: Vec<Opportunity>,
    pub best: Option<Opportunity>,
    pub worst: Option<Opportunity>,
    /// `best - worst`, zero with fewer than two opportunities
    pub apy_spread: Decimal,
    pub successful_protocols: usize,
    pub failed_protocols: usize,
    /// Failure reason per adapter that returned nothing
    pub errors: BTreeMap<Protocol, String>,
    pub timestamp: DateTime<Utc>,
}

impl AggregationResult {
    /// Build from an already sorted opportunity list
    pub fn from_sorted(
        token: impl Into<String>,
        chain_id: ChainId,
        opportunities: Vec<Opportunity>,
        successful_protocols: usize,
        errors: BTreeMap<Protocol, String>,
    ) -> Self {
        let best = opportunities.first().cloned();
        let worst = opportunities.last().cloned();
        let apy_spread = match (&best, &worst) {
            (Some(b), Some(w)) if opportunities.len() >= 2 => b.supply_apy - w.supply_apy,
            _ => Decimal::ZERO,
        };

        Self {
            token: token.into(),
            chain_id,
            opportunities,
            best,
            worst,
            apy_spread,
            successful_protocols,
            failed_protocols: errors.len(),
            errors,
            timestamp: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.opportunities.is_empty()
    }

    /// Protocols that could not be queried, as "protocol (reason)"
    pub fn failure_summary(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|(protocol, reason)| format!("{} ({})", protocol, reason))
            .collect();
        Some(parts.join(", "))
    }
}

/// Protocol-wide health and depth, as reported by an adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolMetrics {
    pub protocol: Protocol,
    pub chain_id: ChainId,
    pub tvl_usd: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_borrows_usd: Option<Decimal>,
    pub available_liquidity_usd: Decimal,
    pub avg_supply_apy: Decimal,
    pub is_healthy: bool,
    pub last_updated: DateTime<Utc>,
}

/// Per-chain roll-up of every adapter's protocol metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedMetrics {
    pub chain_id: ChainId,
    pub total_tvl_usd: Decimal,
    pub total_available_liquidity_usd: Decimal,
    /// TVL-weighted average supply APY
    pub weighted_avg_supply_apy: Decimal,
    pub best_supply_apy: Decimal,
    pub best_protocol: Option<Protocol>,
    pub healthy_protocol_count: usize,
    pub total_protocol_count: usize,
    pub protocol_metrics: Vec<ProtocolMetrics>,
    pub errors: BTreeMap<Protocol, String>,
    pub timestamp: DateTime<Utc>,
}

/// Head-to-head result for two protocols on one market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolComparison {
    pub winner: Protocol,
    /// Absolute APY gap, or the winner's full APY when the other side is missing
    pub apy_difference: Decimal,
    pub protocol1: Option<Opportunity>,
    pub protocol2: Option<Opportunity>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn opp(protocol: Protocol, apy: Decimal) -> Opportunity {
        Opportunity::new(protocol, "USDC", "0x", 1, apy, dec!(1000), dec!(500))
    }

    #[test]
    fn test_spread_and_extremes() {
        let result = AggregationResult::from_sorted(
            "USDC",
            1,
            vec![opp(Protocol::Morpho, dec!(6.5)), opp(Protocol::Aave, dec!(4.25))],
            2,
            BTreeMap::new(),
        );
        assert_eq!(result.apy_spread, dec!(2.25));
        assert_eq!(result.best.as_ref().unwrap().protocol, Protocol::Morpho);
        assert_eq!(result.worst.as_ref().unwrap().protocol, Protocol::Aave);
        assert!(result.failure_summary().is_none());
    }

    #[test]
    fn test_single_opportunity_has_zero_spread() {
        let result = AggregationResult::from_sorted(
            "USDC",
            1,
            vec![opp(Protocol::Aave, dec!(4.25))],
            1,
            BTreeMap::new(),
        );
        assert_eq!(result.apy_spread, Decimal::ZERO);
        assert_eq!(result.best, result.worst);
    }

    #[test]
    fn test_empty_result() {
        let mut errors = BTreeMap::new();
        errors.insert(Protocol::Aave, "rpc down".to_string());
        let result = AggregationResult::from_sorted("USDC", 1, Vec::new(), 0, errors);
        assert!(result.is_empty());
        assert!(result.best.is_none());
        assert!(result.worst.is_none());
        assert_eq!(result.failed_protocols, 1);
        assert_eq!(result.failure_summary().unwrap(), "aave (rpc down)");
    }
}
