//! Opportunity Model
//!
//! The normalized, point-in-time yield offer every adapter result is mapped
//! into, plus the filter/sort/utilization utilities the rest of the engine
//! relies on. Values are compared as `Decimal`, never as floats, so a value
//! sitting right on a threshold stays on the correct side of it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::math::HUNDRED;
use super::protocol::{ChainId, Protocol};

/// A yield offer from one source for one token on one chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub protocol: Protocol,
    /// Token symbol, e.g. "USDC"
    pub token: String,
    pub token_address: String,
    pub chain_id: ChainId,
    /// "4.82" = 4.82% annual yield
    pub supply_apy: Decimal,
    /// Absent for vault sources without a borrow side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borrow_apy: Option<Decimal>,
    /// Total value locked, USD
    pub tvl: Decimal,
    /// Available liquidity, USD
    pub liquidity: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utilization: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

impl Opportunity {
    pub fn new(
        protocol: Protocol,
        token: impl Into<String>,
        token_address: impl Into<String>,
        chain_id: ChainId,
        supply_apy: Decimal,
        tvl: Decimal,
        liquidity: Decimal,
    ) -> Self {
        Self {
            protocol,
            token: token.into(),
            token_address: token_address.into(),
            chain_id,
            supply_apy,
            borrow_apy: None,
            tvl,
            liquidity,
            utilization: Some(utilization(tvl, liquidity)),
            timestamp: Utc::now(),
        }
    }

    pub fn with_borrow_apy(mut self, borrow_apy: Decimal) -> Self {
        self.borrow_apy = Some(borrow_apy);
        self
    }

    /// Liquidity above TVL means the source reported inconsistent numbers
    pub fn has_liquidity_anomaly(&self) -> bool {
        self.liquidity > self.tvl
    }

    pub fn utilization(&self) -> Decimal {
        self.utilization
            .unwrap_or_else(|| utilization(self.tvl, self.liquidity))
    }
}

/// Field to order a result set by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Apy,
    Tvl,
    Liquidity,
}

/// Optional constraints applied to an opportunity set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpportunityFilter {
    /// Keep `supply_apy >= min_apy`
    pub min_apy: Option<Decimal>,
    /// Keep `supply_apy <= max_apy`
    pub max_apy: Option<Decimal>,
    /// Keep `tvl >= min_tvl`
    pub min_tvl: Option<Decimal>,
    /// Only query/keep these protocols
    pub protocols: Option<Vec<Protocol>>,
    pub exclude_protocols: Option<Vec<Protocol>>,
    pub sort_by: SortKey,
    /// Applied after sorting
    pub limit: Option<usize>,
}

impl OpportunityFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_apy(mut self, min_apy: Decimal) -> Self {
        self.min_apy = Some(min_apy);
        self
    }

    pub fn with_max_apy(mut self, max_apy: Decimal) -> Self {
        self.max_apy = Some(max_apy);
        self
    }

    pub fn with_min_tvl(mut self, min_tvl: Decimal) -> Self {
        self.min_tvl = Some(min_tvl);
        self
    }

    pub fn with_protocols(mut self, protocols: Vec<Protocol>) -> Self {
        self.protocols = Some(protocols);
        self
    }

    pub fn excluding(mut self, protocols: Vec<Protocol>) -> Self {
        self.exclude_protocols = Some(protocols);
        self
    }

    pub fn sorted_by(mut self, key: SortKey) -> Self {
        self.sort_by = key;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a protocol should be queried at all
    pub fn includes_protocol(&self, protocol: Protocol) -> bool {
        let included = self
            .protocols
            .as_ref()
            .map_or(true, |list| list.contains(&protocol));
        let excluded = self
            .exclude_protocols
            .as_ref()
            .is_some_and(|list| list.contains(&protocol));
        included && !excluded
    }

    pub fn matches(&self, opp: &Opportunity) -> bool {
        if !self.includes_protocol(opp.protocol) {
            return false;
        }
        if self.min_apy.is_some_and(|min| opp.supply_apy < min) {
            return false;
        }
        if self.max_apy.is_some_and(|max| opp.supply_apy > max) {
            return false;
        }
        if self.min_tvl.is_some_and(|min| opp.tvl < min) {
            return false;
        }
        true
    }
}

/// Filter, sort, then truncate to `limit`
pub fn filter(opportunities: &[Opportunity], filter: &OpportunityFilter) -> Vec<Opportunity> {
    let kept: Vec<Opportunity> = opportunities
        .iter()
        .filter(|opp| filter.matches(opp))
        .cloned()
        .collect();

    let mut sorted = match filter.sort_by {
        SortKey::Apy => sort_by_apy_descending(kept),
        SortKey::Tvl => sort_descending_by(kept, |o| o.tvl),
        SortKey::Liquidity => sort_descending_by(kept, |o| o.liquidity),
    };

    if let Some(limit) = filter.limit {
        sorted.truncate(limit);
    }
    sorted
}

/// Highest APY first; equal APYs put the deeper pool first. Stable.
pub fn sort_by_apy_descending(mut opportunities: Vec<Opportunity>) -> Vec<Opportunity> {
    opportunities.sort_by(compare_apy_descending);
    opportunities
}

/// Ordering used by `sort_by_apy_descending`
pub fn compare_apy_descending(a: &Opportunity, b: &Opportunity) -> Ordering {
    b.supply_apy
        .cmp(&a.supply_apy)
        .then_with(|| b.tvl.cmp(&a.tvl))
}

fn sort_descending_by<F>(mut opportunities: Vec<Opportunity>, key: F) -> Vec<Opportunity>
where
    F: Fn(&Opportunity) -> Decimal,
{
    opportunities.sort_by(|a, b| key(b).cmp(&key(a)).then_with(|| compare_apy_descending(a, b)));
    opportunities
}

/// Share of TVL currently lent out, in percent. Zero TVL gives zero.
pub fn utilization(tvl: Decimal, liquidity: Decimal) -> Decimal {
    if tvl.is_zero() {
        return Decimal::ZERO;
    }
    (tvl - liquidity) / tvl * HUNDRED
}
