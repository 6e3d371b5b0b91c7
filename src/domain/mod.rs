//! Domain Layer - Core yield model for the engine
//!
//! Pure types and decimal math with no I/O. Adapters feed data in through
//! the ports layer; the application layer orchestrates.
//!
//! - `opportunity`: normalized yield offer plus filter/sort/utilization
//! - `position`: wallet holdings and their roll-up
//! - `risk`: risk profiles and rebalance thresholds
//! - `aggregation`: aggregator result shapes
//! - `recommendation`: optimizer outputs
//! - `math`: break-even, gas and gain arithmetic
//! - `allocation`: per-chain protocol splits for the multi-chain optimizer

pub mod aggregation;
pub mod allocation;
pub mod math;
pub mod opportunity;
pub mod position;
pub mod protocol;
pub mod recommendation;
pub mod risk;

pub use aggregation::{AggregatedMetrics, AggregationResult, ProtocolComparison, ProtocolMetrics};
pub use allocation::{
    ChainOpportunity, ChainResult, GasSummary, MultiChainResult, ProtocolAllocation,
    TargetApyRange,
};
pub use math::{break_even_days, gas_cost_usd, round2, BreakEven};
pub use opportunity::{
    filter, sort_by_apy_descending, utilization, Opportunity, OpportunityFilter, SortKey,
};
pub use position::{Position, PositionError, PositionSummary};
pub use protocol::{chain_name, ChainId, Protocol, UnknownProtocol};
pub use recommendation::{
    Action, GasEstimate, PositionComparison, RebalanceRecommendation, StrategyKind,
    UnknownStrategy,
};
pub use risk::{RebalanceConfig, RiskLevel, RiskProfile, UnknownRiskLevel};
