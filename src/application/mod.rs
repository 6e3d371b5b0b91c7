//! Application Layer - orchestrates adapters, strategies and the domain
//!
//! - `aggregator`: concurrent fan-out over protocol adapters
//! - `optimizer`: hold/move recommendations for a single position
//! - `multi_chain`: best chain and protocol split for new capital

pub mod aggregator;
pub mod error;
pub mod multi_chain;
pub mod optimizer;

pub use aggregator::{AggregatorConfig, YieldAggregator};
pub use error::EngineError;
pub use multi_chain::{MultiChainConfig, MultiChainOptimizer};
pub use optimizer::YieldOptimizer;
