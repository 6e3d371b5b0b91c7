//! Adapters Layer - Port Implementations
//!
//! - Snapshot: protocol adapters served from a TOML market snapshot
//! - Oracle: static gas and native-asset prices
//! - CLI: Command-line interface handlers

pub mod cli;
pub mod oracle;
pub mod snapshot;

pub use cli::CliApp;
pub use oracle::{StaticGasOracle, StaticOracleConfig};
pub use snapshot::{MarketSnapshot, SnapshotAdapter, SnapshotError};
