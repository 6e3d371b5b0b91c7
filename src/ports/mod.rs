//! Ports Layer - Trait definitions for external dependencies
//!
//! Following hexagonal architecture, these traits abstract:
//! - Yield sources (one `ProtocolAdapter` per lending/vault protocol)
//! - Gas and native-asset price feeds (`GasOracle`)

pub mod mocks;
pub mod oracle;
pub mod protocol;

pub use oracle::{estimate_gas, GasOracle, OracleError};
pub use protocol::{AdapterError, ProtocolAdapter};
