//! Protocol and chain identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Yield sources the engine knows how to rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Lending pool protocol
    Aave,
    /// Base-rate money market
    Compound,
    /// Vault-based protocol (no borrow side)
    Morpho,
}

impl Protocol {
    /// All protocols in registry order
    pub const ALL: [Protocol; 3] = [Protocol::Aave, Protocol::Compound, Protocol::Morpho];

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Aave => "aave",
            Protocol::Compound => "compound",
            Protocol::Morpho => "morpho",
        }
    }

    /// Track-record trust score (0-100, higher = more trusted)
    pub fn trust_score(&self) -> u32 {
        match self {
            Protocol::Aave => 95,
            Protocol::Compound => 90,
            Protocol::Morpho => 85,
        }
    }

    /// Approximate gas units for one deposit
    pub fn deposit_gas_units(&self) -> u64 {
        match self {
            Protocol::Aave => 250_000,
            Protocol::Compound => 200_000,
            Protocol::Morpho => 220_000,
        }
    }

    /// Approximate gas units for one withdrawal
    pub fn withdraw_gas_units(&self) -> u64 {
        match self {
            Protocol::Aave => 200_000,
            Protocol::Compound => 150_000,
            Protocol::Morpho => 180_000,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("Unknown protocol: {0}")]
pub struct UnknownProtocol(pub String);

impl FromStr for Protocol {
    type Err = UnknownProtocol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aave" => Ok(Protocol::Aave),
            "compound" => Ok(Protocol::Compound),
            "morpho" => Ok(Protocol::Morpho),
            other => Err(UnknownProtocol(other.to_string())),
        }
    }
}

/// Numeric EVM chain identifier
pub type ChainId = u64;

pub const ETHEREUM: ChainId = 1;
pub const POLYGON: ChainId = 137;
pub const BASE: ChainId = 8453;
pub const ARBITRUM: ChainId = 42161;
pub const SEPOLIA: ChainId = 11_155_111;

/// Display name for a chain, "Chain <id>" when unknown
pub fn chain_name(chain_id: ChainId) -> String {
    match chain_id {
        ETHEREUM => "Ethereum".to_string(),
        POLYGON => "Polygon".to_string(),
        BASE => "Base".to_string(),
        ARBITRUM => "Arbitrum".to_string(),
        SEPOLIA => "Sepolia".to_string(),
        other => format!("Chain {}", other),
    }
}
