//! Static Gas Oracle
//!
//! Gas and native-asset prices from configuration, falling back to typical
//! per-chain values. Good enough for ranking; not for transaction pricing.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::protocol::{ARBITRUM, BASE, ETHEREUM, POLYGON, SEPOLIA};
use crate::domain::ChainId;
use crate::ports::{GasOracle, OracleError};

/// Price override for one chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainPrices {
    pub chain_id: ChainId,
    #[serde(default)]
    pub gas_price_gwei: Option<Decimal>,
    #[serde(default)]
    pub native_price_usd: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticOracleConfig {
    /// Used for chains with neither an override nor a built-in value
    pub default_gas_price_gwei: Option<Decimal>,
    pub default_native_price_usd: Option<Decimal>,
    pub chains: Vec<ChainPrices>,
}

impl StaticOracleConfig {
    pub fn validate(&self) -> Result<(), String> {
        let defaults = [self.default_gas_price_gwei, self.default_native_price_usd];
        let overrides = self
            .chains
            .iter()
            .flat_map(|c| [c.gas_price_gwei, c.native_price_usd]);
        for price in defaults.into_iter().chain(overrides).flatten() {
            if price < Decimal::ZERO {
                return Err(format!("oracle prices must not be negative (got {})", price));
            }
        }
        Ok(())
    }
}

/// Typical gas price for chains the engine knows
pub fn fallback_gas_price_gwei(chain_id: ChainId) -> Option<Decimal> {
    match chain_id {
        ETHEREUM => Some(dec!(30)),
        BASE => Some(dec!(0.01)),
        ARBITRUM => Some(dec!(0.1)),
        POLYGON => Some(dec!(50)),
        SEPOLIA => Some(dec!(1)),
        _ => None,
    }
}

/// Native asset price for chains the engine knows (ETH for L2s, POL on Polygon)
pub fn fallback_native_price_usd(chain_id: ChainId) -> Option<Decimal> {
    match chain_id {
        ETHEREUM | BASE | ARBITRUM => Some(dec!(3000)),
        POLYGON => Some(dec!(0.85)),
        SEPOLIA => Some(Decimal::ZERO),
        _ => None,
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticGasOracle {
    config: StaticOracleConfig,
}

impl StaticGasOracle {
    pub fn new(config: StaticOracleConfig) -> Self {
        Self { config }
    }

    fn override_for(&self, chain_id: ChainId) -> Option<&ChainPrices> {
        self.config.chains.iter().find(|c| c.chain_id == chain_id)
    }
}

#[async_trait]
impl GasOracle for StaticGasOracle {
    async fn gas_price_gwei(&self, chain_id: ChainId) -> Result<Decimal, OracleError> {
        self.override_for(chain_id)
            .and_then(|c| c.gas_price_gwei)
            .or_else(|| fallback_gas_price_gwei(chain_id))
            .or(self.config.default_gas_price_gwei)
            .ok_or(OracleError::UnknownChain(chain_id))
    }

    async fn native_price_usd(&self, chain_id: ChainId) -> Result<Decimal, OracleError> {
        self.override_for(chain_id)
            .and_then(|c| c.native_price_usd)
            .or_else(|| fallback_native_price_usd(chain_id))
            .or(self.config.default_native_price_usd)
            .ok_or(OracleError::UnknownChain(chain_id))
    }
}
