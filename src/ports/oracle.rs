use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::math::GWEI;
use crate::domain::{gas_cost_usd, ChainId, GasEstimate};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    #[error("No price data for chain {0}")]
    UnknownChain(ChainId),

    #[error("Price source unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(Decimal),
}

/// Scalar gas and native-asset price inputs for cost estimation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GasOracle: Send + Sync {
    async fn gas_price_gwei(&self, chain_id: ChainId) -> Result<Decimal, OracleError>;

    async fn native_price_usd(&self, chain_id: ChainId) -> Result<Decimal, OracleError>;
}

/// Price `gas_units` on `chain_id` using both oracle readings
pub async fn estimate_gas(
    oracle: &dyn GasOracle,
    chain_id: ChainId,
    gas_units: u64,
) -> Result<GasEstimate, OracleError> {
    let gas_price_gwei = oracle.gas_price_gwei(chain_id).await?;
    let native_price_usd = oracle.native_price_usd(chain_id).await?;

    if gas_price_gwei < Decimal::ZERO {
        return Err(OracleError::InvalidPrice(gas_price_gwei));
    }
    if native_price_usd < Decimal::ZERO {
        return Err(OracleError::InvalidPrice(native_price_usd));
    }

    Ok(GasEstimate {
        gas_units,
        gas_price_gwei,
        native_price_usd,
        gas_cost_native: Decimal::from(gas_units) * gas_price_gwei * GWEI,
        gas_cost_usd: gas_cost_usd(gas_units, gas_price_gwei, native_price_usd),
    })
}
