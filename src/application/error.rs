use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::{ChainId, RiskLevel, UnknownStrategy};

/// Caller-facing engine errors
///
/// Adapter failures never surface here; they are recorded per protocol in
/// the result they belong to.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    UnknownStrategy(#[from] UnknownStrategy),

    #[error("No usable opportunities for {token} ({risk_level}) on any chain")]
    NoOpportunities { token: String, risk_level: RiskLevel },
}

impl EngineError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        EngineError::InvalidInput(msg.into())
    }
}

pub(crate) fn require_token(token: &str) -> Result<(), EngineError> {
    if token.trim().is_empty() {
        return Err(EngineError::invalid("token symbol must not be empty"));
    }
    Ok(())
}

pub(crate) fn require_wallet(wallet: &str) -> Result<(), EngineError> {
    if wallet.trim().is_empty() {
        return Err(EngineError::invalid("wallet address must not be empty"));
    }
    Ok(())
}

pub(crate) fn require_chain(chain_id: ChainId) -> Result<(), EngineError> {
    if chain_id == 0 {
        return Err(EngineError::invalid("chain id must be non-zero"));
    }
    Ok(())
}

pub(crate) fn require_non_negative(name: &str, value: Decimal) -> Result<(), EngineError> {
    if value < Decimal::ZERO {
        return Err(EngineError::invalid(format!("{} must not be negative (got {})", name, value)));
    }
    Ok(())
}

pub(crate) fn require_positive(name: &str, value: Decimal) -> Result<(), EngineError> {
    if value <= Decimal::ZERO {
        return Err(EngineError::invalid(format!("{} must be positive (got {})", name, value)));
    }
    Ok(())
}
