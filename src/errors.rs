//! Core error types for the rebalancing engine.
//!
//! Per-module errors (money, goals, risk, rebalancing) live next to their
//! modules and are folded into the root [`Error`] here. Recoverable
//! conditions (optimizer fallback, unreachable liquidity floor) are not
//! errors; they surface as warnings inside the rebalance result.

use std::num::ParseFloatError;
use thiserror::Error;

use crate::goals::GoalError;
use crate::money::MoneyError;
use crate::rebalancing::RebalanceError;
use crate::risk::RiskError;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the rebalancing engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Money operation failed: {0}")]
    Money(#[from] MoneyError),

    #[error("Risk computation failed: {0}")]
    Risk(#[from] RiskError),

    #[error("Rebalance failed: {0}")]
    Rebalance(#[from] RebalanceError),

    #[error("Goal operation failed: {0}")]
    Goal(#[from] GoalError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Repository error: {0}")]
    Repository(String),
}

/// Validation errors for user input and data parsing.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Failed to parse number: {0}")]
    NumberParse(#[from] ParseFloatError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err))
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}
