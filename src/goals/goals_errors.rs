use thiserror::Error;

use crate::money::MoneyValue;

#[derive(Error, Debug)]
pub enum GoalError {
    #[error("Goal '{0}' not found")]
    NotFound(String),

    #[error("Insufficient cash: available {available}, requested {requested}")]
    InsufficientCash {
        available: MoneyValue,
        requested: MoneyValue,
    },

    #[error("Cash movements must be positive, got {0}")]
    InvalidAmount(MoneyValue),
}
