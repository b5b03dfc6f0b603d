use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::assets::Asset;
use crate::constants::TARGET_SUM_EPSILON;
use crate::errors::{Error, Result, ValidationError};
use crate::money::MoneyValue;

/// A holding of one asset inside a portfolio, together with its target
/// allocation and the net amount deposited into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub ticker: String,
    pub shares: MoneyValue,
    pub target_allocation: Decimal,
    #[serde(default)]
    pub deposited: MoneyValue,
    pub asset: Asset,
}

impl Position {
    pub fn new(
        asset: Asset,
        shares: MoneyValue,
        target_allocation: Decimal,
        deposited: MoneyValue,
    ) -> Result<Self> {
        let position = Position {
            ticker: asset.ticker.clone(),
            shares,
            target_allocation,
            deposited,
            asset,
        };
        position.validate()?;
        Ok(position)
    }

    pub fn validate(&self) -> Result<()> {
        self.asset.validate()?;
        if self.ticker != self.asset.ticker {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Position ticker '{}' does not match asset ticker '{}'",
                self.ticker, self.asset.ticker
            ))));
        }
        if self.shares.is_sign_negative() {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Position '{}' cannot hold negative shares",
                self.ticker
            ))));
        }
        if self.target_allocation < Decimal::ZERO || self.target_allocation > Decimal::ONE {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Target allocation for '{}' must be between 0 and 1, got {}",
                self.ticker, self.target_allocation
            ))));
        }
        if self.deposited.is_sign_negative() {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Deposited amount for '{}' cannot be negative",
                self.ticker
            ))));
        }
        Ok(())
    }

    /// Market value at the asset's decision-time price.
    pub fn market_value(&self) -> MoneyValue {
        self.shares * self.asset.current_price
    }
}

/// A set of positions plus free cash. Positions keep insertion order, which
/// fixes the ticker ordering used by every weight vector derived from this
/// portfolio for the duration of a rebalance call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub id: String,
    #[serde(default)]
    pub cash: MoneyValue,
    #[serde(default)]
    pub positions: Vec<Position>,
}

impl Portfolio {
    pub fn new(id: &str, cash: MoneyValue) -> Result<Self> {
        if cash.is_sign_negative() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Portfolio cash cannot be negative".to_string(),
            )));
        }
        Ok(Portfolio {
            id: id.to_string(),
            cash,
            positions: Vec::new(),
        })
    }

    /// Adds a position, or replaces the existing one holding the same
    /// ticker (the slot keeps its place in the ordering).
    pub fn add_position(&mut self, position: Position) -> Result<()> {
        position.validate()?;
        match self
            .positions
            .iter_mut()
            .find(|existing| existing.ticker == position.ticker)
        {
            Some(slot) => *slot = position,
            None => self.positions.push(position),
        }
        Ok(())
    }

    pub fn position(&self, ticker: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.ticker == ticker)
    }

    /// Tickers in the fixed portfolio ordering.
    pub fn tickers(&self) -> Vec<String> {
        self.positions.iter().map(|p| p.ticker.clone()).collect()
    }

    /// Balance: cash plus the market value of every position.
    pub fn total_value(&self) -> MoneyValue {
        self.cash + self.invested_value()
    }

    /// Market value of the positions, cash excluded.
    pub fn invested_value(&self) -> MoneyValue {
        self.positions.iter().map(|p| p.market_value()).sum()
    }

    /// Depositado neto: cash plus everything deposited into positions.
    pub fn total_deposited(&self) -> MoneyValue {
        self.cash + self.positions.iter().map(|p| p.deposited).sum()
    }

    /// Ganado: balance minus net deposits.
    pub fn total_earned(&self) -> MoneyValue {
        self.total_value() - self.total_deposited()
    }

    /// Fraction of total value (cash included) held in one ticker.
    pub fn current_allocation(&self, ticker: &str) -> Decimal {
        let total = self.total_value();
        if total.is_zero() {
            return Decimal::ZERO;
        }
        match self.position(ticker) {
            Some(position) => position.market_value() / total,
            None => Decimal::ZERO,
        }
    }

    /// Allocations for every position, in portfolio order.
    pub fn current_allocations(&self) -> Vec<(String, Decimal)> {
        self.positions
            .iter()
            .map(|p| (p.ticker.clone(), self.current_allocation(&p.ticker)))
            .collect()
    }

    /// Drift per position: target minus current allocation. Positive means
    /// the position is underweight.
    pub fn allocation_drift(&self) -> Vec<(String, Decimal)> {
        self.positions
            .iter()
            .map(|p| {
                let current = self.current_allocation(&p.ticker);
                (p.ticker.clone(), p.target_allocation - current)
            })
            .collect()
    }

    /// Current weights normalized by invested value, cash excluded. The
    /// zero vector when nothing is invested.
    pub fn current_weights(&self) -> Vec<f64> {
        let invested = self.invested_value();
        if invested <= MoneyValue::ZERO {
            return vec![0.0; self.positions.len()];
        }
        self.positions
            .iter()
            .map(|p| (p.market_value() / invested).to_f64().unwrap_or(0.0))
            .collect()
    }

    /// Target weights normalized so they sum to one, cash slack excluded.
    /// The zero vector when every target is zero.
    pub fn target_weights(&self) -> Vec<f64> {
        let total: Decimal = self.positions.iter().map(|p| p.target_allocation).sum();
        if total <= Decimal::ZERO {
            return vec![0.0; self.positions.len()];
        }
        self.positions
            .iter()
            .map(|p| (p.target_allocation / total).to_f64().unwrap_or(0.0))
            .collect()
    }

    /// Sum of the raw target allocations; the slack up to 1 is the target
    /// cash fraction.
    pub fn target_invested_fraction(&self) -> Decimal {
        self.positions.iter().map(|p| p.target_allocation).sum()
    }

    /// Checks the portfolio invariants: unique tickers, valid positions,
    /// non-negative cash, and targets summing to at most 1.
    pub fn validate(&self) -> Result<()> {
        if self.cash.is_sign_negative() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Portfolio cash cannot be negative".to_string(),
            )));
        }
        for (index, position) in self.positions.iter().enumerate() {
            position.validate()?;
            if self.positions[..index]
                .iter()
                .any(|other| other.ticker == position.ticker)
            {
                return Err(Error::Validation(ValidationError::InvalidInput(format!(
                    "Duplicate position for ticker '{}'",
                    position.ticker
                ))));
            }
        }
        let total_target = self.target_invested_fraction();
        if total_target > Decimal::ONE + TARGET_SUM_EPSILON {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Target allocations sum to {}, which exceeds 1",
                total_target
            ))));
        }
        Ok(())
    }
}
