use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result, ValidationError};
use crate::money::MoneyValue;
use crate::portfolio::Portfolio;
use crate::rebalancing::TradingConstraints;

/// What the user is saving for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalType {
    Retirement,
    Education,
    House,
    Vacation,
    General,
}

/// Risk appetite attached to a goal. Each profile maps to a trading
/// constraint preset used when the caller does not supply one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskProfile {
    Conservative,
    Moderate,
    Risky,
}

impl RiskProfile {
    pub fn constraints(&self) -> TradingConstraints {
        match self {
            RiskProfile::Conservative => TradingConstraints::conservative(),
            RiskProfile::Moderate => TradingConstraints::moderate(),
            RiskProfile::Risky => TradingConstraints::risky(),
        }
    }
}

/// An investment goal: one portfolio plus the simplified metrics the user
/// actually sees (balance, depositado neto, ganado).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub name: String,
    pub goal_type: GoalType,
    pub risk_profile: RiskProfile,
    pub portfolio: Portfolio,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_amount: Option<MoneyValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    /// Balance: current value of the goal.
    pub fn balance(&self) -> MoneyValue {
        self.portfolio.total_value()
    }

    /// Depositado neto: everything the user has put in.
    pub fn depositado_neto(&self) -> MoneyValue {
        self.portfolio.total_deposited()
    }

    /// Ganado: balance minus depositado neto.
    pub fn ganado(&self) -> MoneyValue {
        self.balance() - self.depositado_neto()
    }

    /// Progress toward the target amount, in percent. None without a target.
    pub fn progress_percentage(&self) -> Option<Decimal> {
        let target = self.target_amount?;
        if target.is_zero() {
            return None;
        }
        Some(self.balance() / target * Decimal::ONE_HUNDRED)
    }

    pub fn validate(&self) -> Result<()> {
        self.portfolio.validate()?;
        if let Some(target) = self.target_amount {
            if target <= MoneyValue::ZERO {
                return Err(Error::Validation(ValidationError::InvalidInput(
                    "Goal target amount must be positive".to_string(),
                )));
            }
        }
        Ok(())
    }
}

/// Input for creating a goal; ids and the empty portfolio are assigned by
/// the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGoal {
    pub name: String,
    pub goal_type: GoalType,
    pub risk_profile: RiskProfile,
    #[serde(default)]
    pub initial_cash: MoneyValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_amount: Option<MoneyValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<DateTime<Utc>>,
}

impl NewGoal {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Goal name cannot be empty".to_string(),
            )));
        }
        if self.initial_cash.is_sign_negative() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Initial cash cannot be negative".to_string(),
            )));
        }
        if let Some(target) = self.target_amount {
            if target <= MoneyValue::ZERO {
                return Err(Error::Validation(ValidationError::InvalidInput(
                    "Goal target amount must be positive".to_string(),
                )));
            }
        }
        Ok(())
    }
}
