use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result, ValidationError};
use crate::money::MoneyValue;

/// Trading constraints applied to every generated trade list.
///
/// Real-world frictions the optimizer alone does not see: lot economics
/// (minimum trade size), churn control (threshold, turnover cap), cash
/// management (liquidity floor), diversification (position cap), and the
/// broker's fractional-share policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConstraints {
    /// Trades below this value are dropped rather than executed.
    pub min_trade_value: MoneyValue,

    /// A position is only touched when its weight drift reaches this
    /// fraction.
    pub rebalance_threshold: Decimal,

    /// Cap on total traded value as a fraction of portfolio value. None
    /// means unlimited.
    pub max_turnover: Option<Decimal>,

    /// Fraction of portfolio value that must remain in cash after the
    /// trades settle.
    pub min_liquidity: Decimal,

    /// Whether fractional share counts may be emitted; when false, share
    /// counts are truncated to integers.
    pub allow_fractional_shares: bool,

    /// Upper bound on any single position's weight. None means unbounded.
    pub max_position_size: Option<Decimal>,

    /// Proportional transaction cost applied to total traded value.
    /// Historically named in basis points; the value is a plain fraction.
    pub transaction_cost_bps: Decimal,
}

impl Default for TradingConstraints {
    fn default() -> Self {
        TradingConstraints {
            min_trade_value: dec!(10).into(),
            rebalance_threshold: dec!(0.02),
            max_turnover: None,
            min_liquidity: dec!(0.00),
            allow_fractional_shares: true,
            max_position_size: None,
            transaction_cost_bps: dec!(0.0025),
        }
    }
}

impl TradingConstraints {
    /// Preset for conservative goals: half the portfolio stays liquid and
    /// even small drifts are corrected.
    pub fn conservative() -> Self {
        TradingConstraints {
            min_liquidity: dec!(0.50),
            rebalance_threshold: dec!(0.01),
            max_turnover: Some(dec!(0.20)),
            ..Default::default()
        }
    }

    /// Preset for moderate goals.
    pub fn moderate() -> Self {
        TradingConstraints {
            min_liquidity: dec!(0.10),
            rebalance_threshold: dec!(0.02),
            max_turnover: Some(dec!(0.50)),
            ..Default::default()
        }
    }

    /// Preset for risky goals: a small emergency cash buffer, wide
    /// threshold, no turnover cap.
    pub fn risky() -> Self {
        TradingConstraints {
            min_liquidity: dec!(0.05),
            rebalance_threshold: dec!(0.05),
            max_turnover: None,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_trade_value.is_sign_negative() {
            return Err(invalid("min_trade_value cannot be negative"));
        }
        if !fraction_in_unit_range(self.rebalance_threshold) {
            return Err(invalid("rebalance_threshold must be between 0 and 1"));
        }
        if !fraction_in_unit_range(self.min_liquidity) {
            return Err(invalid("min_liquidity must be between 0 and 1"));
        }
        if let Some(turnover) = self.max_turnover {
            if !fraction_in_unit_range(turnover) {
                return Err(invalid("max_turnover must be between 0 and 1"));
            }
        }
        if let Some(cap) = self.max_position_size {
            if !fraction_in_unit_range(cap) {
                return Err(invalid("max_position_size must be between 0 and 1"));
            }
        }
        if self.transaction_cost_bps < Decimal::ZERO {
            return Err(invalid("transaction_cost_bps cannot be negative"));
        }
        Ok(())
    }
}

fn fraction_in_unit_range(value: Decimal) -> bool {
    value >= Decimal::ZERO && value <= Decimal::ONE
}

fn invalid(message: &str) -> Error {
    Error::Validation(ValidationError::InvalidInput(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine_contract() {
        let constraints = TradingConstraints::default();
        assert_eq!(constraints.min_trade_value.amount(), dec!(10));
        assert_eq!(constraints.rebalance_threshold, dec!(0.02));
        assert_eq!(constraints.max_turnover, None);
        assert_eq!(constraints.min_liquidity, dec!(0));
        assert!(constraints.allow_fractional_shares);
        assert_eq!(constraints.max_position_size, None);
        assert_eq!(constraints.transaction_cost_bps, dec!(0.0025));
        assert!(constraints.validate().is_ok());
    }

    #[test]
    fn presets_carry_their_profiles() {
        let conservative = TradingConstraints::conservative();
        assert_eq!(conservative.min_liquidity, dec!(0.50));
        assert_eq!(conservative.rebalance_threshold, dec!(0.01));
        assert_eq!(conservative.max_turnover, Some(dec!(0.20)));

        let moderate = TradingConstraints::moderate();
        assert_eq!(moderate.min_liquidity, dec!(0.10));
        assert_eq!(moderate.rebalance_threshold, dec!(0.02));

        let risky = TradingConstraints::risky();
        assert_eq!(risky.min_liquidity, dec!(0.05));
        assert_eq!(risky.rebalance_threshold, dec!(0.05));
        assert_eq!(risky.max_turnover, None);
    }

    #[test]
    fn validate_rejects_out_of_range_fractions() {
        let mut constraints = TradingConstraints {
            rebalance_threshold: dec!(1.5),
            ..Default::default()
        };
        assert!(constraints.validate().is_err());

        constraints = TradingConstraints {
            max_turnover: Some(dec!(-0.1)),
            ..Default::default()
        };
        assert!(constraints.validate().is_err());

        constraints = TradingConstraints {
            transaction_cost_bps: dec!(-0.01),
            ..Default::default()
        };
        assert!(constraints.validate().is_err());
    }

    #[test]
    fn deserializes_with_partial_fields() {
        let constraints: TradingConstraints =
            serde_json::from_str(r#"{"min_liquidity": "0.25"}"#).unwrap();
        assert_eq!(constraints.min_liquidity, dec!(0.25));
        assert_eq!(constraints.rebalance_threshold, dec!(0.02));
    }
}
