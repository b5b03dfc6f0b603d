use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result, ValidationError};
use crate::money::MoneyValue;

/// Supported asset classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Stock,
    Bond,
    Etf,
    Cash,
}

/// Immutable descriptor of a tradable instrument.
///
/// Identity is the ticker; a portfolio never holds two positions on the
/// same ticker. Prices are decision-time unit prices, not live quotes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub ticker: String,
    #[serde(default)]
    pub name: String,
    pub asset_type: AssetType,
    pub current_price: MoneyValue,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Asset {
    /// Builds a validated asset. Tickers are normalized to uppercase.
    pub fn new(
        ticker: &str,
        name: &str,
        asset_type: AssetType,
        current_price: MoneyValue,
    ) -> Result<Self> {
        let asset = Asset {
            ticker: ticker.trim().to_uppercase(),
            name: name.to_string(),
            asset_type,
            current_price,
            currency: default_currency(),
        };
        asset.validate()?;
        Ok(asset)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ticker.trim().is_empty() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Asset ticker cannot be empty".to_string(),
            )));
        }
        if self.current_price <= MoneyValue::ZERO {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Asset '{}' must have a positive price",
                self.ticker
            ))));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn normalizes_ticker_to_uppercase() {
        let asset = Asset::new(" aapl ", "Apple Inc.", AssetType::Stock, dec!(180.50).into())
            .unwrap();
        assert_eq!(asset.ticker, "AAPL");
        assert_eq!(asset.currency, "USD");
    }

    #[test]
    fn rejects_empty_ticker_and_non_positive_price() {
        assert!(Asset::new("  ", "", AssetType::Stock, dec!(1).into()).is_err());
        assert!(Asset::new("AAPL", "", AssetType::Stock, dec!(0).into()).is_err());
        assert!(Asset::new("AAPL", "", AssetType::Stock, dec!(-5).into()).is_err());
    }

    #[test]
    fn asset_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&AssetType::Etf).unwrap(), "\"etf\"");
    }
}
