use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CONFIDENCE_LEVEL, DEFAULT_RISK_AVERSION, DEFAULT_SCENARIOS};
use crate::money::MoneyValue;

/// Direction of a proposed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeAction {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "BUY"),
            TradeAction::Sell => write!(f, "SELL"),
        }
    }
}

/// A proposed order. `value` is always exactly `shares × current_price`;
/// any step that rescales shares recomputes the value from scratch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub ticker: String,
    pub action: TradeAction,
    pub shares: MoneyValue,
    pub current_price: MoneyValue,
    pub value: MoneyValue,
    pub reason: String,
}

impl Trade {
    pub fn new(
        ticker: &str,
        action: TradeAction,
        shares: MoneyValue,
        current_price: MoneyValue,
        reason: String,
    ) -> Self {
        Trade {
            ticker: ticker.to_string(),
            action,
            shares,
            current_price,
            value: shares * current_price,
            reason,
        }
    }

    /// Replaces the share count, recomputing the value invariant.
    pub fn with_shares(&self, shares: MoneyValue) -> Self {
        Trade {
            ticker: self.ticker.clone(),
            action: self.action,
            shares,
            current_price: self.current_price,
            value: shares * self.current_price,
            reason: self.reason.clone(),
        }
    }

    /// Scales the share count by a factor and tags the reason with the
    /// constraint that caused it.
    pub fn scaled(&self, factor: Decimal, reason_suffix: &str) -> Self {
        let mut scaled = self.with_shares(self.shares * factor);
        if !scaled.reason.contains(reason_suffix) {
            scaled.reason = format!("{} {}", scaled.reason, reason_suffix);
        }
        scaled
    }
}

/// Strategy selection for a rebalance call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum StrategyConfig {
    Simple,
    CVaR {
        #[serde(default = "default_scenarios")]
        n_scenarios: u32,
        #[serde(default = "default_confidence_level")]
        confidence_level: f64,
        #[serde(default = "default_risk_aversion")]
        risk_aversion: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seed: Option<u64>,
    },
}

fn default_scenarios() -> u32 {
    DEFAULT_SCENARIOS as u32
}

fn default_confidence_level() -> f64 {
    DEFAULT_CONFIDENCE_LEVEL
}

fn default_risk_aversion() -> f64 {
    DEFAULT_RISK_AVERSION
}

impl StrategyConfig {
    /// CVaR configuration with every knob at its default.
    pub fn cvar_defaults() -> Self {
        StrategyConfig::CVaR {
            n_scenarios: default_scenarios(),
            confidence_level: default_confidence_level(),
            risk_aversion: default_risk_aversion(),
            seed: None,
        }
    }
}

/// Diagnostic metrics attached to a rebalance result. Serialized as a map;
/// the CVaR-only entries are omitted for the simple strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceMetrics {
    pub n_trades: usize,
    pub turnover_pct: f64,
    pub max_drift_before: f64,
    pub max_drift_after: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cvar: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimal_weights: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covariance_jitter: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// The outcome of a rebalance call: proposed trades in stable order plus
/// the totals and diagnostics. The source portfolio is left untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceResult {
    pub trades: Vec<Trade>,
    pub total_buy_value: MoneyValue,
    pub total_sell_value: MoneyValue,
    pub estimated_cost: MoneyValue,
    #[serde(with = "weight_map_serde")]
    pub final_allocations: BTreeMap<String, Decimal>,
    pub metrics: RebalanceMetrics,
}

impl RebalanceResult {
    /// Net cash generated by the trades; negative when the plan consumes
    /// cash.
    pub fn net_cash_change(&self) -> MoneyValue {
        self.total_sell_value - self.total_buy_value - self.estimated_cost
    }

    /// Traded value on one side of the book, the usual turnover statistic.
    pub fn turnover(&self) -> MoneyValue {
        (self.total_buy_value + self.total_sell_value) / Decimal::TWO
    }
}

/// Allocation weights serialize as decimal strings with four fractional
/// digits so downstream consumers never see float artifacts.
mod weight_map_serde {
    use std::collections::BTreeMap;
    use std::str::FromStr;

    use rust_decimal::Decimal;
    use serde::de::Error as DeError;
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::constants::WEIGHT_DISPLAY_PRECISION;

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<String, Decimal>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_map(Some(map.len()))?;
        for (ticker, weight) in map {
            let formatted = format!(
                "{:.prec$}",
                weight.round_dp(WEIGHT_DISPLAY_PRECISION),
                prec = WEIGHT_DISPLAY_PRECISION as usize
            );
            out.serialize_entry(ticker, &formatted)?;
        }
        out.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, Decimal>, D::Error> {
        let raw: BTreeMap<String, String> = BTreeMap::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(ticker, value)| {
                Decimal::from_str(&value)
                    .map(|weight| (ticker, weight))
                    .map_err(DeError::custom)
            })
            .collect()
    }
}
