use std::collections::BTreeMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::constants::TARGET_SUM_EPSILON;
use crate::errors::Result;
use crate::money::MoneyValue;
use crate::portfolio::Portfolio;
use crate::rebalancing::constraints::TradingConstraints;
use crate::rebalancing::pipeline::ConstraintPipeline;
use crate::rebalancing::rebalancing_errors::RebalanceError;
use crate::rebalancing::rebalancing_model::{
    RebalanceMetrics, RebalanceResult, Trade, TradeAction,
};

/// Contract shared by every rebalancing strategy.
///
/// The provided methods are the parts both strategies must agree on: input
/// validation, drift-to-trade conversion, the constraint pipeline, the
/// final-allocation estimate, and the cost model. Keeping them here (and
/// not per strategy) is what keeps the two strategies comparable.
pub trait RebalanceStrategy {
    fn constraints(&self) -> &TradingConstraints;

    /// Computes the proposed trades for a portfolio snapshot. Never mutates
    /// the portfolio.
    fn rebalance(&self, portfolio: &Portfolio) -> Result<RebalanceResult>;

    /// Rejects empty portfolios and invalid target allocations before any
    /// math runs.
    fn validate_portfolio(&self, portfolio: &Portfolio) -> Result<()> {
        if portfolio.positions.is_empty() {
            return Err(RebalanceError::EmptyPortfolio.into());
        }
        let mut total_target = Decimal::ZERO;
        for position in &portfolio.positions {
            if position.target_allocation < Decimal::ZERO {
                return Err(RebalanceError::InvalidTargets(format!(
                    "target for '{}' is negative",
                    position.ticker
                ))
                .into());
            }
            total_target += position.target_allocation;
        }
        if total_target > Decimal::ONE + TARGET_SUM_EPSILON {
            return Err(RebalanceError::InvalidTargets(format!(
                "targets sum to {total_target}, which exceeds 1"
            ))
            .into());
        }
        portfolio.validate()
    }

    /// Drift per position: target minus current allocation, in portfolio
    /// order.
    fn drift(&self, portfolio: &Portfolio) -> Vec<(String, Decimal)> {
        portfolio.allocation_drift()
    }

    /// Converts per-position allocation targets into trades using the drift
    /// rule: trade value is |target − current| × total value, emitted in
    /// portfolio order once the drift clears the threshold.
    fn trades_from_targets(
        &self,
        portfolio: &Portfolio,
        targets: &[Decimal],
        reason: &dyn Fn(Decimal) -> String,
    ) -> Vec<Trade> {
        let total_value = portfolio.total_value();
        let threshold = self.constraints().rebalance_threshold;
        let mut trades = Vec::new();

        for (position, target) in portfolio.positions.iter().zip(targets) {
            let current = portfolio.current_allocation(&position.ticker);
            let drift = *target - current;
            if drift.abs() < threshold {
                continue;
            }

            let value_to_trade = (total_value * drift.abs()).abs();
            let shares = value_to_trade / position.asset.current_price;
            if shares == Decimal::ZERO {
                continue;
            }
            let action = if drift > Decimal::ZERO {
                TradeAction::Buy
            } else {
                TradeAction::Sell
            };
            trades.push(Trade::new(
                &position.ticker,
                action,
                shares.into(),
                position.asset.current_price,
                reason(drift),
            ));
        }
        trades
    }

    /// Runs the trades through the constraint pipeline, returning the
    /// surviving trades plus any recovered-condition warnings.
    fn apply_constraints(
        &self,
        trades: Vec<Trade>,
        portfolio: &Portfolio,
    ) -> (Vec<Trade>, Vec<String>) {
        ConstraintPipeline::new(self.constraints(), portfolio).apply(trades)
    }

    /// Proportional cost on total traded value.
    fn transaction_cost(&self, total_trade_value: MoneyValue) -> MoneyValue {
        total_trade_value * self.constraints().transaction_cost_bps
    }

    /// Estimates the allocation map after the trades execute at decision
    /// prices, with the transaction cost taken out of cash.
    fn estimate_final_allocations(
        &self,
        portfolio: &Portfolio,
        trades: &[Trade],
    ) -> BTreeMap<String, Decimal> {
        let mut shares: Vec<(String, MoneyValue, MoneyValue)> = portfolio
            .positions
            .iter()
            .map(|p| (p.ticker.clone(), p.shares, p.asset.current_price))
            .collect();

        let mut total_buy = MoneyValue::ZERO;
        let mut total_sell = MoneyValue::ZERO;
        for trade in trades {
            if let Some(slot) = shares.iter_mut().find(|(ticker, _, _)| ticker == &trade.ticker) {
                match trade.action {
                    TradeAction::Buy => {
                        slot.1 += trade.shares;
                        total_buy += trade.value;
                    }
                    TradeAction::Sell => {
                        slot.1 -= trade.shares;
                        if slot.1 < MoneyValue::ZERO {
                            slot.1 = MoneyValue::ZERO;
                        }
                        total_sell += trade.value;
                    }
                }
            }
        }

        let cost = self.transaction_cost(total_buy + total_sell);
        let final_cash = portfolio.cash + total_sell - total_buy - cost;
        let invested: MoneyValue = shares
            .iter()
            .map(|(_, count, price)| *count * *price)
            .sum();
        let final_total = final_cash + invested;

        let mut allocations = BTreeMap::new();
        for (ticker, count, price) in shares {
            let weight = if final_total > MoneyValue::ZERO {
                (count * price) / final_total
            } else {
                Decimal::ZERO
            };
            allocations.insert(ticker, weight);
        }
        allocations
    }

    /// Assembles the result: totals, final allocations, and the shared
    /// diagnostic metrics.
    fn summarize(
        &self,
        portfolio: &Portfolio,
        trades: Vec<Trade>,
        drifts_before: &[(String, Decimal)],
        warnings: Vec<String>,
    ) -> RebalanceResult {
        let total_value = portfolio.total_value();
        let total_buy: MoneyValue = trades
            .iter()
            .filter(|t| t.action == TradeAction::Buy)
            .map(|t| t.value)
            .sum();
        let total_sell: MoneyValue = trades
            .iter()
            .filter(|t| t.action == TradeAction::Sell)
            .map(|t| t.value)
            .sum();
        let estimated_cost = self.transaction_cost(total_buy + total_sell);
        let final_allocations = self.estimate_final_allocations(portfolio, &trades);

        let turnover_pct = if total_value > MoneyValue::ZERO {
            ((total_buy + total_sell) / total_value * Decimal::ONE_HUNDRED)
                .to_f64()
                .unwrap_or(0.0)
        } else {
            0.0
        };
        let max_drift_before = drifts_before
            .iter()
            .map(|(_, drift)| drift.abs().to_f64().unwrap_or(0.0))
            .fold(0.0, f64::max);
        let max_drift_after = portfolio
            .positions
            .iter()
            .map(|position| {
                let final_weight = final_allocations
                    .get(&position.ticker)
                    .copied()
                    .unwrap_or(Decimal::ZERO);
                (position.target_allocation - final_weight)
                    .abs()
                    .to_f64()
                    .unwrap_or(0.0)
            })
            .fold(0.0, f64::max);

        RebalanceResult {
            metrics: RebalanceMetrics {
                n_trades: trades.len(),
                turnover_pct,
                max_drift_before,
                max_drift_after,
                cvar: None,
                optimal_weights: None,
                iterations: None,
                covariance_jitter: None,
                warnings,
            },
            trades,
            total_buy_value: total_buy,
            total_sell_value: total_sell,
            estimated_cost,
            final_allocations,
        }
    }
}
