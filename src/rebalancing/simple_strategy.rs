use log::debug;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::errors::Result;
use crate::portfolio::Portfolio;
use crate::rebalancing::constraints::TradingConstraints;
use crate::rebalancing::rebalancing_model::RebalanceResult;
use crate::rebalancing::strategy::RebalanceStrategy;

/// Drift-threshold baseline: buy what is underweight, sell what is
/// overweight, no optimization. The benchmark the CVaR strategy is
/// compared against.
#[derive(Debug, Clone, Default)]
pub struct SimpleRebalanceStrategy {
    constraints: TradingConstraints,
}

impl SimpleRebalanceStrategy {
    pub fn new(constraints: TradingConstraints) -> Self {
        SimpleRebalanceStrategy { constraints }
    }
}

impl RebalanceStrategy for SimpleRebalanceStrategy {
    fn constraints(&self) -> &TradingConstraints {
        &self.constraints
    }

    fn rebalance(&self, portfolio: &Portfolio) -> Result<RebalanceResult> {
        self.validate_portfolio(portfolio)?;

        let drifts = self.drift(portfolio);
        let targets: Vec<Decimal> = portfolio
            .positions
            .iter()
            .map(|p| p.target_allocation)
            .collect();
        let trades = self.trades_from_targets(portfolio, &targets, &|drift: Decimal| {
            let percent = (drift.abs() * Decimal::ONE_HUNDRED)
                .to_f64()
                .unwrap_or(0.0);
            if drift > Decimal::ZERO {
                format!("Underweight by {percent:.2}%")
            } else {
                format!("Overweight by {percent:.2}%")
            }
        });
        debug!(
            "Simple strategy generated {} candidate trades for portfolio {}",
            trades.len(),
            portfolio.id
        );

        let (trades, warnings) = self.apply_constraints(trades, portfolio);
        Ok(self.summarize(portfolio, trades, &drifts, warnings))
    }
}
