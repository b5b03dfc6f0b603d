use crate::constants::DEFAULT_SEED;
use crate::errors::Result;
use crate::portfolio::Portfolio;
use crate::rebalancing::constraints::TradingConstraints;
use crate::rebalancing::cvar_strategy::CVaRRebalanceStrategy;
use crate::rebalancing::rebalancing_model::{RebalanceResult, StrategyConfig};
use crate::rebalancing::simple_strategy::SimpleRebalanceStrategy;
use crate::rebalancing::strategy::RebalanceStrategy;

/// Engine entry point: rebalances a portfolio snapshot under the selected
/// strategy and constraints. Pure at the boundary: the portfolio is only
/// read, and the result describes proposed trades.
pub fn rebalance(
    portfolio: &Portfolio,
    config: &StrategyConfig,
    constraints: &TradingConstraints,
) -> Result<RebalanceResult> {
    constraints.validate()?;
    match config {
        StrategyConfig::Simple => {
            SimpleRebalanceStrategy::new(constraints.clone()).rebalance(portfolio)
        }
        StrategyConfig::CVaR {
            n_scenarios,
            confidence_level,
            risk_aversion,
            seed,
        } => CVaRRebalanceStrategy::new(constraints.clone())
            .with_scenarios(*n_scenarios as usize)
            .with_confidence_level(*confidence_level)
            .with_risk_aversion(*risk_aversion)
            .with_seed(seed.unwrap_or(DEFAULT_SEED))
            .rebalance(portfolio),
    }
}
