//! Goalfolio Core - goal-based portfolio rebalancing with CVaR risk
//! optimization.
//!
//! This crate is the rebalancing engine: the domain model (assets,
//! positions, portfolios, goals), the Monte-Carlo / CVaR risk layer, and
//! the rebalancing strategies with their trading-constraint pipeline. It is
//! storage- and transport-agnostic; persistence is reached only through the
//! repository traits defined in [`goals`], and market parameters enter
//! through the estimator trait in [`risk`].
//!
//! The single operation the engine exposes is [`rebalance`]: it takes a
//! portfolio snapshot, a strategy selection, and trading constraints, and
//! returns the proposed trades without mutating anything.

pub mod assets;
pub mod constants;
pub mod errors;
pub mod goals;
pub mod money;
pub mod portfolio;
pub mod rebalancing;
pub mod risk;

pub use errors::{Error, Result};
pub use money::MoneyValue;
pub use rebalancing::{
    rebalance, RebalanceResult, StrategyConfig, Trade, TradeAction, TradingConstraints,
};
