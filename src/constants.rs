use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Trading days per year, used for annualization and simulation horizons.
pub const TRADING_DAYS_PER_YEAR: usize = 252;

/// Default number of Monte-Carlo scenarios.
pub const DEFAULT_SCENARIOS: usize = 1_000;

/// Minimum Monte-Carlo sample size accepted by the risk layer.
pub const MIN_SCENARIOS: usize = 32;

/// Default confidence level for CVaR / VaR.
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

/// Default tracking-error penalty weight for the CVaR optimizer.
pub const DEFAULT_RISK_AVERSION: f64 = 0.1;

/// Seed used when the caller does not bind one to the rebalance call.
pub const DEFAULT_SEED: u64 = 42;

/// Default annualized risk-free rate for Sharpe / Sortino.
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.02;

/// Iteration cap for the weight optimizer.
pub const MAX_OPTIMIZER_ITERATIONS: u32 = 100;

/// Convergence tolerance for the weight optimizer (infinity norm of the step).
pub const OPTIMIZER_TOLERANCE: f64 = 1e-6;

/// Decimal precision for monetary display and serialization.
pub const MONEY_DISPLAY_PRECISION: u32 = 2;

/// Decimal precision for allocation weights in serialized output.
pub const WEIGHT_DISPLAY_PRECISION: u32 = 4;

/// Largest monetary magnitude the engine supports.
pub const MONEY_MAX_MAGNITUDE: Decimal = dec!(1000000000000000000);

/// Slack tolerated when checking that target allocations sum to at most 1.
pub const TARGET_SUM_EPSILON: Decimal = dec!(0.000000001);
