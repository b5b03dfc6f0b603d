//! Risk module - Monte-Carlo simulation, CVaR evaluation, parameter
//! estimation, and the auxiliary portfolio metrics.
//!
//! The split of concerns:
//!
//! 1. **Estimator** (`estimator.rs`) - produces expected returns and a
//!    covariance matrix for a fixed ticker ordering
//! 2. **Simulator** (`monte_carlo.rs`) - turns (w, mu, cov) into a sample of
//!    cumulative portfolio returns
//! 3. **CVaR** (`cvar.rs`) - evaluates tail risk over such a sample
//! 4. **Metrics** (`metrics.rs`) - Sharpe, Sortino, volatility, drawdown
//!    diagnostics off the hot path
//!
//! Everything in here works on `f64`; money stays decimal outside.

mod cvar;
mod estimator;
mod metrics;
mod monte_carlo;
mod risk_errors;

pub use cvar::CVaRCalculator;
pub use estimator::{
    validate_covariance, MarketParameters, ParameterEstimatorTrait, SyntheticParameterEstimator,
};
pub use metrics::{PortfolioMetrics, RiskMetrics};
pub use monte_carlo::{MonteCarloSimulator, ReturnDistribution, SimulatedReturns};
pub use risk_errors::RiskError;
