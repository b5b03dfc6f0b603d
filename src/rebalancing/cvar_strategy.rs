use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::constants::{
    DEFAULT_CONFIDENCE_LEVEL, DEFAULT_RISK_AVERSION, DEFAULT_SCENARIOS, DEFAULT_SEED,
    MAX_OPTIMIZER_ITERATIONS, OPTIMIZER_TOLERANCE, TRADING_DAYS_PER_YEAR,
};
use crate::errors::Result;
use crate::portfolio::Portfolio;
use crate::rebalancing::constraints::TradingConstraints;
use crate::rebalancing::optimizer::{minimize, OptimizerOptions};
use crate::rebalancing::rebalancing_model::RebalanceResult;
use crate::rebalancing::strategy::RebalanceStrategy;
use crate::risk::{
    validate_covariance, CVaRCalculator, MonteCarloSimulator, ParameterEstimatorTrait,
    SyntheticParameterEstimator,
};

/// Warning emitted when the optimizer fails to converge (or times out) and
/// the strategy falls back to the raw target weights.
pub const WARN_OPTIMIZER_NON_CONVERGENT: &str = "optimizer_non_convergent";

/// Progress of one CVaR rebalance call, for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RebalancePhase {
    Init,
    Estimating,
    Optimizing,
    Fallback,
    GeneratingTrades,
    ApplyingConstraints,
    Done,
}

fn enter(phase: RebalancePhase, portfolio_id: &str) {
    debug!("CVaR rebalance [{portfolio_id}]: {phase:?}");
}

/// CVaR-optimized rebalancing.
///
/// Instead of steering straight at the target weights, this strategy
/// minimizes `CVaR_α(simulate(w)) + λ·Σ|w − t|`: tail risk plus an L1
/// tracking penalty that keeps the answer near the user's allocation. Every
/// objective evaluation reuses the same call-bound seed, making the
/// objective a pure function of `w`; the solver would not converge
/// otherwise.
pub struct CVaRRebalanceStrategy {
    constraints: TradingConstraints,
    estimator: Arc<dyn ParameterEstimatorTrait>,
    n_scenarios: usize,
    n_periods: usize,
    confidence_level: f64,
    risk_aversion: f64,
    seed: u64,
    max_iterations: u32,
    tolerance: f64,
    timeout: Option<Duration>,
}

impl CVaRRebalanceStrategy {
    pub fn new(constraints: TradingConstraints) -> Self {
        CVaRRebalanceStrategy {
            constraints,
            estimator: Arc::new(SyntheticParameterEstimator::default()),
            n_scenarios: DEFAULT_SCENARIOS,
            n_periods: TRADING_DAYS_PER_YEAR,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            risk_aversion: DEFAULT_RISK_AVERSION,
            seed: DEFAULT_SEED,
            max_iterations: MAX_OPTIMIZER_ITERATIONS,
            tolerance: OPTIMIZER_TOLERANCE,
            timeout: None,
        }
    }

    pub fn with_estimator(mut self, estimator: Arc<dyn ParameterEstimatorTrait>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_scenarios(mut self, n_scenarios: usize) -> Self {
        self.n_scenarios = n_scenarios;
        self
    }

    pub fn with_periods(mut self, n_periods: usize) -> Self {
        self.n_periods = n_periods;
        self
    }

    pub fn with_confidence_level(mut self, confidence_level: f64) -> Self {
        self.confidence_level = confidence_level;
        self
    }

    pub fn with_risk_aversion(mut self, risk_aversion: f64) -> Self {
        self.risk_aversion = risk_aversion;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Wall-clock budget for the optimizer loop. Expiry behaves exactly
    /// like non-convergence: fall back to the target weights.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl RebalanceStrategy for CVaRRebalanceStrategy {
    fn constraints(&self) -> &TradingConstraints {
        &self.constraints
    }

    fn rebalance(&self, portfolio: &Portfolio) -> Result<RebalanceResult> {
        enter(RebalancePhase::Init, &portfolio.id);
        self.validate_portfolio(portfolio)?;

        let tickers = portfolio.tickers();
        let n_assets = tickers.len();
        let current_weights = portfolio.current_weights();
        let target_weights = portfolio.target_weights();
        let drifts = self.drift(portfolio);

        enter(RebalancePhase::Estimating, &portfolio.id);
        let params = self.estimator.estimate(&tickers)?;
        validate_covariance(&params.covariance)?;

        let simulator = MonteCarloSimulator::new(self.n_scenarios, self.seed)?
            .with_periods(self.n_periods);
        let calculator = CVaRCalculator::new(self.confidence_level)?;

        let start = if current_weights.iter().sum::<f64>() > 0.0 {
            current_weights
        } else if target_weights.iter().sum::<f64>() > 0.0 {
            target_weights.clone()
        } else {
            vec![1.0 / n_assets as f64; n_assets]
        };

        // Surfaces fatal simulation errors once, before the solver starts
        // treating them as unbounded objective values.
        let baseline = simulator.simulate_portfolio_returns(
            &start,
            &params.expected_returns,
            &params.covariance,
        )?;
        let covariance_jitter = baseline.covariance_jitter;

        let risk_aversion = self.risk_aversion;
        let targets = target_weights.clone();
        let objective = |weights: &[f64]| -> f64 {
            let simulated = match simulator.simulate_portfolio_returns(
                weights,
                &params.expected_returns,
                &params.covariance,
            ) {
                Ok(sample) => sample,
                Err(_) => return f64::INFINITY,
            };
            let cvar = match calculator.cvar(&simulated.returns) {
                Ok(value) => value,
                Err(_) => return f64::INFINITY,
            };
            let tracking: f64 = weights
                .iter()
                .zip(&targets)
                .map(|(w, t)| (w - t).abs())
                .sum();
            cvar + risk_aversion * tracking
        };

        enter(RebalancePhase::Optimizing, &portfolio.id);
        let options = OptimizerOptions {
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
            upper_bound: self
                .constraints
                .max_position_size
                .and_then(|cap| cap.to_f64()),
            timeout: self.timeout,
        };
        let outcome = minimize(objective, &start, &options);

        let mut warnings = Vec::new();
        let optimal_weights = if outcome.converged {
            outcome.weights
        } else {
            enter(RebalancePhase::Fallback, &portfolio.id);
            warn!(
                "CVaR optimizer did not converge within {} iterations for portfolio {}; \
                 falling back to target weights",
                outcome.iterations, portfolio.id
            );
            warnings.push(WARN_OPTIMIZER_NON_CONVERGENT.to_string());
            if target_weights.iter().sum::<f64>() > 0.0 {
                target_weights.clone()
            } else {
                start.clone()
            }
        };

        enter(RebalancePhase::GeneratingTrades, &portfolio.id);
        // Map the invested-space optimum back to total-value space: the
        // optimized simplex weights share the invested fraction the user's
        // targets reserve, leaving the cash slack alone.
        let invested_fraction = portfolio.target_invested_fraction();
        let implied_targets: Vec<Decimal> = optimal_weights
            .iter()
            .map(|w| {
                Decimal::from_f64(*w).unwrap_or(Decimal::ZERO) * invested_fraction
            })
            .collect();
        let trades = self.trades_from_targets(portfolio, &implied_targets, &|drift: Decimal| {
            let percent = (drift.abs() * Decimal::ONE_HUNDRED)
                .to_f64()
                .unwrap_or(0.0);
            if drift > Decimal::ZERO {
                format!("CVaR-optimized: underweight by {percent:.2}%")
            } else {
                format!("CVaR-optimized: overweight by {percent:.2}%")
            }
        });

        enter(RebalancePhase::ApplyingConstraints, &portfolio.id);
        let (trades, constraint_warnings) = self.apply_constraints(trades, portfolio);
        warnings.extend(constraint_warnings);

        let optimal_sample = simulator.simulate_portfolio_returns(
            &optimal_weights,
            &params.expected_returns,
            &params.covariance,
        )?;
        let cvar = calculator.cvar(&optimal_sample.returns)?;

        let mut result = self.summarize(portfolio, trades, &drifts, warnings);
        result.metrics.cvar = Some(cvar);
        result.metrics.optimal_weights = Some(optimal_weights);
        result.metrics.iterations = Some(outcome.iterations);
        result.metrics.covariance_jitter = covariance_jitter;
        enter(RebalancePhase::Done, &portfolio.id);
        Ok(result)
    }
}
