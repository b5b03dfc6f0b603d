use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rand_distr::{Distribution, StandardNormal, StudentT};
use rayon::prelude::*;

use crate::constants::{DEFAULT_SEED, MIN_SCENARIOS, TRADING_DAYS_PER_YEAR};
use crate::errors::{Error, Result, ValidationError};
use crate::risk::estimator::cholesky_with_jitter;
use crate::risk::risk_errors::RiskError;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Distribution of the per-period shocks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReturnDistribution {
    Normal,
    /// Student-t with the given degrees of freedom (> 2), standardized to
    /// unit variance so the covariance target still holds.
    StudentT { degrees_of_freedom: f64 },
}

/// A simulated sample of cumulative portfolio returns.
#[derive(Debug, Clone)]
pub struct SimulatedReturns {
    pub returns: Vec<f64>,
    /// Diagonal jitter that had to be added to make the covariance
    /// decomposable, in annualized units. None when it was already PD.
    pub covariance_jitter: Option<f64>,
}

/// Monte-Carlo simulator for multi-asset portfolio returns.
///
/// Draws per-period asset returns from N(mu/T, Sigma/T) (or the scaled
/// Student-t variant), compounds them over T periods, and returns one
/// cumulative return per scenario. Scenarios run on the rayon pool but each
/// one owns an independent, index-keyed RNG stream, so the output is
/// byte-identical for a given seed regardless of thread scheduling.
#[derive(Debug, Clone)]
pub struct MonteCarloSimulator {
    n_scenarios: usize,
    n_periods: usize,
    distribution: ReturnDistribution,
    seed: u64,
}

impl MonteCarloSimulator {
    pub fn new(n_scenarios: usize, seed: u64) -> Result<Self> {
        if n_scenarios < MIN_SCENARIOS {
            return Err(RiskError::InsufficientScenarios {
                got: n_scenarios,
                min: MIN_SCENARIOS,
            }
            .into());
        }
        Ok(MonteCarloSimulator {
            n_scenarios,
            n_periods: TRADING_DAYS_PER_YEAR,
            distribution: ReturnDistribution::Normal,
            seed,
        })
    }

    pub fn with_periods(mut self, n_periods: usize) -> Self {
        self.n_periods = n_periods.max(1);
        self
    }

    pub fn with_distribution(mut self, distribution: ReturnDistribution) -> Self {
        self.distribution = distribution;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn n_scenarios(&self) -> usize {
        self.n_scenarios
    }

    /// Simulates `n_scenarios` cumulative portfolio returns over
    /// `n_periods` for the given weights and annualized parameters.
    pub fn simulate_portfolio_returns(
        &self,
        weights: &[f64],
        expected_returns: &[f64],
        covariance: &DMatrix<f64>,
    ) -> Result<SimulatedReturns> {
        let n_assets = weights.len();
        if expected_returns.len() != n_assets {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Expected {} returns, got {}",
                n_assets,
                expected_returns.len()
            ))));
        }
        if covariance.nrows() != n_assets || covariance.ncols() != n_assets {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Covariance must be {n_assets}x{n_assets}, got {}x{}",
                covariance.nrows(),
                covariance.ncols()
            ))));
        }
        let weight_sum: f64 = weights.iter().sum();
        if (weight_sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Weights must sum to 1, got {weight_sum}"
            ))));
        }

        let t_scale = match self.distribution {
            ReturnDistribution::Normal => None,
            ReturnDistribution::StudentT { degrees_of_freedom } => {
                if degrees_of_freedom <= 2.0 {
                    return Err(Error::Validation(ValidationError::InvalidInput(format!(
                        "Student-t degrees of freedom must exceed 2, got {degrees_of_freedom}"
                    ))));
                }
                let student = StudentT::new(degrees_of_freedom).map_err(|e| {
                    Error::Validation(ValidationError::InvalidInput(e.to_string()))
                })?;
                Some((student, ((degrees_of_freedom - 2.0) / degrees_of_freedom).sqrt()))
            }
        };

        let periods = self.n_periods as f64;
        let (annual_factor, jitter) = cholesky_with_jitter(covariance)?;
        // chol(Sigma / T) = chol(Sigma) / sqrt(T)
        let factor = annual_factor / periods.sqrt();
        let daily_mu = DVector::from_iterator(
            n_assets,
            expected_returns.iter().map(|mu| mu / periods),
        );
        let weight_vec = DVector::from_column_slice(weights);

        let returns: Vec<f64> = (0..self.n_scenarios)
            .into_par_iter()
            .map(|scenario| {
                let mut rng = ChaCha20Rng::seed_from_u64(self.seed);
                rng.set_stream(scenario as u64);
                let mut cumulative = 1.0_f64;
                let mut shocks = DVector::zeros(n_assets);
                for _ in 0..self.n_periods {
                    for value in shocks.iter_mut() {
                        *value = match &t_scale {
                            None => StandardNormal.sample(&mut rng),
                            Some((student, scale)) => {
                                let draw: f64 = student.sample(&mut rng);
                                draw * scale
                            }
                        };
                    }
                    let asset_returns = &daily_mu + &factor * &shocks;
                    let period_return = weight_vec.dot(&asset_returns);
                    cumulative *= 1.0 + period_return;
                }
                cumulative - 1.0
            })
            .collect();

        Ok(SimulatedReturns {
            returns,
            covariance_jitter: jitter,
        })
    }
}

impl Default for MonteCarloSimulator {
    fn default() -> Self {
        MonteCarloSimulator {
            n_scenarios: crate::constants::DEFAULT_SCENARIOS,
            n_periods: TRADING_DAYS_PER_YEAR,
            distribution: ReturnDistribution::Normal,
            seed: DEFAULT_SEED,
        }
    }
}
