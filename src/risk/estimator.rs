use nalgebra::DMatrix;

use crate::errors::Result;
use crate::risk::risk_errors::RiskError;

const SYMMETRY_TOLERANCE: f64 = 1e-8;

/// Annualized market parameters for a fixed ticker ordering.
#[derive(Debug, Clone)]
pub struct MarketParameters {
    pub expected_returns: Vec<f64>,
    pub covariance: DMatrix<f64>,
}

/// Produces (mu, Sigma) for the assets held. Implementations must be
/// stateless or internally synchronized; the engine may call them from any
/// thread. Estimates must be symmetric PSD; the engine validates and
/// rejects anything else.
pub trait ParameterEstimatorTrait: Send + Sync {
    fn estimate(&self, tickers: &[String]) -> Result<MarketParameters>;
}

/// Deterministic synthetic estimator, the default when no market data is
/// wired in: expected returns step up with the ticker index and the
/// covariance is a single-volatility, single-correlation matrix.
#[derive(Debug, Clone)]
pub struct SyntheticParameterEstimator {
    base_return: f64,
    return_step: f64,
    volatility: f64,
    correlation: f64,
}

impl Default for SyntheticParameterEstimator {
    fn default() -> Self {
        SyntheticParameterEstimator {
            base_return: 0.08,
            return_step: 0.02,
            volatility: 0.15,
            correlation: 0.30,
        }
    }
}

impl SyntheticParameterEstimator {
    pub fn new(base_return: f64, return_step: f64, volatility: f64, correlation: f64) -> Self {
        SyntheticParameterEstimator {
            base_return,
            return_step,
            volatility,
            correlation,
        }
    }
}

impl ParameterEstimatorTrait for SyntheticParameterEstimator {
    fn estimate(&self, tickers: &[String]) -> Result<MarketParameters> {
        let n = tickers.len();
        let expected_returns = (0..n)
            .map(|i| self.base_return + self.return_step * i as f64)
            .collect();
        let variance = self.volatility * self.volatility;
        let covariance = DMatrix::from_fn(n, n, |i, j| {
            if i == j {
                variance
            } else {
                variance * self.correlation
            }
        });
        Ok(MarketParameters {
            expected_returns,
            covariance,
        })
    }
}

/// Checks that a covariance matrix is square, symmetric, and decomposable
/// after at most a small diagonal jitter.
pub fn validate_covariance(covariance: &DMatrix<f64>) -> Result<()> {
    cholesky_with_jitter(covariance).map(|_| ())
}

/// Cholesky factor of `matrix`, adding the smallest escalating diagonal
/// jitter that makes the decomposition succeed. Returns the factor and the
/// jitter that was needed (None when the matrix was already positive
/// definite).
pub(crate) fn cholesky_with_jitter(
    matrix: &DMatrix<f64>,
) -> Result<(DMatrix<f64>, Option<f64>)> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(RiskError::InvalidCovariance(format!(
            "expected a square matrix, got {}x{}",
            matrix.nrows(),
            matrix.ncols()
        ))
        .into());
    }
    for i in 0..n {
        for j in (i + 1)..n {
            if (matrix[(i, j)] - matrix[(j, i)]).abs() > SYMMETRY_TOLERANCE {
                return Err(RiskError::InvalidCovariance(format!(
                    "asymmetric at ({i}, {j}): {} vs {}",
                    matrix[(i, j)],
                    matrix[(j, i)]
                ))
                .into());
            }
        }
    }

    if let Some(chol) = matrix.clone().cholesky() {
        return Ok((chol.l(), None));
    }

    // Scale the jitter to the matrix magnitude so tiny and huge covariances
    // behave the same.
    let mean_diagonal = (0..n).map(|i| matrix[(i, i)].abs()).sum::<f64>() / n as f64;
    let scale = if mean_diagonal > 0.0 { mean_diagonal } else { 1.0 };
    let mut jitter = scale * 1e-12;
    let max_jitter = scale * 1e-3;
    while jitter <= max_jitter {
        let jittered = matrix + DMatrix::identity(n, n) * jitter;
        if let Some(chol) = jittered.cholesky() {
            return Ok((chol.l(), Some(jitter)));
        }
        jitter *= 10.0;
    }

    Err(RiskError::InvalidCovariance(
        "not positive semi-definite even after diagonal jitter".to_string(),
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tickers(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("T{i}")).collect()
    }

    #[test]
    fn synthetic_estimator_is_deterministic_in_ticker_order() {
        let estimator = SyntheticParameterEstimator::default();
        let params = estimator.estimate(&tickers(3)).unwrap();
        assert_eq!(params.expected_returns, vec![0.08, 0.10, 0.12]);
        assert!((params.covariance[(0, 0)] - 0.0225).abs() < 1e-12);
        assert!((params.covariance[(0, 1)] - 0.0225 * 0.30).abs() < 1e-12);
        assert_eq!(params.covariance[(1, 0)], params.covariance[(0, 1)]);
    }

    #[test]
    fn validates_positive_definite_covariance() {
        let estimator = SyntheticParameterEstimator::default();
        let params = estimator.estimate(&tickers(4)).unwrap();
        assert!(validate_covariance(&params.covariance).is_ok());
    }

    #[test]
    fn rejects_asymmetric_matrix() {
        let mut matrix = DMatrix::identity(2, 2);
        matrix[(0, 1)] = 0.5;
        assert!(validate_covariance(&matrix).is_err());
    }

    #[test]
    fn singular_matrix_gets_jitter() {
        // Rank one: two perfectly correlated assets.
        let matrix = DMatrix::from_row_slice(2, 2, &[0.04, 0.04, 0.04, 0.04]);
        let (_, jitter) = cholesky_with_jitter(&matrix).unwrap();
        assert!(jitter.is_some());
    }

    #[test]
    fn rejects_negative_definite_matrix() {
        let matrix = DMatrix::from_row_slice(2, 2, &[-1.0, 0.0, 0.0, -1.0]);
        assert!(validate_covariance(&matrix).is_err());
    }
}
