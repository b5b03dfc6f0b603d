use thiserror::Error;

#[derive(Error, Debug)]
pub enum RiskError {
    /// The covariance matrix is not symmetric positive semi-definite, even
    /// after diagonal jitter.
    #[error("Covariance matrix is not symmetric PSD: {0}")]
    InvalidCovariance(String),

    /// The sample is too small for stable tail statistics.
    #[error("Sample of {got} scenarios is below the minimum of {min}")]
    InsufficientScenarios { got: usize, min: usize },
}
