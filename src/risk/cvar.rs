use crate::constants::MIN_SCENARIOS;
use crate::errors::{Error, Result, ValidationError};
use crate::risk::risk_errors::RiskError;

/// Conditional Value-at-Risk (expected shortfall) over a return sample.
///
/// CVaR is the coherent risk measure this engine optimizes: it averages the
/// losses beyond the VaR quantile instead of only reporting the quantile
/// itself. Both evaluators negate the result so that a riskier distribution
/// has a larger positive value.
///
/// References: Rockafellar & Uryasev (2000), "Optimization of Conditional
/// Value-at-Risk".
#[derive(Debug, Clone, Copy)]
pub struct CVaRCalculator {
    confidence_level: f64,
}

impl CVaRCalculator {
    /// `confidence_level` is the α in CVaR_α, restricted to (0.5, 1).
    pub fn new(confidence_level: f64) -> Result<Self> {
        if !(confidence_level > 0.5 && confidence_level < 1.0) {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Confidence level must be in (0.5, 1), got {confidence_level}"
            ))));
        }
        Ok(CVaRCalculator { confidence_level })
    }

    pub fn confidence_level(&self) -> f64 {
        self.confidence_level
    }

    fn sorted_sample(&self, returns: &[f64]) -> Result<Vec<f64>> {
        if returns.len() < MIN_SCENARIOS {
            return Err(RiskError::InsufficientScenarios {
                got: returns.len(),
                min: MIN_SCENARIOS,
            }
            .into());
        }
        let mut sorted = returns.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        Ok(sorted)
    }

    /// VaR_α: the loss level not exceeded with probability α, computed as
    /// the negated (1 − α) quantile with linear interpolation between order
    /// statistics.
    pub fn var(&self, returns: &[f64]) -> Result<f64> {
        let sorted = self.sorted_sample(returns)?;
        let n = sorted.len();
        let position = (1.0 - self.confidence_level) * (n - 1) as f64;
        let lower = position.floor() as usize;
        let upper = (lower + 1).min(n - 1);
        let fraction = position - lower as f64;
        let quantile = sorted[lower] + fraction * (sorted[upper] - sorted[lower]);
        Ok(-quantile)
    }

    /// CVaR_α: the negated mean of the worst ⌈(1 − α)·N⌉ observations.
    pub fn cvar(&self, returns: &[f64]) -> Result<f64> {
        let sorted = self.sorted_sample(returns)?;
        let n = sorted.len();
        let tail_len = ((1.0 - self.confidence_level) * n as f64).ceil() as usize;
        let tail = &sorted[..tail_len.max(1).min(n)];
        if tail.is_empty() {
            // Unreachable for α < 1, kept as the documented guard.
            return Ok(-sorted[0]);
        }
        let mean = tail.iter().sum::<f64>() / tail.len() as f64;
        Ok(-mean)
    }
}
