use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_RISK_FREE_RATE, TRADING_DAYS_PER_YEAR};
use crate::errors::Result;
use crate::risk::cvar::CVaRCalculator;

/// Aggregate risk diagnostics for a return sample. CVaR is the primary
/// measure; the rest is reported for comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub cvar: f64,
    pub var: f64,
    pub volatility: f64,
    pub downside_deviation: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
}

/// Auxiliary metrics over per-period return samples. Diagnostics only,
/// never on the rebalance hot path.
pub struct PortfolioMetrics;

impl PortfolioMetrics {
    fn mean(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        values.iter().sum::<f64>() / values.len() as f64
    }

    fn sample_std(values: &[f64]) -> f64 {
        if values.len() < 2 {
            return 0.0;
        }
        let mean = Self::mean(values);
        let sum_sq: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
        (sum_sq / (values.len() - 1) as f64).sqrt()
    }

    /// Annualized standard deviation of per-period returns.
    pub fn volatility(returns: &[f64]) -> f64 {
        Self::sample_std(returns) * (TRADING_DAYS_PER_YEAR as f64).sqrt()
    }

    /// Annualized Sharpe ratio against the given annualized risk-free rate.
    pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
        if returns.is_empty() {
            return 0.0;
        }
        let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR as f64;
        let excess: Vec<f64> = returns.iter().map(|r| r - daily_rf).collect();
        let std = Self::sample_std(&excess);
        if std < 1e-10 {
            return 0.0;
        }
        Self::mean(&excess) / std * (TRADING_DAYS_PER_YEAR as f64).sqrt()
    }

    /// Annualized standard deviation of the negative excess returns only.
    pub fn downside_deviation(returns: &[f64], risk_free_rate: f64) -> f64 {
        let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR as f64;
        let downside: Vec<f64> = returns
            .iter()
            .map(|r| r - daily_rf)
            .filter(|r| *r < 0.0)
            .collect();
        if downside.is_empty() {
            return 0.0;
        }
        Self::sample_std(&downside) * (TRADING_DAYS_PER_YEAR as f64).sqrt()
    }

    /// Annualized Sortino ratio. Positive infinity when there are no
    /// negative excess returns to penalize.
    pub fn sortino_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
        if returns.is_empty() {
            return 0.0;
        }
        let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR as f64;
        let excess: Vec<f64> = returns.iter().map(|r| r - daily_rf).collect();
        let downside: Vec<f64> = excess.iter().copied().filter(|r| *r < 0.0).collect();
        if downside.is_empty() {
            return f64::INFINITY;
        }
        let downside_std = Self::sample_std(&downside);
        if downside_std < 1e-10 {
            return 0.0;
        }
        Self::mean(&excess) / downside_std * (TRADING_DAYS_PER_YEAR as f64).sqrt()
    }

    /// Largest peak-to-trough fall of the compounded equity curve, as a
    /// positive fraction.
    pub fn max_drawdown(returns: &[f64]) -> f64 {
        let mut cumulative = 1.0_f64;
        let mut peak = 1.0_f64;
        let mut max_drawdown = 0.0_f64;
        for r in returns {
            cumulative *= 1.0 + r;
            if cumulative > peak {
                peak = cumulative;
            }
            if peak > 0.0 {
                let drawdown = (peak - cumulative) / peak;
                if drawdown > max_drawdown {
                    max_drawdown = drawdown;
                }
            }
        }
        max_drawdown
    }

    /// All risk metrics for a sample at the given CVaR confidence level.
    pub fn all(returns: &[f64], confidence_level: f64) -> Result<RiskMetrics> {
        let calculator = CVaRCalculator::new(confidence_level)?;
        Ok(RiskMetrics {
            cvar: calculator.cvar(returns)?,
            var: calculator.var(returns)?,
            volatility: Self::volatility(returns),
            downside_deviation: Self::downside_deviation(returns, DEFAULT_RISK_FREE_RATE),
            max_drawdown: Self::max_drawdown(returns),
            sharpe_ratio: Self::sharpe_ratio(returns, DEFAULT_RISK_FREE_RATE),
            sortino_ratio: Self::sortino_ratio(returns, DEFAULT_RISK_FREE_RATE),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volatility_of_constant_returns_is_zero() {
        assert_eq!(PortfolioMetrics::volatility(&[0.01; 50]), 0.0);
    }

    #[test]
    fn sharpe_is_zero_for_flat_series() {
        assert_eq!(PortfolioMetrics::sharpe_ratio(&[0.0; 50], 0.0), 0.0);
    }

    #[test]
    fn sharpe_rewards_positive_drift() {
        let returns: Vec<f64> = (0..100)
            .map(|i| 0.002 + if i % 2 == 0 { 0.001 } else { -0.001 })
            .collect();
        assert!(PortfolioMetrics::sharpe_ratio(&returns, 0.02) > 0.0);
    }

    #[test]
    fn sortino_is_infinite_without_downside() {
        let returns = vec![0.01; 50];
        assert!(PortfolioMetrics::sortino_ratio(&returns, 0.0).is_infinite());
    }

    #[test]
    fn sortino_penalizes_only_downside() {
        let returns = [0.01, -0.02, 0.03, -0.01, 0.02, -0.02, 0.01, 0.00];
        let sortino = PortfolioMetrics::sortino_ratio(&returns, 0.0);
        let sharpe = PortfolioMetrics::sharpe_ratio(&returns, 0.0);
        assert!(sortino.is_finite());
        assert_ne!(sortino, sharpe);
    }

    #[test]
    fn max_drawdown_of_known_path() {
        // Curve: 1.1, 0.55, 0.6875 -> worst fall is 50% off the 1.1 peak.
        let returns = [0.10, -0.50, 0.25];
        let drawdown = PortfolioMetrics::max_drawdown(&returns);
        assert!((drawdown - 0.5).abs() < 1e-12);
    }

    #[test]
    fn max_drawdown_is_zero_for_monotone_growth() {
        let returns = [0.01, 0.02, 0.03];
        assert_eq!(PortfolioMetrics::max_drawdown(&returns), 0.0);
    }

    #[test]
    fn aggregate_metrics_are_consistent() {
        let mut returns = vec![0.001; 60];
        returns.extend([-0.05, -0.04, -0.03, 0.02]);
        let metrics = PortfolioMetrics::all(&returns, 0.95).unwrap();
        assert!(metrics.cvar >= metrics.var);
        assert!(metrics.volatility > 0.0);
        assert!(metrics.max_drawdown > 0.0);
    }
}
