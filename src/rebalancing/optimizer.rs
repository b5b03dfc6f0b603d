use std::time::{Duration, Instant};

use log::debug;

use crate::constants::{MAX_OPTIMIZER_ITERATIONS, OPTIMIZER_TOLERANCE};

const GRADIENT_STEP: f64 = 1e-5;
const INITIAL_STEP: f64 = 0.1;
const MIN_STEP: f64 = 1e-10;
const MAX_BACKTRACKS: u32 = 20;
const PROJECTION_ITERATIONS: u32 = 100;

/// Knobs for the deterministic constrained solver.
#[derive(Debug, Clone)]
pub struct OptimizerOptions {
    pub max_iterations: u32,
    pub tolerance: f64,
    /// Per-coordinate upper bound on the simplex, when configured.
    pub upper_bound: Option<f64>,
    /// Wall-clock budget for the loop; expiry reports non-convergence.
    pub timeout: Option<Duration>,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        OptimizerOptions {
            max_iterations: MAX_OPTIMIZER_ITERATIONS,
            tolerance: OPTIMIZER_TOLERANCE,
            upper_bound: None,
            timeout: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OptimizerOutcome {
    pub weights: Vec<f64>,
    pub iterations: u32,
    pub converged: bool,
}

/// Minimizes `objective` over the capped probability simplex
/// {w : Σw = 1, 0 ≤ w ≤ upper_bound}.
///
/// Projected gradient descent with finite-difference gradients taken along
/// sum-preserving directions (e_i − e_pivot) and a backtracking step. The
/// objective must be a pure function of `w`; the CVaR strategy guarantees
/// this by pinning the simulator seed per call. Everything here is plain
/// float arithmetic, so the trajectory is reproducible.
pub fn minimize<F>(objective: F, start: &[f64], options: &OptimizerOptions) -> OptimizerOutcome
where
    F: Fn(&[f64]) -> f64,
{
    let n = start.len();
    let upper = feasible_upper_bound(options.upper_bound, n);
    let mut weights = project_capped_simplex(start, upper);
    if n < 2 {
        return OptimizerOutcome {
            weights,
            iterations: 0,
            converged: true,
        };
    }

    let started = Instant::now();
    let mut current = objective(&weights);
    let mut step = INITIAL_STEP;

    for iteration in 1..=options.max_iterations {
        if let Some(timeout) = options.timeout {
            if started.elapsed() >= timeout {
                debug!("Optimizer timed out after {iteration} iterations");
                return OptimizerOutcome {
                    weights,
                    iterations: iteration,
                    converged: false,
                };
            }
        }

        // Reduced gradient along e_i − e_pivot, pivoting on the largest
        // coordinate so perturbed points stay feasible.
        let pivot = weights
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap_or(0);
        let mut gradient = vec![0.0; n];
        for i in 0..n {
            if i == pivot {
                continue;
            }
            let mut probe = weights.clone();
            probe[i] += GRADIENT_STEP;
            probe[pivot] -= GRADIENT_STEP;
            let directional = (objective(&probe) - current) / GRADIENT_STEP;
            gradient[i] = directional;
            gradient[pivot] -= directional;
        }

        let gradient_norm = gradient.iter().fold(0.0_f64, |acc, g| acc.max(g.abs()));
        if gradient_norm < options.tolerance {
            debug!("Optimizer converged on a flat gradient after {iteration} iterations");
            return OptimizerOutcome {
                weights,
                iterations: iteration,
                converged: true,
            };
        }

        // Backtracking line search on the projected step.
        let mut accepted = false;
        let mut trial_step = step;
        for _ in 0..MAX_BACKTRACKS {
            let candidate: Vec<f64> = weights
                .iter()
                .zip(&gradient)
                .map(|(w, g)| w - trial_step * g)
                .collect();
            let candidate = project_capped_simplex(&candidate, upper);
            let value = objective(&candidate);
            if value < current {
                let movement = max_abs_difference(&candidate, &weights);
                weights = candidate;
                current = value;
                step = (trial_step * 1.5).min(1.0);
                accepted = true;
                if movement < options.tolerance {
                    return OptimizerOutcome {
                        weights,
                        iterations: iteration,
                        converged: true,
                    };
                }
                break;
            }
            trial_step *= 0.5;
            if trial_step < MIN_STEP {
                break;
            }
        }

        if !accepted {
            // No descent direction left at any step size: a local optimum.
            return OptimizerOutcome {
                weights,
                iterations: iteration,
                converged: true,
            };
        }
    }

    OptimizerOutcome {
        weights,
        iterations: options.max_iterations,
        converged: false,
    }
}

fn max_abs_difference(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .fold(0.0_f64, |acc, (x, y)| acc.max((x - y).abs()))
}

/// The cap must leave the simplex reachable (n·upper ≥ 1).
fn feasible_upper_bound(upper_bound: Option<f64>, n: usize) -> f64 {
    let upper = upper_bound.unwrap_or(1.0).clamp(0.0, 1.0);
    if n == 0 {
        return upper;
    }
    let minimum_feasible = 1.0 / n as f64;
    if upper < minimum_feasible {
        debug!("Raising position cap {upper} to {minimum_feasible} to keep the simplex feasible");
        minimum_feasible
    } else {
        upper
    }
}

/// Euclidean projection onto {w : Σw = 1, 0 ≤ w ≤ upper}, by bisection on
/// the water-filling threshold.
pub fn project_capped_simplex(weights: &[f64], upper: f64) -> Vec<f64> {
    let n = weights.len();
    if n == 0 {
        return Vec::new();
    }

    let clamped_sum = |tau: f64| -> f64 {
        weights
            .iter()
            .map(|w| (w - tau).clamp(0.0, upper))
            .sum::<f64>()
    };

    let mut low = weights.iter().copied().fold(f64::INFINITY, f64::min) - 1.0;
    let mut high = weights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    for _ in 0..PROJECTION_ITERATIONS {
        let mid = 0.5 * (low + high);
        if clamped_sum(mid) > 1.0 {
            low = mid;
        } else {
            high = mid;
        }
    }
    let tau = 0.5 * (low + high);
    weights.iter().map(|w| (w - tau).clamp(0.0, upper)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_on_simplex(weights: &[f64], upper: f64) {
        let sum: f64 = weights.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9, "sum was {sum}");
        for w in weights {
            assert!(*w >= -1e-12 && *w <= upper + 1e-9);
        }
    }

    #[test]
    fn projection_lands_on_the_simplex() {
        let projected = project_capped_simplex(&[0.9, 0.8, -0.2], 1.0);
        assert_on_simplex(&projected, 1.0);

        let capped = project_capped_simplex(&[0.9, 0.05, 0.05], 0.5);
        assert_on_simplex(&capped, 0.5);
        assert!(capped[0] <= 0.5 + 1e-9);
    }

    #[test]
    fn projection_is_identity_on_feasible_points() {
        let feasible = [0.5, 0.3, 0.2];
        let projected = project_capped_simplex(&feasible, 1.0);
        for (a, b) in feasible.iter().zip(&projected) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn minimizes_quadratic_to_its_simplex_optimum() {
        let target = [0.2, 0.5, 0.3];
        let objective = |w: &[f64]| -> f64 {
            w.iter()
                .zip(&target)
                .map(|(wi, ti)| (wi - ti) * (wi - ti))
                .sum()
        };
        let outcome = minimize(objective, &[1.0, 0.0, 0.0], &OptimizerOptions::default());
        assert!(outcome.converged);
        assert_on_simplex(&outcome.weights, 1.0);
        for (w, t) in outcome.weights.iter().zip(&target) {
            assert!((w - t).abs() < 1e-3);
        }
    }

    #[test]
    fn respects_the_upper_bound() {
        let objective = |w: &[f64]| -> f64 { -w[0] }; // push everything into w[0]
        let options = OptimizerOptions {
            upper_bound: Some(0.6),
            ..Default::default()
        };
        let outcome = minimize(objective, &[1.0 / 3.0; 3], &options);
        assert_on_simplex(&outcome.weights, 0.6);
        assert!(outcome.weights[0] > 0.59);
    }

    #[test]
    fn zero_timeout_reports_non_convergence() {
        let objective = |w: &[f64]| -> f64 { w.iter().map(|x| x * x).sum() };
        let options = OptimizerOptions {
            timeout: Some(Duration::ZERO),
            ..Default::default()
        };
        let outcome = minimize(objective, &[0.5, 0.5], &options);
        assert!(!outcome.converged);
    }

    #[test]
    fn deterministic_across_runs() {
        let target = [0.25, 0.25, 0.25, 0.25];
        let objective = |w: &[f64]| -> f64 {
            w.iter()
                .zip(&target)
                .map(|(wi, ti)| (wi - ti) * (wi - ti))
                .sum()
        };
        let first = minimize(objective, &[0.7, 0.1, 0.1, 0.1], &OptimizerOptions::default());
        let second = minimize(objective, &[0.7, 0.1, 0.1, 0.1], &OptimizerOptions::default());
        assert_eq!(first.weights, second.weights);
        assert_eq!(first.iterations, second.iterations);
    }
}
