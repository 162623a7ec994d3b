//! Composition-based epsilon bound for the subsampled Gaussian mechanism.
//!
//! Renyi-DP composition over a grid of integer orders, converted to
//! (eps, delta)-DP at the best order. Reported alongside the CLT bounds as
//! a common reference estimate for either subsampling regime.

use statrs::function::gamma::ln_gamma;

use gdp_training_core::{Result, TrainError};

/// Integer Renyi orders the bound is minimized over.
fn orders() -> Vec<u64> {
    let mut orders: Vec<u64> = (2..=64).collect();
    orders.extend([80, 96, 128, 192, 256, 384, 512]);
    orders
}

/// Epsilon after `steps` compositions of the subsampled Gaussian mechanism
/// with the given noise multiplier and per-step sampling rate.
pub fn composition_epsilon(
    steps: u64,
    noise_multiplier: f64,
    sample_rate: f64,
    delta: f64,
) -> Result<f64> {
    if !noise_multiplier.is_finite() || noise_multiplier <= 0.0 {
        return Err(TrainError::numerical(format!(
            "noise_multiplier must be positive, got {noise_multiplier}"
        )));
    }
    if !sample_rate.is_finite() || !(0.0..=1.0).contains(&sample_rate) {
        return Err(TrainError::numerical(format!(
            "sample_rate must lie in [0, 1], got {sample_rate}"
        )));
    }
    if !delta.is_finite() || delta <= 0.0 || delta >= 1.0 {
        return Err(TrainError::numerical(format!(
            "delta must lie in (0, 1), got {delta}"
        )));
    }
    if steps == 0 || sample_rate == 0.0 {
        return Ok(0.0);
    }

    let log_delta_inv = (1.0 / delta).ln();
    let mut best = f64::INFINITY;
    for alpha in orders() {
        let rdp = rdp_step(alpha, noise_multiplier, sample_rate);
        if !rdp.is_finite() {
            continue;
        }
        let eps = steps as f64 * rdp + log_delta_inv / (alpha as f64 - 1.0);
        if eps < best {
            best = eps;
        }
    }
    Ok(best)
}

/// RDP of one subsampled Gaussian step at integer order `alpha`.
fn rdp_step(alpha: u64, sigma: f64, q: f64) -> f64 {
    let a = alpha as f64;
    if q >= 1.0 {
        return a / (2.0 * sigma * sigma);
    }

    // log sum_j C(alpha, j) q^j (1-q)^(alpha-j) exp(j(j-1) / (2 sigma^2)),
    // accumulated in log space for stability at large alpha.
    let log_q = q.ln();
    let log_1mq = (-q).ln_1p();
    let sigma_sq = sigma * sigma;

    let mut log_sum = f64::NEG_INFINITY;
    for j in 0..=alpha {
        let jf = j as f64;
        let log_binom = ln_gamma(a + 1.0) - ln_gamma(jf + 1.0) - ln_gamma(a - jf + 1.0);
        let log_term = log_binom + jf * log_q + (a - jf) * log_1mq + jf * (jf - 1.0) / (2.0 * sigma_sq);
        log_sum = log_add_exp(log_sum, log_term);
    }
    log_sum / (a - 1.0)
}

/// Numerically stable log(exp(a) + exp(b)).
fn log_add_exp(a: f64, b: f64) -> f64 {
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    if hi == f64::NEG_INFINITY {
        return hi;
    }
    hi + (lo - hi).exp().ln_1p()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_steps_costs_nothing() {
        let eps = composition_epsilon(0, 1.0, 0.01, 1e-5).expect("eps");
        assert_eq!(eps, 0.0);
    }

    #[test]
    fn epsilon_increases_with_steps() {
        let a = composition_epsilon(100, 1.0, 0.01, 1e-5).expect("eps");
        let b = composition_epsilon(200, 1.0, 0.01, 1e-5).expect("eps");
        assert!(a.is_finite() && a > 0.0);
        assert!(b > a);
    }

    #[test]
    fn full_rate_matches_gaussian_rdp() {
        // At q = 1 the step is an unamplified Gaussian mechanism.
        let eps = composition_epsilon(1, 2.0, 1.0, 1e-6).expect("eps");
        let expected: f64 = orders()
            .into_iter()
            .map(|alpha| {
                let a = alpha as f64;
                a / (2.0 * 4.0) + (1e6_f64).ln() / (a - 1.0)
            })
            .fold(f64::INFINITY, f64::min);
        assert!((eps - expected).abs() < 1e-9);
    }

    #[test]
    fn subsampling_amplifies() {
        let amplified = composition_epsilon(1_000, 1.0, 0.001, 1e-5).expect("eps");
        let full = composition_epsilon(1_000, 1.0, 1.0, 1e-5).expect("eps");
        assert!(amplified < full);
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        assert!(composition_epsilon(10, -1.0, 0.1, 1e-5).is_err());
        assert!(composition_epsilon(10, 1.0, 1.5, 1e-5).is_err());
        assert!(composition_epsilon(10, 1.0, 0.1, 0.0).is_err());
    }

    proptest! {
        #[test]
        fn epsilon_monotone_in_steps(
            sigma in 0.6f64..4.0,
            q in 0.001f64..0.3,
            steps in 1u64..2_000,
        ) {
            let delta = 1e-5;
            let a = composition_epsilon(steps, sigma, q, delta).unwrap();
            let b = composition_epsilon(steps * 2, sigma, q, delta).unwrap();
            prop_assert!(a.is_finite());
            prop_assert!(b >= a);
        }
    }
}
