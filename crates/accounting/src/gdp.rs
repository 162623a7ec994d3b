//! Gaussian-differential-privacy (GDP) accounting via the CLT bounds.
//!
//! Implements the mu computations for Poisson and uniform subsampling from
//! Bu, Dong, Long and Su, "Deep Learning with Gaussian Differential
//! Privacy", together with the dual conversion between mu and (eps, delta).

use statrs::distribution::{ContinuousCDF, Normal};

use gdp_training_core::{Result, TrainError};

/// Upper end of the epsilon bracket used when inverting the dual.
const EPS_BRACKET: f64 = 500.0;

fn std_normal() -> Normal {
    Normal::new(0.0, 1.0).expect("standard normal")
}

fn check_inputs(steps: f64, noise_multiplier: f64, sample_rate: f64) -> Result<()> {
    if !steps.is_finite() || steps < 0.0 {
        return Err(TrainError::numerical(format!(
            "steps must be finite and non-negative, got {steps}"
        )));
    }
    if !noise_multiplier.is_finite() || noise_multiplier <= 0.0 {
        return Err(TrainError::numerical(format!(
            "noise_multiplier must be positive, got {noise_multiplier}"
        )));
    }
    if !sample_rate.is_finite() || sample_rate <= 0.0 || sample_rate > 1.0 {
        return Err(TrainError::numerical(format!(
            "sample_rate must lie in (0, 1], got {sample_rate}"
        )));
    }
    Ok(())
}

/// mu parameter after `steps` Poisson-subsampled Gaussian steps at
/// inclusion probability `sample_rate` and the given noise multiplier.
pub fn mu_poisson(steps: f64, noise_multiplier: f64, sample_rate: f64) -> Result<f64> {
    check_inputs(steps, noise_multiplier, sample_rate)?;
    let inv_sigma_sq = 1.0 / (noise_multiplier * noise_multiplier);
    Ok((inv_sigma_sq.exp() - 1.0).sqrt() * steps.sqrt() * sample_rate)
}

/// mu parameter after `steps` uniform-subsampled (fixed batch size)
/// Gaussian steps at sampling rate `sample_rate`.
pub fn mu_uniform(steps: f64, noise_multiplier: f64, sample_rate: f64) -> Result<f64> {
    check_inputs(steps, noise_multiplier, sample_rate)?;
    let normal = std_normal();
    let sigma = noise_multiplier;
    let c = sample_rate * steps.sqrt();
    let inner = (1.0 / (sigma * sigma)).exp() * normal.cdf(1.5 / sigma)
        + 3.0 * normal.cdf(-0.5 / sigma)
        - 2.0;
    Ok(2.0_f64.sqrt() * c * inner.max(0.0).sqrt())
}

/// The smallest delta achievable at `eps` under mu-GDP (the dual conversion).
pub fn delta_for_eps(eps: f64, mu: f64) -> f64 {
    if mu <= 0.0 {
        return 0.0;
    }
    let normal = std_normal();
    normal.cdf(-eps / mu + mu / 2.0) - eps.exp() * normal.cdf(-eps / mu - mu / 2.0)
}

/// Invert the dual conversion: the smallest eps such that mu-GDP implies
/// (eps, delta)-DP.
///
/// `delta_for_eps` is strictly decreasing in eps, so a bisection over
/// `[0, 500]` suffices (the reference implementation brackets the same
/// interval).
pub fn eps_from_mu(mu: f64, delta: f64) -> Result<f64> {
    if !mu.is_finite() || mu < 0.0 {
        return Err(TrainError::numerical(format!(
            "mu must be finite and non-negative, got {mu}"
        )));
    }
    if !delta.is_finite() || delta <= 0.0 || delta >= 1.0 {
        return Err(TrainError::numerical(format!(
            "delta must lie in (0, 1), got {delta}"
        )));
    }
    if mu == 0.0 || delta_for_eps(0.0, mu) <= delta {
        return Ok(0.0);
    }
    if delta_for_eps(EPS_BRACKET, mu) > delta {
        return Err(TrainError::numerical(format!(
            "mu = {mu} too large to convert to epsilon at delta = {delta}"
        )));
    }

    let mut lo = 0.0;
    let mut hi = EPS_BRACKET;
    for _ in 0..200 {
        if hi - lo <= 1e-12 {
            break;
        }
        let mid = 0.5 * (lo + hi);
        if delta_for_eps(mid, mu) > delta {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Ok(hi)
}
