//! Subsampling strategies for drawing per-step training batches.
//!
//! The scheme used to draw batches must match the scheme assumed by the
//! privacy accounting formulas; [`SamplingScheme`] is the single value that
//! drives both, so a mismatch is unrepresentable.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{Result, TrainError};

/// Subsampling scheme used for every batch draw in a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SamplingScheme {
    /// Fixed-size batches drawn without replacement.
    Uniform,
    /// Each example included independently with probability `batch_size / n`.
    Poisson,
}

/// Configuration for drawing batches from a dataset of known size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplingConfig {
    /// Scheme used for every draw.
    pub scheme: SamplingScheme,
    /// Number of examples in the training set.
    pub dataset_size: usize,
    /// Nominal batch size. Under Poisson sampling this sets the inclusion
    /// probability `batch_size / dataset_size`; the realized size varies.
    pub batch_size: usize,
}

impl SamplingConfig {
    /// Create a validated sampling configuration.
    pub fn new(scheme: SamplingScheme, dataset_size: usize, batch_size: usize) -> Result<Self> {
        let config = Self {
            scheme,
            dataset_size,
            batch_size,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the size bounds for the configured scheme.
    pub fn validate(&self) -> Result<()> {
        if self.dataset_size == 0 {
            return Err(TrainError::config("dataset_size must be positive"));
        }
        match self.scheme {
            SamplingScheme::Uniform => {
                if self.batch_size == 0 || self.batch_size > self.dataset_size {
                    return Err(TrainError::config(format!(
                        "uniform batch_size must be in (0, {}], got {}",
                        self.dataset_size, self.batch_size
                    )));
                }
            }
            SamplingScheme::Poisson => {
                if self.batch_size == 0 || self.batch_size >= self.dataset_size {
                    return Err(TrainError::config(format!(
                        "poisson inclusion probability {}/{} must lie in (0, 1)",
                        self.batch_size, self.dataset_size
                    )));
                }
            }
        }
        Ok(())
    }

    /// Per-example sampling rate assumed by accounting.
    pub fn sample_rate(&self) -> f64 {
        self.batch_size as f64 / self.dataset_size as f64
    }

    /// Draw the index set for one optimization step.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<usize> {
        match self.scheme {
            SamplingScheme::Uniform => uniform_sample(self.dataset_size, self.batch_size, rng),
            SamplingScheme::Poisson => poisson_sample(self.dataset_size, self.sample_rate(), rng),
        }
    }
}

/// Sample exactly `batch_size` distinct indices from `[0, n)` without
/// replacement.
pub fn uniform_sample<R: Rng + ?Sized>(n: usize, batch_size: usize, rng: &mut R) -> Vec<usize> {
    if n == 0 || batch_size == 0 {
        return Vec::new();
    }
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(batch_size.min(n));
    indices
}

/// Include each index in `[0, n)` independently with probability `q`.
///
/// The realized batch size is binomial in `n` and `q` and may legitimately
/// be zero; callers decide how to treat an empty draw.
pub fn poisson_sample<R: Rng + ?Sized>(n: usize, q: f64, rng: &mut R) -> Vec<usize> {
    if n == 0 || !q.is_finite() || q <= 0.0 {
        return Vec::new();
    }
    let q = q.clamp(0.0, 1.0);
    let mut indices = Vec::new();
    for i in 0..n {
        if rng.gen_bool(q) {
            indices.push(i);
        }
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn uniform_sample_exact_size() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..50 {
            let batch = uniform_sample(100, 10, &mut rng);
            assert_eq!(batch.len(), 10);
        }
    }

    #[test]
    fn uniform_sample_distinct_and_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut batch = uniform_sample(50, 50, &mut rng);
        batch.sort_unstable();
        batch.dedup();
        assert_eq!(batch.len(), 50);
        assert!(batch.iter().all(|&i| i < 50));
    }

    #[test]
    fn poisson_sample_mean_matches_rate() {
        // 10,000 trials at n = 1000, q = 0.05; expected mean 50.
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let trials = 10_000usize;
        let n = 1000usize;
        let q = 0.05;
        let mut total = 0usize;
        for _ in 0..trials {
            let batch = poisson_sample(n, q, &mut rng);
            assert!(batch.iter().all(|&i| i < n));
            assert!(batch.windows(2).all(|w| w[0] < w[1]));
            total += batch.len();
        }
        let mean = total as f64 / trials as f64;
        assert!((mean - n as f64 * q).abs() < 0.5, "mean {mean}");
    }

    #[test]
    fn poisson_sample_can_be_empty() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let empty = (0..200).any(|_| poisson_sample(5, 0.01, &mut rng).is_empty());
        assert!(empty);
    }

    #[test]
    fn config_rejects_out_of_range_sizes() {
        assert!(SamplingConfig::new(SamplingScheme::Uniform, 100, 0).is_err());
        assert!(SamplingConfig::new(SamplingScheme::Uniform, 100, 101).is_err());
        assert!(SamplingConfig::new(SamplingScheme::Poisson, 100, 100).is_err());
        assert!(SamplingConfig::new(SamplingScheme::Poisson, 100, 0).is_err());
        assert!(SamplingConfig::new(SamplingScheme::Uniform, 0, 1).is_err());
        assert!(SamplingConfig::new(SamplingScheme::Uniform, 100, 100).is_ok());
        assert!(SamplingConfig::new(SamplingScheme::Poisson, 100, 99).is_ok());
    }

    #[test]
    fn config_draw_dispatches_on_scheme() {
        let uniform = SamplingConfig::new(SamplingScheme::Uniform, 200, 32).expect("valid config");
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        assert_eq!(uniform.draw(&mut rng).len(), 32);

        let poisson = SamplingConfig::new(SamplingScheme::Poisson, 200, 32).expect("valid config");
        assert!((poisson.sample_rate() - 0.16).abs() < 1e-12);
        let sizes: Vec<usize> = (0..20).map(|_| poisson.draw(&mut rng).len()).collect();
        assert!(sizes.iter().any(|&s| s != 32));
    }

    proptest! {
        #[test]
        fn uniform_sample_always_exact_and_distinct(
            n in 1usize..400,
            seed in any::<u64>(),
            frac in 0.01f64..1.0,
        ) {
            let batch_size = ((n as f64 * frac).ceil() as usize).clamp(1, n);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut batch = uniform_sample(n, batch_size, &mut rng);
            prop_assert_eq!(batch.len(), batch_size);
            prop_assert!(batch.iter().all(|&i| i < n));
            batch.sort_unstable();
            batch.dedup();
            prop_assert_eq!(batch.len(), batch_size);
        }

        #[test]
        fn poisson_sample_sorted_unique_in_range(
            n in 1usize..400,
            seed in any::<u64>(),
            q in 0.01f64..0.99,
        ) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let batch = poisson_sample(n, q, &mut rng);
            prop_assert!(batch.iter().all(|&i| i < n));
            prop_assert!(batch.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
