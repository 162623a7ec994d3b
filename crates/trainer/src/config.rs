//! Run configuration for budget-gated training.

use gdp_training_core::{Result, SamplingConfig, SamplingScheme, TrainError};

/// What to do when a Poisson draw comes back empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmptyBatchPolicy {
    /// Do not invoke the executor. The step still counts as elapsed for
    /// amplification accounting.
    Skip,
    /// Invoke the executor with a zero-example batch.
    Execute,
}

/// Differential-privacy settings for a run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DpConfig {
    /// Ratio of injected noise standard deviation to the clipping norm.
    pub noise_multiplier: f64,
    /// Per-example gradient clipping norm, forwarded to the executor.
    pub l2_norm_clip: f64,
    /// Microbatch count for uniform sampling; must divide `batch_size`.
    /// Poisson steps use the realized batch size instead.
    pub num_microbatches: usize,
    /// Target delta for the epsilon estimates.
    pub delta: f64,
    /// Budget ceiling: the run stops once the reported mu exceeds this.
    pub max_mu: f64,
    /// Subsampling scheme; drives both the batch draws and the accounting
    /// formula selection.
    pub scheme: SamplingScheme,
    /// Handling of empty Poisson draws.
    pub empty_batch: EmptyBatchPolicy,
}

/// Full configuration for one training run.
///
/// Owned by value by the orchestrator and never mutated, so the constant
/// noise multiplier and sampling rate that composition accounting assumes
/// hold by construction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrainingConfig {
    /// Number of training examples.
    pub dataset_size: usize,
    /// Nominal batch size.
    pub batch_size: usize,
    /// Number of epochs to run unless the budget stops the run first.
    pub epochs: usize,
    /// Learning rate, forwarded to the executor.
    pub learning_rate: f64,
    /// Base seed. Each epoch reseeds deterministically from this and the
    /// epoch index.
    pub seed: u64,
    /// DP settings; `None` selects vanilla training with no budget.
    pub dp: Option<DpConfig>,
}

impl TrainingConfig {
    /// Fail-fast validation, run before any training step.
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(TrainError::config("epochs must be positive"));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(TrainError::config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        self.sampling()?;

        if let Some(dp) = &self.dp {
            if !dp.noise_multiplier.is_finite() || dp.noise_multiplier <= 0.0 {
                return Err(TrainError::config(format!(
                    "noise_multiplier must be positive when DP is enabled, got {}",
                    dp.noise_multiplier
                )));
            }
            if !dp.l2_norm_clip.is_finite() || dp.l2_norm_clip <= 0.0 {
                return Err(TrainError::config(format!(
                    "l2_norm_clip must be positive, got {}",
                    dp.l2_norm_clip
                )));
            }
            if dp.num_microbatches == 0 || self.batch_size % dp.num_microbatches != 0 {
                return Err(TrainError::config(format!(
                    "num_microbatches ({}) must evenly divide batch_size ({})",
                    dp.num_microbatches, self.batch_size
                )));
            }
            if !dp.delta.is_finite() || dp.delta <= 0.0 || dp.delta >= 1.0 {
                return Err(TrainError::config(format!(
                    "delta must lie in (0, 1), got {}",
                    dp.delta
                )));
            }
            if !dp.max_mu.is_finite() || dp.max_mu <= 0.0 {
                return Err(TrainError::config(format!(
                    "max_mu must be positive, got {}",
                    dp.max_mu
                )));
            }
        }
        Ok(())
    }

    /// Active subsampling scheme. Vanilla runs use uniform batches.
    pub fn scheme(&self) -> SamplingScheme {
        self.dp
            .map(|dp| dp.scheme)
            .unwrap_or(SamplingScheme::Uniform)
    }

    /// Sampling configuration implied by the run settings. The scheme
    /// comes from the same field the accountant request uses.
    pub fn sampling(&self) -> Result<SamplingConfig> {
        SamplingConfig::new(self.scheme(), self.dataset_size, self.batch_size)
    }

    /// Optimization steps per epoch (`dataset_size / batch_size`, floored).
    pub fn steps_per_epoch(&self) -> u64 {
        (self.dataset_size / self.batch_size) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dp_config() -> DpConfig {
        DpConfig {
            noise_multiplier: 0.55,
            l2_norm_clip: 5.0,
            num_microbatches: 256,
            delta: 1e-5,
            max_mu: 2.0,
            scheme: SamplingScheme::Uniform,
            empty_batch: EmptyBatchPolicy::Skip,
        }
    }

    fn config() -> TrainingConfig {
        TrainingConfig {
            dataset_size: 29_305,
            batch_size: 256,
            epochs: 10,
            learning_rate: 0.01,
            seed: 0,
            dp: Some(dp_config()),
        }
    }

    #[test]
    fn valid_config_passes() {
        config().validate().expect("valid config");
        assert_eq!(config().steps_per_epoch(), 114);
    }

    #[test]
    fn microbatches_must_divide_batch_size() {
        let mut cfg = config();
        cfg.dp.as_mut().unwrap().num_microbatches = 100;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn noise_must_be_positive_when_dp_enabled() {
        let mut cfg = config();
        cfg.dp.as_mut().unwrap().noise_multiplier = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn poisson_rate_must_stay_below_one() {
        let mut cfg = config();
        cfg.dp.as_mut().unwrap().scheme = SamplingScheme::Poisson;
        cfg.batch_size = cfg.dataset_size;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn vanilla_config_needs_no_dp_fields() {
        let cfg = TrainingConfig {
            dp: None,
            ..config()
        };
        cfg.validate().expect("valid config");
        assert_eq!(cfg.scheme(), SamplingScheme::Uniform);
    }

    #[test]
    fn zero_epochs_rejected() {
        let cfg = TrainingConfig {
            epochs: 0,
            ..config()
        };
        assert!(cfg.validate().is_err());
    }
}
