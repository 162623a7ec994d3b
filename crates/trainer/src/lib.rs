//! Privacy-budget-bounded training orchestration.
//!
//! This crate ties together the subsampling strategies, the external
//! collaborator traits (step execution, evaluation, accounting), and the
//! budget-gated epoch loop that decides, epoch by epoch, whether training
//! may continue under the configured Gaussian-DP ceiling.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod accountant;
pub mod config;
pub mod executor;
pub mod orchestrator;

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use gdp_training_accounting as accounting;
pub use gdp_training_core as core;

pub use accountant::PrivacyAccountant;
pub use accounting::{
    composition_epsilon, delta_for_eps, eps_from_mu, mu_poisson, mu_uniform, GdpAccountant,
    PrivacySpend, SpendRequest,
};
pub use config::{DpConfig, EmptyBatchPolicy, TrainingConfig};
pub use core::{poisson_sample, uniform_sample, Result, SamplingConfig, SamplingScheme, TrainError};
pub use executor::{Evaluator, StepBatch, StepExecutor, StepOutcome};
pub use orchestrator::{Orchestrator, RunState, RunStatus};

/// Convenience prelude covering the common building blocks.
pub mod prelude {
    pub use crate::accountant::PrivacyAccountant;
    pub use crate::config::{DpConfig, EmptyBatchPolicy, TrainingConfig};
    pub use crate::executor::{Evaluator, StepBatch, StepExecutor, StepOutcome};
    pub use crate::orchestrator::{Orchestrator, RunState, RunStatus};
    pub use gdp_training_accounting::prelude::*;
    pub use gdp_training_core::prelude::*;
}
