//! Budget-gated training orchestrator.
//!
//! Composes the sampling strategy, step executor, evaluator, and privacy
//! accountant into the epoch loop, and owns the stop/continue decision.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use gdp_training_accounting::{PrivacySpend, SpendRequest};
use gdp_training_core::{Result, SamplingScheme, TrainError};

use crate::accountant::PrivacyAccountant;
use crate::config::{EmptyBatchPolicy, TrainingConfig};
use crate::executor::{Evaluator, StepBatch, StepExecutor};

/// Terminal-state classification of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunStatus {
    /// Still inside the epoch loop.
    Running,
    /// The reported mu crossed the configured ceiling; training stopped
    /// before starting another epoch. A normal outcome, not an error.
    StoppedByBudget,
    /// All configured epochs completed under budget.
    CompletedAllEpochs,
}

/// Mutable state for one run, owned exclusively by the orchestrator.
#[derive(Clone, Debug)]
pub struct RunState {
    /// Number of fully completed epochs.
    pub completed_epochs: usize,
    /// Latest cumulative privacy spend, when DP is enabled.
    pub spend: Option<PrivacySpend>,
    /// Test accuracy after each completed epoch.
    pub accuracy_history: Vec<f64>,
    /// Current status; terminal once it leaves `Running`.
    pub status: RunStatus,
}

impl RunState {
    fn new() -> Self {
        Self {
            completed_epochs: 0,
            spend: None,
            accuracy_history: Vec::new(),
            status: RunStatus::Running,
        }
    }
}

/// Epoch loop with privacy-budget gating.
///
/// Generic over the three external collaborators, so the same loop serves
/// any model variant and any accountant (including test stubs).
pub struct Orchestrator<X, E, A> {
    config: TrainingConfig,
    executor: X,
    evaluator: E,
    accountant: A,
    state: RunState,
}

impl<X, E, A> Orchestrator<X, E, A>
where
    X: StepExecutor,
    E: Evaluator,
    A: PrivacyAccountant,
{
    /// Validate the configuration and create a run in the `Running` state.
    pub fn new(config: TrainingConfig, executor: X, evaluator: E, accountant: A) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            executor,
            evaluator,
            accountant,
            state: RunState::new(),
        })
    }

    /// Read-only view of the run state.
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// The run configuration.
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// The step executor.
    pub fn executor(&self) -> &X {
        &self.executor
    }

    /// The evaluator.
    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    /// The accountant.
    pub fn accountant(&self) -> &A {
        &self.accountant
    }

    /// Consume the orchestrator, returning the final state.
    pub fn into_state(self) -> RunState {
        self.state
    }

    /// Run epochs until a terminal state is reached.
    pub fn run(&mut self) -> Result<&RunState> {
        while self.state.status == RunStatus::Running {
            self.run_epoch()?;
        }
        Ok(&self.state)
    }

    /// Execute one epoch transition; a no-op once the run is terminal.
    pub fn run_epoch(&mut self) -> Result<()> {
        if self.state.status != RunStatus::Running {
            return Ok(());
        }

        let epoch = self.state.completed_epochs + 1;
        self.train_one_epoch(epoch)?;

        let accuracy = self.evaluator.evaluate()?;
        if !(0.0..=1.0).contains(&accuracy) {
            return Err(TrainError::numerical(format!(
                "evaluator returned accuracy {accuracy} outside [0, 1]"
            )));
        }
        self.state.accuracy_history.push(accuracy);
        self.state.completed_epochs = epoch;

        match self.config.dp {
            None => {
                info!(epoch, accuracy, "epoch complete (vanilla, no privacy budget)");
                if epoch == self.config.epochs {
                    self.state.status = RunStatus::CompletedAllEpochs;
                    info!(epoch, "all configured epochs completed");
                }
            }
            Some(dp) => {
                let request = SpendRequest {
                    epoch,
                    steps_elapsed: epoch as u64 * self.config.steps_per_epoch(),
                    noise_multiplier: dp.noise_multiplier,
                    dataset_size: self.config.dataset_size,
                    batch_size: self.config.batch_size,
                    delta: dp.delta,
                    scheme: dp.scheme,
                };
                let spend = self.accountant.compute_spend(&request)?;
                self.check_monotone(epoch, &spend)?;
                info!(
                    epoch,
                    accuracy,
                    mu = spend.mu,
                    eps_clt = spend.eps_clt,
                    eps_composition = spend.eps_composition,
                    "epoch complete"
                );

                let over_budget = spend.mu > dp.max_mu;
                self.state.spend = Some(spend);
                if over_budget {
                    // The epoch that crossed the ceiling keeps its weights
                    // and metrics; we only refuse to start another one.
                    self.state.status = RunStatus::StoppedByBudget;
                    info!(
                        epoch,
                        mu = spend.mu,
                        max_mu = dp.max_mu,
                        "privacy budget exceeded, stopping"
                    );
                } else if epoch == self.config.epochs {
                    self.state.status = RunStatus::CompletedAllEpochs;
                    info!(epoch, "all configured epochs completed");
                }
            }
        }
        Ok(())
    }

    fn train_one_epoch(&mut self, epoch: usize) -> Result<()> {
        let sampling = self.config.sampling()?;
        // Identical epoch index must yield identical draws across runs,
        // independent of wall clock or prior epochs' draw counts. Steps
        // within the epoch share the stream and so draw independently.
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed.wrapping_add(epoch as u64));
        let steps = self.config.steps_per_epoch() as usize;

        for step in 0..steps {
            let indices = sampling.draw(&mut rng);
            if indices.is_empty() && self.empty_batch_policy() == EmptyBatchPolicy::Skip {
                debug!(epoch, step, "empty batch skipped");
                continue;
            }
            let batch = StepBatch {
                num_microbatches: self.microbatches_for(&indices),
                indices,
            };
            let outcome = self.executor.run_step(&batch)?;
            if !outcome.loss.is_finite() {
                return Err(TrainError::NonFiniteLoss {
                    epoch,
                    step,
                    loss: outcome.loss,
                });
            }
            debug!(
                epoch,
                step,
                loss = outcome.loss,
                batch_len = batch.len(),
                "step complete"
            );
        }
        Ok(())
    }

    fn microbatches_for(&self, indices: &[usize]) -> usize {
        match self.config.dp {
            Some(dp) if dp.scheme == SamplingScheme::Poisson => indices.len(),
            Some(dp) => dp.num_microbatches,
            None => 1,
        }
    }

    fn empty_batch_policy(&self) -> EmptyBatchPolicy {
        self.config
            .dp
            .map(|dp| dp.empty_batch)
            .unwrap_or(EmptyBatchPolicy::Skip)
    }

    fn check_monotone(&self, epoch: usize, spend: &PrivacySpend) -> Result<()> {
        if let Some(prev) = &self.state.spend {
            if spend.mu < prev.mu {
                return Err(TrainError::SpendRegression {
                    epoch,
                    name: "mu",
                    previous: prev.mu,
                    current: spend.mu,
                });
            }
            if spend.eps_clt < prev.eps_clt {
                return Err(TrainError::SpendRegression {
                    epoch,
                    name: "eps_clt",
                    previous: prev.eps_clt,
                    current: spend.eps_clt,
                });
            }
        }
        Ok(())
    }
}
