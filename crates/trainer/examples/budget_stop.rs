//! Minimal walkthrough of the budget gate: a no-op model trained at an
//! aggressive sampling rate until the mu ceiling stops the run.

use gdp_training::{
    DpConfig, EmptyBatchPolicy, Evaluator, GdpAccountant, Orchestrator, Result, RunStatus,
    SamplingScheme, StepBatch, StepExecutor, StepOutcome, TrainingConfig,
};

struct NoOpExecutor;

impl StepExecutor for NoOpExecutor {
    fn run_step(&mut self, _batch: &StepBatch) -> Result<StepOutcome> {
        Ok(StepOutcome { loss: 0.1 })
    }
}

struct FixedEvaluator;

impl Evaluator for FixedEvaluator {
    fn evaluate(&mut self) -> Result<f64> {
        Ok(0.5)
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let config = TrainingConfig {
        dataset_size: 1_000,
        batch_size: 250,
        epochs: 50,
        learning_rate: 0.01,
        seed: 0,
        dp: Some(DpConfig {
            noise_multiplier: 0.7,
            l2_norm_clip: 1.0,
            num_microbatches: 250,
            delta: 1e-5,
            max_mu: 2.0,
            scheme: SamplingScheme::Uniform,
            empty_batch: EmptyBatchPolicy::Skip,
        }),
    };

    let mut orchestrator =
        Orchestrator::new(config, NoOpExecutor, FixedEvaluator, GdpAccountant).expect("valid run");

    while orchestrator.state().status == RunStatus::Running {
        orchestrator.run_epoch().expect("epoch");
        if let Some(spend) = &orchestrator.state().spend {
            println!(
                "epoch {:2}: mu = {:.4}, eps_clt = {:.4}, eps_composition = {:.4}",
                spend.epoch, spend.mu, spend.eps_clt, spend.eps_composition
            );
        }
    }

    println!(
        "terminal state: {:?} after {} epochs",
        orchestrator.state().status,
        orchestrator.state().completed_epochs
    );
}
