//! External-collaborator interfaces: step execution and evaluation.
//!
//! The model, optimizer, and dataset all live behind these traits; the
//! orchestrator only sees index sets, scalar losses, and accuracies.

use gdp_training_core::Result;

/// Index set plus per-step metadata handed to the step executor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepBatch {
    /// Indices into the training set for this step.
    pub indices: Vec<usize>,
    /// Microbatch count for this step's per-example clipping. Under
    /// Poisson sampling this is the realized batch size; each step
    /// carries its own value rather than sharing a run-wide one.
    pub num_microbatches: usize,
}

impl StepBatch {
    /// Realized batch size.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether the batch contains no examples.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Result of one optimization step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepOutcome {
    /// Scalar training loss. Must be finite for the run to continue; the
    /// orchestrator assumes nothing else about its magnitude.
    pub loss: f64,
}

/// One optimization step over an index set.
///
/// Implementations wrap the external model/optimizer pair (DP or vanilla);
/// the gradient clipping and noise mechanism are theirs, not the
/// orchestrator's.
pub trait StepExecutor {
    /// Run a single optimization step on `batch`.
    fn run_step(&mut self, batch: &StepBatch) -> Result<StepOutcome>;
}

/// Held-out-set evaluation, invoked once per epoch after all its steps.
pub trait Evaluator {
    /// Return accuracy in `[0, 1]` on the held-out set.
    fn evaluate(&mut self) -> Result<f64>;
}
