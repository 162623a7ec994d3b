//! DP-SGD logistic regression on synthetic data, driven end to end by the
//! budget-gated orchestrator.
//!
//! The executor clips per-example gradients and adds Gaussian noise, the
//! evaluator reports held-out accuracy, and the GDP accountant decides when
//! the privacy budget is spent.

use std::cell::RefCell;
use std::rc::Rc;

use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use gdp_training::{
    DpConfig, EmptyBatchPolicy, Evaluator, GdpAccountant, Orchestrator, Result, SamplingScheme,
    StepBatch, StepExecutor, StepOutcome, TrainingConfig,
};

struct LogisticModel {
    weights: Array1<f64>,
    bias: f64,
}

impl LogisticModel {
    fn new(dim: usize) -> Self {
        Self {
            weights: Array1::zeros(dim),
            bias: 0.0,
        }
    }

    fn predict(&self, x: &Array1<f64>) -> f64 {
        let z = self.weights.dot(x) + self.bias;
        1.0 / (1.0 + (-z).exp())
    }
}

struct Dataset {
    features: Array2<f64>,
    labels: Vec<u8>,
}

fn synthetic_blobs(n: usize, dim: usize, seed: u64) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 1.0).expect("unit normal");
    let mut features = Array2::zeros((n, dim));
    let mut labels = Vec::with_capacity(n);
    for i in 0..n {
        let label = u8::from(rng.gen_bool(0.5));
        let center = if label == 1 { 1.0 } else { -1.0 };
        for j in 0..dim {
            features[(i, j)] = center + noise.sample(&mut rng);
        }
        labels.push(label);
    }
    Dataset { features, labels }
}

/// Per-example clipping plus Gaussian noise, normalized by the microbatch
/// count carried in each step batch.
struct DpSgdExecutor {
    train: Rc<Dataset>,
    model: Rc<RefCell<LogisticModel>>,
    dp: DpConfig,
    learning_rate: f64,
    noise_rng: ChaCha8Rng,
}

impl StepExecutor for DpSgdExecutor {
    fn run_step(&mut self, batch: &StepBatch) -> Result<StepOutcome> {
        if batch.is_empty() {
            return Ok(StepOutcome { loss: 0.0 });
        }

        let mut model = self.model.borrow_mut();
        let dim = model.weights.len();
        let mut grad_w = Array1::<f64>::zeros(dim);
        let mut grad_b = 0.0;
        let mut loss = 0.0;

        for &idx in &batch.indices {
            let x = self.train.features.row(idx).to_owned();
            let y = f64::from(self.train.labels[idx]);
            let p = model.predict(&x);
            loss += -(y * p.max(1e-12).ln() + (1.0 - y) * (1.0 - p).max(1e-12).ln());

            let err = p - y;
            let mut gw = &x * err;
            let gb = err;
            let norm = (gw.dot(&gw) + gb * gb).sqrt();
            let scale = (self.dp.l2_norm_clip / norm.max(1e-12)).min(1.0);
            gw *= scale;
            grad_w += &gw;
            grad_b += gb * scale;
        }

        let sigma = self.dp.noise_multiplier * self.dp.l2_norm_clip;
        let noise = Normal::new(0.0, sigma).expect("noise distribution");
        for g in grad_w.iter_mut() {
            *g += noise.sample(&mut self.noise_rng);
        }
        grad_b += noise.sample(&mut self.noise_rng);

        let denom = batch.num_microbatches.max(1) as f64;
        model.weights = &model.weights - &(grad_w * (self.learning_rate / denom));
        model.bias -= self.learning_rate * grad_b / denom;

        Ok(StepOutcome {
            loss: loss / batch.len() as f64,
        })
    }
}

struct AccuracyEvaluator {
    test: Dataset,
    model: Rc<RefCell<LogisticModel>>,
}

impl Evaluator for AccuracyEvaluator {
    fn evaluate(&mut self) -> Result<f64> {
        let model = self.model.borrow();
        let mut correct = 0usize;
        for (i, &label) in self.test.labels.iter().enumerate() {
            let x = self.test.features.row(i).to_owned();
            let predicted = u8::from(model.predict(&x) >= 0.5);
            if predicted == label {
                correct += 1;
            }
        }
        Ok(correct as f64 / self.test.labels.len() as f64)
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let dim = 5;
    let train = Rc::new(synthetic_blobs(2_000, dim, 0));
    let test = synthetic_blobs(500, dim, 1);
    let model = Rc::new(RefCell::new(LogisticModel::new(dim)));

    let dp = DpConfig {
        noise_multiplier: 0.8,
        l2_norm_clip: 1.0,
        num_microbatches: 100,
        delta: 1e-5,
        max_mu: 2.0,
        scheme: SamplingScheme::Poisson,
        empty_batch: EmptyBatchPolicy::Skip,
    };
    let config = TrainingConfig {
        dataset_size: train.labels.len(),
        batch_size: 100,
        epochs: 30,
        learning_rate: 0.5,
        seed: 42,
        dp: Some(dp),
    };

    let executor = DpSgdExecutor {
        train: Rc::clone(&train),
        model: Rc::clone(&model),
        dp,
        learning_rate: config.learning_rate,
        noise_rng: ChaCha8Rng::seed_from_u64(99),
    };
    let evaluator = AccuracyEvaluator {
        test,
        model: Rc::clone(&model),
    };

    let mut orchestrator =
        Orchestrator::new(config, executor, evaluator, GdpAccountant).expect("valid run");
    let state = orchestrator.run().expect("training run");

    println!(
        "finished: {:?} after {} epochs, final accuracy {:.3}",
        state.status,
        state.completed_epochs,
        state.accuracy_history.last().copied().unwrap_or(0.0)
    );
    if let Some(spend) = &state.spend {
        println!(
            "privacy spend: mu = {:.3}, eps_clt = {:.3}, eps_composition = {:.3}",
            spend.mu, spend.eps_clt, spend.eps_composition
        );
    }
}
