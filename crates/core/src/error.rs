//! Error types for budget-gated training.

/// Errors that can occur while configuring or running a training loop.
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    /// Invalid run configuration, rejected before any training step runs.
    #[error("configuration error: {msg}")]
    Config {
        /// Human-readable error description.
        msg: String,
    },

    /// Numerical computation failure.
    #[error("numerical error: {msg}")]
    Numerical {
        /// Human-readable error description.
        msg: String,
    },

    /// The step executor reported a non-finite loss.
    ///
    /// Continuing would produce a model and a privacy claim of unknown
    /// validity, so the run aborts immediately.
    #[error("non-finite loss {loss} at epoch {epoch}, step {step}")]
    NonFiniteLoss {
        /// Epoch (1-based) in which the loss was observed.
        epoch: usize,
        /// Step within the epoch (0-based).
        step: usize,
        /// The offending loss value.
        loss: f64,
    },

    /// The accountant reported a spend lower than the previous epoch's
    /// under unchanged configuration, violating composition monotonicity.
    #[error("privacy spend decreased at epoch {epoch}: {name} went {previous} -> {current}")]
    SpendRegression {
        /// Epoch at which the regression was observed.
        epoch: usize,
        /// Name of the decreasing quantity (e.g. `"mu"`).
        name: &'static str,
        /// Value reported for the previous epoch.
        previous: f64,
        /// Value reported for the current epoch.
        current: f64,
    },
}

/// Result type for training operations.
pub type Result<T> = std::result::Result<T, TrainError>;

impl TrainError {
    /// Create a configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config { msg: msg.into() }
    }

    /// Create a numerical error.
    pub fn numerical<S: Into<String>>(msg: S) -> Self {
        Self::Numerical { msg: msg.into() }
    }
}
