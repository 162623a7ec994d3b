//! Core primitives for privacy-budget-bounded training.
//!
//! This crate provides the pieces shared by the accounting and orchestration
//! layers: the subsampling strategies used to draw per-step batches, and the
//! common error type.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod sampling;

pub use error::{Result, TrainError};
pub use sampling::{poisson_sample, uniform_sample, SamplingConfig, SamplingScheme};

/// Common imports for downstream users.
pub mod prelude {
    pub use crate::{
        poisson_sample, uniform_sample, Result, SamplingConfig, SamplingScheme, TrainError,
    };
}
