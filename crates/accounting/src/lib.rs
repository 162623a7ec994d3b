//! Privacy accounting for budget-gated training.
//!
//! Provides the Gaussian-DP (CLT) mu and epsilon bounds for both Poisson
//! and uniform subsampling, a composition-based reference epsilon, and the
//! per-epoch spend front-end consumed by the orchestrator.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod composition;
pub mod gdp;
pub mod spend;

pub use composition::composition_epsilon;
pub use gdp::{delta_for_eps, eps_from_mu, mu_poisson, mu_uniform};
pub use spend::{GdpAccountant, PrivacySpend, SpendRequest};

/// Common imports for privacy accounting.
pub mod prelude {
    pub use crate::{
        composition_epsilon, delta_for_eps, eps_from_mu, mu_poisson, mu_uniform, GdpAccountant,
        PrivacySpend, SpendRequest,
    };
}
