//! Privacy-accountant interface consumed by the orchestrator.

use gdp_training_accounting::{GdpAccountant, PrivacySpend, SpendRequest};
use gdp_training_core::Result;

/// Black-box cumulative privacy-spend computation.
///
/// The orchestrator calls this once per epoch with cumulative step counts
/// and the run's fixed parameters; implementations must return spends that
/// are non-decreasing in the epoch under unchanged configuration.
pub trait PrivacyAccountant {
    /// Compute the spend for `request`.
    fn compute_spend(&mut self, request: &SpendRequest) -> Result<PrivacySpend>;
}

impl PrivacyAccountant for GdpAccountant {
    fn compute_spend(&mut self, request: &SpendRequest) -> Result<PrivacySpend> {
        GdpAccountant::compute_spend(self, request)
    }
}
