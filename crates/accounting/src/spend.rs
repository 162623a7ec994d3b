//! Per-epoch privacy spend and the GDP accountant front-end.

use gdp_training_core::{Result, SamplingConfig, SamplingScheme};

use crate::composition::composition_epsilon;
use crate::gdp::{eps_from_mu, mu_poisson, mu_uniform};

/// Cumulative privacy expenditure reported after an epoch.
///
/// Under a fixed noise multiplier and sampling rate every field is
/// non-decreasing in the epoch; the orchestrator treats a decrease as a
/// contract violation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PrivacySpend {
    /// Epoch (1-based) this spend covers, cumulatively from the run start.
    pub epoch: usize,
    /// CLT-based epsilon matching the active sampling scheme.
    pub eps_clt: f64,
    /// Composition-based (Renyi) reference epsilon.
    pub eps_composition: f64,
    /// Gaussian-DP mu parameter; compared against the run's budget ceiling.
    pub mu: f64,
}

impl PrivacySpend {
    /// Named epsilon estimates, for reporting surfaces.
    pub fn epsilon_estimates(&self) -> [(&'static str, f64); 2] {
        [("clt", self.eps_clt), ("composition", self.eps_composition)]
    }
}

/// Inputs for one privacy-spend computation.
///
/// `scheme` is the same value that drove the batch draws; carrying it in
/// the request is what keeps sampling and accounting coupled.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpendRequest {
    /// Epoch (1-based) being accounted for.
    pub epoch: usize,
    /// Total optimization steps elapsed since the run started.
    pub steps_elapsed: u64,
    /// Run-constant noise multiplier.
    pub noise_multiplier: f64,
    /// Training-set size.
    pub dataset_size: usize,
    /// Nominal batch size.
    pub batch_size: usize,
    /// Target delta for the epsilon estimates.
    pub delta: f64,
    /// Subsampling scheme used for the draws.
    pub scheme: SamplingScheme,
}

/// CLT-based GDP accountant with a composition reference estimate.
#[derive(Clone, Copy, Debug, Default)]
pub struct GdpAccountant;

impl GdpAccountant {
    /// Compute the cumulative spend for `request`.
    ///
    /// The mu formula is selected by the scheme in the request, so the
    /// accounting assumption always matches the sampling actually used.
    pub fn compute_spend(&self, request: &SpendRequest) -> Result<PrivacySpend> {
        let sampling =
            SamplingConfig::new(request.scheme, request.dataset_size, request.batch_size)?;
        let rate = sampling.sample_rate();
        let steps = request.steps_elapsed as f64;

        let mu = match request.scheme {
            SamplingScheme::Poisson => mu_poisson(steps, request.noise_multiplier, rate)?,
            SamplingScheme::Uniform => mu_uniform(steps, request.noise_multiplier, rate)?,
        };
        let eps_clt = eps_from_mu(mu, request.delta)?;
        let eps_composition = composition_epsilon(
            request.steps_elapsed,
            request.noise_multiplier,
            rate,
            request.delta,
        )?;

        Ok(PrivacySpend {
            epoch: request.epoch,
            eps_clt,
            eps_composition,
            mu,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(scheme: SamplingScheme) -> SpendRequest {
        SpendRequest {
            epoch: 3,
            steps_elapsed: 300,
            noise_multiplier: 1.1,
            dataset_size: 25_000,
            batch_size: 512,
            delta: 1e-5,
            scheme,
        }
    }

    #[test]
    fn scheme_selects_the_matching_formula() {
        let accountant = GdpAccountant;
        let poisson = accountant
            .compute_spend(&request(SamplingScheme::Poisson))
            .expect("spend");
        let uniform = accountant
            .compute_spend(&request(SamplingScheme::Uniform))
            .expect("spend");

        let q = 512.0 / 25_000.0;
        let expected_p = mu_poisson(300.0, 1.1, q).expect("mu");
        let expected_u = mu_uniform(300.0, 1.1, q).expect("mu");
        assert!((poisson.mu - expected_p).abs() < 1e-12);
        assert!((uniform.mu - expected_u).abs() < 1e-12);
        assert!(poisson.mu != uniform.mu);

        // Composition estimate does not depend on the scheme.
        assert!((poisson.eps_composition - uniform.eps_composition).abs() < 1e-12);
    }

    #[test]
    fn spend_is_monotone_across_epochs() {
        let accountant = GdpAccountant;
        let mut previous: Option<PrivacySpend> = None;
        for epoch in 1..=5 {
            let spend = accountant
                .compute_spend(&SpendRequest {
                    epoch,
                    steps_elapsed: epoch as u64 * 100,
                    ..request(SamplingScheme::Poisson)
                })
                .expect("spend");
            if let Some(prev) = previous {
                assert!(spend.mu >= prev.mu);
                assert!(spend.eps_clt >= prev.eps_clt);
                assert!(spend.eps_composition >= prev.eps_composition);
            }
            previous = Some(spend);
        }
    }

    #[test]
    fn invalid_sampling_bounds_are_rejected() {
        let accountant = GdpAccountant;
        let mut bad = request(SamplingScheme::Poisson);
        bad.batch_size = bad.dataset_size;
        assert!(accountant.compute_spend(&bad).is_err());
    }

    #[test]
    fn epsilon_estimates_are_named() {
        let spend = GdpAccountant
            .compute_spend(&request(SamplingScheme::Poisson))
            .expect("spend");
        let estimates = spend.epsilon_estimates();
        assert_eq!(estimates[0].0, "clt");
        assert_eq!(estimates[1].0, "composition");
    }
}
