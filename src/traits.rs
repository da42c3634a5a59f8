use crate::config::Config;
use crate::growth::weight_at_length;
use crate::model::Traits;
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_distr::{LogNormal, Normal};

/// Distance between the 25% and 75% quantiles of the standard normal.
const NORMAL_IQR: f64 = 1.348_979_500_392_163_5;

/// Birth distributions of the individual traits.
pub struct TraitDistributions {
    linf_mu: f64,
    k_mu: f64,
    linf_dist: LogNormal<f64>,
    k_dist: LogNormal<f64>,
    lmat_dist: Normal<f64>,
    lw_a: f64,
    lw_b: f64,
}

impl TraitDistributions {
    pub fn new(cfg: &Config) -> Result<Self> {
        let linf_dist = LogNormal::new(0.0, cfg.growth.linf_cv)
            .context("failed to construct asymptotic length distribution")?;
        let k_dist = LogNormal::new(0.0, cfg.growth.k_cv)
            .context("failed to construct growth coefficient distribution")?;
        let lmat_dist = Normal::new(cfg.lmat(), cfg.wmat() / NORMAL_IQR)
            .context("failed to construct maturity length distribution")?;

        Ok(Self {
            linf_mu: cfg.growth.linf_mu,
            k_mu: cfg.growth.k_mu,
            linf_dist,
            k_dist,
            lmat_dist,
            lw_a: cfg.length_weight.a,
            lw_b: cfg.length_weight.b,
        })
    }

    /// Draw the traits of `n` newborn individuals.
    ///
    /// Each trait is drawn for the whole batch before the next one, so
    /// the order of draws does not depend on how the batch is consumed.
    pub fn express<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<Traits> {
        let linf: Vec<f64> = (0..n)
            .map(|_| self.linf_mu * self.linf_dist.sample(rng))
            .collect();
        let k: Vec<f64> = (0..n).map(|_| self.k_mu * self.k_dist.sample(rng)).collect();
        let lmat: Vec<f64> = (0..n).map(|_| self.lmat_dist.sample(rng)).collect();

        linf.into_iter()
            .zip(k)
            .zip(lmat)
            .map(|((linf, k), lmat)| Traits {
                linf,
                k,
                winf: weight_at_length(linf, self.lw_a, self.lw_b),
                phi_prime: k.log10() + 2.0 * linf.log10(),
                lmat,
            })
            .collect()
    }
}
