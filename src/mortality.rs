//! Natural and fishing mortality.
//!
//! Every individual faces a constant natural mortality `m` and, at fishing
//! times, a fishing mortality scaled by a logistic selectivity ogive. Deaths
//! are drawn from the total rate and then attributed to one of the two causes.

use crate::model::Population;
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_distr::Bernoulli;

/// Mortality parameters active during one step.
#[derive(Debug, Clone, Copy)]
pub struct MortalityRates {
    /// Natural mortality rate.
    pub m: f64,
    /// Fishing mortality of fully selected individuals (0 outside fishing times).
    pub f_max: f64,
    /// Length at 50% selectivity.
    pub l50: f64,
    /// Width between 25% and 75% selectivity.
    pub wqs: f64,
}

/// Number of deaths of each cause during one step.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Deaths {
    pub natural: usize,
    pub fished: usize,
}

impl Deaths {
    pub fn total(&self) -> usize {
        self.natural + self.fished
    }
}

/// Probability of capture at a given length.
///
/// Formula: `1 / (1 + exp(-(length - l50) * 2 ln 3 / wqs))`, so that
/// selectivity is 25% at `l50 - wqs / 2` and 75% at `l50 + wqs / 2`.
pub fn selectivity(length: f64, l50: f64, wqs: f64) -> f64 {
    let slope = 2.0 * 3.0_f64.ln() / wqs;
    1.0 / (1.0 + (-(length - l50) * slope).exp())
}

/// Kill individuals of `pop` over a step of length `dt`.
///
/// Sets the instantaneous rates of every individual, then marks the
/// dead ones and flags those caught by the fishery. Survivors keep
/// their flags.
pub fn apply_mortality<R: Rng + ?Sized>(
    pop: &mut Population,
    rates: MortalityRates,
    dt: f64,
    rng: &mut R,
) -> Result<Deaths> {
    let n_ind = pop.len();

    for i_ind in 0..n_ind {
        let inst_f = selectivity(pop.length[i_ind], rates.l50, rates.wqs) * rates.f_max;
        pop.inst_f[i_ind] = inst_f;
        pop.inst_z[i_ind] = rates.m + inst_f;
    }

    // One uniform draw per individual, in index order.
    let mut i_ind_dead = Vec::new();
    for i_ind in 0..n_ind {
        let prob_death = 1.0 - (-pop.inst_z[i_ind] * dt).exp();
        let roll: f64 = rng.random();
        if roll < prob_death {
            i_ind_dead.push(i_ind);
        }
    }

    let mut deaths = Deaths::default();
    if i_ind_dead.is_empty() {
        return Ok(deaths);
    }

    for i_ind in i_ind_dead {
        pop.alive[i_ind] = false;

        let prob_fished = pop.inst_f[i_ind] / pop.inst_z[i_ind];
        let cause_dist = Bernoulli::new(prob_fished)
            .with_context(|| format!("invalid fishing share {prob_fished}"))?;
        let fished = cause_dist.sample(rng);
        pop.fished[i_ind] = fished;

        if fished {
            deaths.fished += 1;
        } else {
            deaths.natural += 1;
        }
    }

    Ok(deaths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Traits;
    use rand_chacha::ChaCha12Rng;

    fn population(lengths: &[f64]) -> Population {
        let traits = Traits {
            linf: 80.0,
            k: 0.5,
            winf: 5120.0,
            phi_prime: 3.5,
            lmat: 40.0,
        };
        let mut pop = Population::with_capacity(lengths.len());
        for (i, &length) in lengths.iter().enumerate() {
            pop.push(i as u64 + 1, 1.0, length, 0.01 * length.powi(3), traits);
        }
        pop
    }

    #[test]
    fn test_selectivity_curve() {
        assert!((selectivity(20.0, 20.0, 4.0) - 0.5).abs() < 1e-12);
        assert!((selectivity(18.0, 20.0, 4.0) - 0.25).abs() < 1e-12);
        assert!((selectivity(22.0, 20.0, 4.0) - 0.75).abs() < 1e-12);
        assert!(selectivity(0.0, 20.0, 4.0) < 1e-4);
        assert!(selectivity(80.0, 20.0, 4.0) > 1.0 - 1e-4);
    }

    #[test]
    fn rates_are_set_for_every_individual() {
        let mut pop = population(&[0.0, 20.0, 60.0]);
        let rates = MortalityRates {
            m: 0.0,
            f_max: 0.0,
            l50: 20.0,
            wqs: 4.0,
        };
        let mut rng = ChaCha12Rng::seed_from_u64(1);

        let deaths = apply_mortality(&mut pop, rates, 1.0 / 12.0, &mut rng).unwrap();

        assert_eq!(deaths, Deaths::default());
        assert!(pop.alive.iter().all(|&alive| alive));
        assert!(pop.inst_z.iter().all(|&z| z == 0.0));
    }

    #[test]
    fn attribution_accounts_for_every_death() {
        let lengths: Vec<f64> = (0..2000).map(|i| (i % 80) as f64).collect();
        let mut pop = population(&lengths);
        let rates = MortalityRates {
            m: 0.7,
            f_max: 3.0,
            l50: 20.0,
            wqs: 4.0,
        };
        let mut rng = ChaCha12Rng::seed_from_u64(2);

        let deaths = apply_mortality(&mut pop, rates, 0.25, &mut rng).unwrap();

        let n_dead = pop.alive.iter().filter(|&&alive| !alive).count();
        let n_fished = pop.fished.iter().filter(|&&fished| fished).count();
        assert_eq!(deaths.total(), n_dead);
        assert_eq!(deaths.fished, n_fished);
        assert!(deaths.fished > 0 && deaths.natural > 0);

        // Only the dead carry a cause.
        for i_ind in 0..pop.len() {
            if pop.alive[i_ind] {
                assert!(!pop.fished[i_ind]);
            }
        }
    }

    #[test]
    fn no_fishing_means_no_fished_deaths() {
        let lengths: Vec<f64> = (0..1000).map(|i| (i % 80) as f64).collect();
        let mut pop = population(&lengths);
        let rates = MortalityRates {
            m: 2.0,
            f_max: 0.0,
            l50: 20.0,
            wqs: 4.0,
        };
        let mut rng = ChaCha12Rng::seed_from_u64(3);

        let deaths = apply_mortality(&mut pop, rates, 0.5, &mut rng).unwrap();

        assert_eq!(deaths.fished, 0);
        assert!(deaths.natural > 0);
        assert!(pop.fished.iter().all(|&fished| !fished));
    }

    #[test]
    fn unselected_lengths_die_naturally() {
        let mut pop = population(&[0.0; 500]);
        let rates = MortalityRates {
            m: 1.0,
            f_max: 5.0,
            l50: 60.0,
            wqs: 2.0,
        };
        let mut rng = ChaCha12Rng::seed_from_u64(4);

        let deaths = apply_mortality(&mut pop, rates, 1.0, &mut rng).unwrap();

        assert_eq!(deaths.fished, 0);
        assert!(deaths.natural > 0);
    }
}
