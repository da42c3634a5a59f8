//! Realized trait statistics over the individuals born during a run.

use crate::model::Traits;
use serde::{Deserialize, Serialize};

/// Running moments of one trait, updated one birth at a time.
#[derive(Debug, Clone, Copy)]
pub struct TraitMoments {
    n: usize,
    mean: f64,
    sq_dev_sum: f64,
    min: f64,
    max: f64,
}

/// Summary of a trait across the individuals born.
///
/// Every field but `n` is NaN when nobody was born; `std_dev` and `cv`
/// also need at least two births.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitSummary {
    pub n: usize,
    pub mean: f64,
    pub std_dev: f64,
    /// Coefficient of variation, comparable to the configured `*_cv`.
    pub cv: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for TraitMoments {
    fn default() -> Self {
        Self {
            n: 0,
            mean: 0.0,
            sq_dev_sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl TraitMoments {
    pub fn push(&mut self, x: f64) {
        self.n += 1;
        let old_mean = self.mean;
        self.mean = old_mean + (x - old_mean) / self.n as f64;
        self.sq_dev_sum += (x - old_mean) * (x - self.mean);
        self.min = self.min.min(x);
        self.max = self.max.max(x);
    }

    pub fn summary(&self) -> TraitSummary {
        if self.n == 0 {
            return TraitSummary {
                n: 0,
                mean: f64::NAN,
                std_dev: f64::NAN,
                cv: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
            };
        }
        let std_dev = match self.n {
            1 => f64::NAN,
            n => (self.sq_dev_sum / (n - 1) as f64).sqrt(),
        };
        TraitSummary {
            n: self.n,
            mean: self.mean,
            std_dev,
            cv: std_dev / self.mean,
            min: self.min,
            max: self.max,
        }
    }
}

/// Moments of the growth traits drawn at birth.
#[derive(Debug, Default, Clone, Copy)]
pub struct BirthTraits {
    pub linf: TraitMoments,
    pub k: TraitMoments,
    pub phi_prime: TraitMoments,
}

impl BirthTraits {
    pub fn record(&mut self, traits: &Traits) {
        self.linf.push(traits.linf);
        self.k.push(traits.k);
        self.phi_prime.push(traits.phi_prime);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moments_match_direct_computation() {
        let vals = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let mut moments = TraitMoments::default();
        vals.iter().for_each(|&v| moments.push(v));

        let summary = moments.summary();
        let var = vals.iter().map(|v| (v - 5.0_f64).powi(2)).sum::<f64>() / 7.0;
        assert_eq!(summary.n, 8);
        assert!((summary.mean - 5.0).abs() < 1e-12);
        assert!((summary.std_dev - var.sqrt()).abs() < 1e-12);
        assert!((summary.cv - var.sqrt() / 5.0).abs() < 1e-12);
        assert_eq!((summary.min, summary.max), (2.0, 9.0));
    }

    #[test]
    fn no_births_give_nan_summary() {
        let summary = TraitMoments::default().summary();
        assert_eq!(summary.n, 0);
        assert!(summary.mean.is_nan() && summary.min.is_nan() && summary.max.is_nan());
    }

    #[test]
    fn single_birth_has_no_spread() {
        let mut births = BirthTraits::default();
        births.record(&Traits {
            linf: 80.0,
            k: 0.5,
            winf: 5120.0,
            phi_prime: 3.5,
            lmat: 40.0,
        });
        let summary = births.linf.summary();
        assert_eq!(summary.mean, 80.0);
        assert!(summary.std_dev.is_nan() && summary.cv.is_nan());
        assert_eq!(births.k.summary().max, 0.5);
    }
}
