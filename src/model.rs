use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Source of individual identifiers.
///
/// Identifiers start at 1 and are never reused within a run.
#[derive(Debug, Default)]
pub struct IdCounter {
    last: u64,
}

impl IdCounter {
    pub fn new() -> Self {
        Self { last: 0 }
    }

    /// Reserve `n` consecutive identifiers.
    ///
    /// # Errors
    /// Fails if the identifier space would be exhausted.
    pub fn allocate(&mut self, n: usize) -> Result<Range<u64>> {
        let end = u64::try_from(n)
            .ok()
            .and_then(|n| self.last.checked_add(n))
            .and_then(|last| last.checked_add(1))
            .with_context(|| format!("cannot allocate {n} more identifiers after {}", self.last))?;
        let first = self.last + 1;
        self.last = end - 1;
        Ok(first..end)
    }

    /// Last identifier handed out (0 if none).
    pub fn last(&self) -> u64 {
        self.last
    }
}

/// Traits fixed at birth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Traits {
    pub linf: f64,
    pub k: f64,
    pub winf: f64,
    pub phi_prime: f64,
    pub lmat: f64,
}

/// Snapshot of one individual, as kept in length-frequency samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndividualRecord {
    pub id: u64,
    pub age: f64,
    pub length: f64,
    pub weight: f64,
    pub linf: f64,
    pub k: f64,
    pub winf: f64,
    pub phi_prime: f64,
    pub lmat: f64,
    pub mature: bool,
    pub inst_f: f64,
    pub inst_z: f64,
    pub fished: bool,
    pub alive: bool,
}

/// Set of individuals stored column by column.
///
/// All columns always have the same length; index `i` of every column
/// describes the same individual.
#[derive(Debug, Default, Clone)]
pub struct Population {
    pub id: Vec<u64>,
    pub age: Vec<f64>,
    pub length: Vec<f64>,
    pub weight: Vec<f64>,
    pub linf: Vec<f64>,
    pub k: Vec<f64>,
    pub winf: Vec<f64>,
    pub phi_prime: Vec<f64>,
    pub lmat: Vec<f64>,
    pub mature: Vec<bool>,
    pub inst_f: Vec<f64>,
    pub inst_z: Vec<f64>,
    pub fished: Vec<bool>,
    pub alive: Vec<bool>,
}

impl Population {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            id: Vec::with_capacity(n),
            age: Vec::with_capacity(n),
            length: Vec::with_capacity(n),
            weight: Vec::with_capacity(n),
            linf: Vec::with_capacity(n),
            k: Vec::with_capacity(n),
            winf: Vec::with_capacity(n),
            phi_prime: Vec::with_capacity(n),
            lmat: Vec::with_capacity(n),
            mature: Vec::with_capacity(n),
            inst_f: Vec::with_capacity(n),
            inst_z: Vec::with_capacity(n),
            fished: Vec::with_capacity(n),
            alive: Vec::with_capacity(n),
        }
    }

    pub fn len(&self) -> usize {
        self.id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }

    /// Append a newborn (or initial) individual.
    pub fn push(&mut self, id: u64, age: f64, length: f64, weight: f64, traits: Traits) {
        self.id.push(id);
        self.age.push(age);
        self.length.push(length);
        self.weight.push(weight);
        self.linf.push(traits.linf);
        self.k.push(traits.k);
        self.winf.push(traits.winf);
        self.phi_prime.push(traits.phi_prime);
        self.lmat.push(traits.lmat);
        self.mature.push(false);
        self.inst_f.push(0.0);
        self.inst_z.push(0.0);
        self.fished.push(false);
        self.alive.push(true);
    }

    /// Drop every individual marked dead, keeping the order of survivors.
    pub fn remove_dead(&mut self) {
        if self.alive.iter().all(|&alive| alive) {
            return;
        }
        let keep = self.alive.clone();
        retain_by(&mut self.id, &keep);
        retain_by(&mut self.age, &keep);
        retain_by(&mut self.length, &keep);
        retain_by(&mut self.weight, &keep);
        retain_by(&mut self.linf, &keep);
        retain_by(&mut self.k, &keep);
        retain_by(&mut self.winf, &keep);
        retain_by(&mut self.phi_prime, &keep);
        retain_by(&mut self.lmat, &keep);
        retain_by(&mut self.mature, &keep);
        retain_by(&mut self.inst_f, &keep);
        retain_by(&mut self.inst_z, &keep);
        retain_by(&mut self.fished, &keep);
        retain_by(&mut self.alive, &keep);
    }

    pub fn record(&self, i_ind: usize) -> IndividualRecord {
        IndividualRecord {
            id: self.id[i_ind],
            age: self.age[i_ind],
            length: self.length[i_ind],
            weight: self.weight[i_ind],
            linf: self.linf[i_ind],
            k: self.k[i_ind],
            winf: self.winf[i_ind],
            phi_prime: self.phi_prime[i_ind],
            lmat: self.lmat[i_ind],
            mature: self.mature[i_ind],
            inst_f: self.inst_f[i_ind],
            inst_z: self.inst_z[i_ind],
            fished: self.fished[i_ind],
            alive: self.alive[i_ind],
        }
    }

    /// Total weight.
    pub fn biomass(&self) -> f64 {
        self.weight.iter().sum()
    }

    /// Total weight of mature individuals.
    pub fn spawning_biomass(&self) -> f64 {
        self.weight
            .iter()
            .zip(&self.mature)
            .filter(|&(_, &mature)| mature)
            .map(|(&weight, _)| weight)
            .sum()
    }

    pub fn n_mature(&self) -> usize {
        self.mature.iter().filter(|&&mature| mature).count()
    }
}

fn retain_by<T>(col: &mut Vec<T>, keep: &[bool]) {
    let mut i_ind = 0;
    col.retain(|_| {
        let kept = keep[i_ind];
        i_ind += 1;
        kept
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn traits() -> Traits {
        Traits {
            linf: 80.0,
            k: 0.5,
            winf: 5120.0,
            phi_prime: 0.5_f64.log10() + 2.0 * 80.0_f64.log10(),
            lmat: 40.0,
        }
    }

    #[test]
    fn ids_are_consecutive() {
        let mut ids = IdCounter::new();
        assert_eq!(ids.allocate(3).unwrap(), 1..4);
        assert_eq!(ids.allocate(0).unwrap(), 4..4);
        assert_eq!(ids.allocate(2).unwrap(), 4..6);
        assert_eq!(ids.last(), 5);
    }

    #[test]
    fn exhausted_ids_are_an_error() {
        let mut ids = IdCounter { last: u64::MAX - 2 };
        assert!(ids.allocate(usize::MAX).is_err());
        assert_eq!(ids.last(), u64::MAX - 2);
        assert_eq!(ids.allocate(1).unwrap(), u64::MAX - 1..u64::MAX);
        assert!(ids.allocate(1).is_err());
    }

    #[test]
    fn remove_dead_keeps_columns_aligned() {
        let mut pop = Population::with_capacity(4);
        for (i, length) in [10.0, 20.0, 30.0, 40.0].into_iter().enumerate() {
            pop.push(i as u64 + 1, 1.0, length, length * 2.0, traits());
        }
        pop.mature[3] = true;
        pop.alive[1] = false;
        pop.alive[2] = false;
        pop.fished[2] = true;

        pop.remove_dead();

        assert_eq!(pop.len(), 2);
        assert_eq!(pop.id, vec![1, 4]);
        assert_eq!(pop.length, vec![10.0, 40.0]);
        assert_eq!(pop.weight, vec![20.0, 80.0]);
        assert_eq!(pop.mature, vec![false, true]);
        assert_eq!(pop.fished, vec![false, false]);
        assert_eq!(pop.alive.len(), 2);
        assert_eq!(pop.biomass(), 100.0);
        assert_eq!(pop.spawning_biomass(), 80.0);
        assert_eq!(pop.n_mature(), 1);
    }

    #[test]
    fn empty_population_has_zero_aggregates() {
        let mut pop = Population::default();
        pop.remove_dead();
        assert!(pop.is_empty());
        assert_eq!(pop.biomass(), 0.0);
        assert_eq!(pop.spawning_biomass(), 0.0);
    }
}
