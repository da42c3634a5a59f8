//! Catch sampling and length-frequency aggregation.

use crate::model::{IndividualRecord, Population};
use anyhow::{Result, bail};
use chrono::NaiveDate;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Individuals sampled from the catch of one fishing step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: f64,
    pub date: NaiveDate,
    pub individuals: Vec<IndividualRecord>,
}

impl Sample {
    pub fn lengths(&self) -> impl Iterator<Item = f64> + '_ {
        self.individuals.iter().map(|ind| ind.length)
    }
}

/// Binned length-frequency data.
///
/// `catch[i_bin][i_sample]` counts the individuals of sample `i_sample`
/// whose length falls in bin `i_bin`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LengthFrequency {
    pub mid_lengths: Vec<f64>,
    pub times: Vec<f64>,
    pub dates: Vec<NaiveDate>,
    pub catch: Vec<Vec<u64>>,
}

impl LengthFrequency {
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Total count of sample `i_sample`.
    pub fn sample_total(&self, i_sample: usize) -> u64 {
        self.catch.iter().map(|row| row[i_sample]).sum()
    }
}

/// Draw the catch sample of the current step.
///
/// Only individuals that died by fishing this step are eligible; the
/// sample size is `ceil(n_fished * fraction)`. Returns indices into `pop`
/// in increasing order.
///
/// # Errors
/// Fails when there is nothing to sample.
pub fn draw_catch<R: Rng + ?Sized>(
    pop: &Population,
    fraction: f64,
    rng: &mut R,
) -> Result<Vec<usize>> {
    let eligible: Vec<usize> = (0..pop.len())
        .filter(|&i_ind| !pop.alive[i_ind] && pop.fished[i_ind])
        .collect();
    if eligible.is_empty() {
        bail!("no individuals died by fishing");
    }

    let amount = (eligible.len() as f64 * fraction).ceil() as usize;
    if amount == 0 || amount > eligible.len() {
        bail!("cannot draw {amount} of {} individuals", eligible.len());
    }

    let mut i_ind_vec: Vec<usize> = eligible.choose_multiple(rng, amount).copied().collect();
    i_ind_vec.sort_unstable();
    Ok(i_ind_vec)
}

/// Bin every retained sample into a common length-frequency matrix.
///
/// Bins have width `bin_size`, start at the floor of the smallest length
/// and end at or past the largest one. Counting is right-closed, except
/// for the lowest bin which also includes its lower edge.
pub fn bin_samples(samples: &[Sample], bin_size: f64) -> LengthFrequency {
    let (min, max) = samples
        .iter()
        .flat_map(Sample::lengths)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), l| {
            (lo.min(l), hi.max(l))
        });
    if !(min.is_finite() && max.is_finite()) {
        return LengthFrequency::default();
    }

    let lo = min.floor();
    let hi = (max / bin_size).ceil() * bin_size;
    let mut n_bins = (((hi - lo) / bin_size).ceil() as usize).max(1);
    while lo + n_bins as f64 * bin_size < max {
        n_bins += 1;
    }

    let edges: Vec<f64> = (0..=n_bins).map(|i| lo + i as f64 * bin_size).collect();
    let mid_lengths = edges.windows(2).map(|e| 0.5 * (e[0] + e[1])).collect();

    let mut catch = vec![vec![0; samples.len()]; n_bins];
    for (i_sample, sample) in samples.iter().enumerate() {
        for length in sample.lengths() {
            catch[bin_index(&edges, length)][i_sample] += 1;
        }
    }

    LengthFrequency {
        mid_lengths,
        times: samples.iter().map(|s| s.time).collect(),
        dates: samples.iter().map(|s| s.date).collect(),
        catch,
    }
}

fn bin_index(edges: &[f64], length: f64) -> usize {
    // First upper edge not below `length`.
    let n_bins = edges.len() - 1;
    edges[1..].partition_point(|&upper| upper < length).min(n_bins - 1)
}
