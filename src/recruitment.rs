//! Density-dependent recruitment with a seasonal spawning schedule.

/// Beverton-Holt stock-recruitment relationship.
///
/// Recruits per year as a function of spawning stock biomass `ssb`,
/// saturating at `rmax` and reaching half of it at `ssb = beta`.
pub fn beverton_holt(rmax: f64, beta: f64, ssb: f64) -> f64 {
    rmax * ssb / (beta + ssb)
}

/// Share of the annual reproduction assigned to each step of the year.
///
/// The schedule repeats every year; it is indexed by step number rather
/// than expanded over the whole run.
#[derive(Debug, Clone)]
pub struct ReproSchedule {
    weights: Vec<f64>,
}

impl ReproSchedule {
    /// Normalize `weights` so that they sum to one over a year.
    pub fn new(weights: &[f64]) -> Self {
        let sum: f64 = weights.iter().sum();
        let weights = weights.iter().map(|&w| w / sum).collect();
        Self { weights }
    }

    /// Reproduction weight of step `step`.
    pub fn weight(&self, step: usize) -> f64 {
        self.weights[step % self.weights.len()]
    }

    /// Time of year of the first step with the highest weight.
    pub fn peak_time(&self) -> f64 {
        let mut i_peak = 0;
        for (i_step, &w) in self.weights.iter().enumerate() {
            if w > self.weights[i_peak] {
                i_peak = i_step;
            }
        }
        i_peak as f64 / self.weights.len() as f64
    }
}

/// Number of recruits produced in a step with reproduction weight
/// `repro_weight` by a stock of spawning biomass `ssb`.
pub fn n_recruits(rmax: f64, beta: f64, ssb: f64, repro_weight: f64) -> usize {
    if repro_weight <= 0.0 || ssb <= 0.0 {
        return 0;
    }
    (beverton_holt(rmax, beta, ssb) * repro_weight).ceil() as usize
}
