use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Upper bound on the number of time steps of a run.
pub const MAX_STEPS: usize = 1_000_000;

/// Upper bound on the maximum number of recruits per year.
pub const MAX_RMAX: f64 = 1e9;

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Growth parameters.
    pub growth: GrowthConfig,
    /// Length-weight relationship parameters.
    pub length_weight: LengthWeightConfig,
    /// Maturity parameters.
    pub maturity: MaturityConfig,
    /// Recruitment parameters.
    pub recruitment: RecruitmentConfig,
    /// Mortality and fishing parameters.
    pub mortality: MortalityConfig,
    /// Simulation control parameters.
    pub simulation: SimulationConfig,
    /// Output parameters.
    pub output: OutputConfig,
}

/// Seasonally oscillating von Bertalanffy growth parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GrowthConfig {
    /// Mean growth coefficient.
    pub k_mu: f64,
    /// Coefficient of variation of the growth coefficient.
    pub k_cv: f64,
    /// Mean asymptotic length.
    pub linf_mu: f64,
    /// Coefficient of variation of the asymptotic length.
    pub linf_cv: f64,
    /// Summer point (fraction of the year).
    pub ts: f64,
    /// Strength of the seasonal oscillation.
    pub c: f64,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            k_mu: 0.5,
            k_cv: 0.1,
            linf_mu: 80.0,
            linf_cv: 0.1,
            ts: 0.0,
            c: 0.85,
        }
    }
}

/// Parameters of `weight = a * length^b`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LengthWeightConfig {
    pub a: f64,
    pub b: f64,
}

impl Default for LengthWeightConfig {
    fn default() -> Self {
        Self { a: 0.01, b: 3.0 }
    }
}

/// Maturity parameters.
///
/// Missing values are derived from the growth parameters,
/// see [`Config::lmat`] and [`Config::wmat`].
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MaturityConfig {
    /// Mean length at maturity.
    pub lmat: Option<f64>,
    /// Width between 25% and 75% quantiles of the length at maturity.
    pub wmat: Option<f64>,
}

/// Beverton-Holt recruitment parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecruitmentConfig {
    /// Maximum number of recruits per year.
    pub rmax: f64,
    /// Spawning biomass at which recruitment is half of `rmax`.
    pub beta: f64,
    /// Relative reproduction weights over one year (one per time step).
    pub repro_weights: Vec<f64>,
}

impl Default for RecruitmentConfig {
    fn default() -> Self {
        let mut repro_weights = vec![0.0; 12];
        repro_weights[3] = 1.0;
        Self {
            rmax: 10_000.0,
            beta: 1.0,
            repro_weights,
        }
    }
}

/// Natural and fishing mortality parameters.
///
/// Missing values are derived, see [`Config::harvest_rate`],
/// [`Config::l50`] and [`Config::wqs`].
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MortalityConfig {
    /// Instantaneous natural mortality rate.
    pub m: f64,
    /// Fishing mortality rate applied at fishing times.
    pub harvest_rate: Option<f64>,
    /// Length at 50% selectivity.
    pub l50: Option<f64>,
    /// Width of the selectivity ogive (L75 - L25).
    pub wqs: Option<f64>,
}

impl Default for MortalityConfig {
    fn default() -> Self {
        Self {
            m: 0.7,
            harvest_rate: None,
            l50: None,
            wqs: None,
        }
    }
}

/// Simulation control parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// First time step (decimal years).
    pub time_min: f64,
    /// Last time step (decimal years).
    pub time_max: f64,
    /// Calendar date of `time_min`.
    pub time_min_date: NaiveDate,
    /// Time step length (fraction of a year).
    pub dt: f64,
    /// Initial number of individuals.
    pub n0: usize,
    /// Times at which fishing and sampling take place (every step if absent).
    pub fished_times: Option<Vec<f64>>,
    /// Random seed (drawn from the OS if absent).
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            time_min: 0.0,
            time_max: 10.0,
            time_min_date: NaiveDate::from_ymd_opt(1980, 1, 1).unwrap_or_default(),
            dt: 1.0 / 12.0,
            n0: 10_000,
            fished_times: None,
            seed: None,
        }
    }
}

/// Output parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Fraction of the fished individuals sampled at each fishing time.
    pub sample_fraction: f64,
    /// Length bin size of the length-frequency matrix.
    pub bin_size: f64,
    /// Report progress while running.
    pub progress: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sample_fraction: 1.0,
            bin_size: 1.0,
            progress: true,
        }
    }
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded and contain a serialized [`Config`].
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    /// Check every parameter, including the coupling between the
    /// reproduction schedule and the time step.
    pub fn validate(&self) -> Result<()> {
        let grw = &self.growth;
        check_pos(grw.k_mu).context("invalid mean growth coefficient")?;
        check_real(grw.k_cv, 0.0..1.0).context("invalid growth coefficient cv")?;
        check_pos(grw.linf_mu).context("invalid mean asymptotic length")?;
        check_real(grw.linf_cv, 0.0..1.0).context("invalid asymptotic length cv")?;
        check_real(grw.ts, 0.0..=1.0).context("invalid summer point")?;
        check_real(grw.c, 0.0..=1.0).context("invalid oscillation strength")?;

        check_pos(self.length_weight.a).context("invalid length-weight factor")?;
        check_pos(self.length_weight.b).context("invalid length-weight exponent")?;

        check_pos(self.lmat()).context("invalid length at maturity")?;
        check_real(self.wmat(), 0.0..).context("invalid maturity width")?;

        let rec = &self.recruitment;
        check_real(rec.rmax, 0.0..=MAX_RMAX).context("invalid maximum recruitment")?;
        check_pos(rec.beta).context("invalid half-saturation biomass")?;
        check_weights(&rec.repro_weights).context("invalid reproduction weights")?;

        check_real(self.mortality.m, 0.0..).context("invalid natural mortality")?;
        check_real(self.harvest_rate(), 0.0..).context("invalid harvest rate")?;
        check_real(self.l50(), 0.0..).context("invalid length at 50% selectivity")?;
        check_pos(self.wqs()).context("invalid selectivity width")?;

        let sim = &self.simulation;
        check_real(sim.dt, f64::EPSILON..=1.0).context("invalid time step")?;
        check_real(sim.time_min, ..).context("invalid start time")?;
        check_real(sim.time_max, sim.time_min..).context("invalid time range")?;
        let n_intervals = (sim.time_max - sim.time_min) / sim.dt;
        check_real(n_intervals, 0.0..MAX_STEPS as f64).context("invalid number of steps")?;
        check_num(sim.n0, 0..=10_000_000).context("invalid initial number of individuals")?;
        if let Some(fished_times) = &sim.fished_times {
            if fished_times.iter().any(|t| !t.is_finite()) {
                bail!("fishing times must be finite");
            }
        }
        check_schedule(sim.dt, rec.repro_weights.len())
            .context("reproduction schedule does not match time step")?;

        check_real(self.output.sample_fraction, f64::EPSILON..=1.0)
            .context("invalid sample fraction")?;
        check_pos(self.output.bin_size).context("invalid bin size")?;

        Ok(())
    }

    /// Mean length at maturity.
    pub fn lmat(&self) -> f64 {
        self.maturity.lmat.unwrap_or(0.5 * self.growth.linf_mu)
    }

    /// Width between the 25% and 75% maturity quantiles.
    pub fn wmat(&self) -> f64 {
        self.maturity.wmat.unwrap_or(0.2 * self.lmat())
    }

    /// Fishing mortality rate applied at fishing times.
    pub fn harvest_rate(&self) -> f64 {
        self.mortality.harvest_rate.unwrap_or(self.mortality.m)
    }

    /// Length at 50% selectivity.
    pub fn l50(&self) -> f64 {
        self.mortality.l50.unwrap_or(0.25 * self.growth.linf_mu)
    }

    /// Width of the selectivity ogive.
    pub fn wqs(&self) -> f64 {
        self.mortality.wqs.unwrap_or(0.2 * self.l50())
    }

    /// Number of time steps between `time_min` and `time_max` inclusive.
    ///
    /// Bounded by [`MAX_STEPS`] once the config is validated.
    pub fn n_steps(&self) -> usize {
        let sim = &self.simulation;
        ((sim.time_max - sim.time_min) / sim.dt + 1e-9).floor() as usize + 1
    }

    /// Time of step `step` (decimal years).
    pub fn step_time(&self, step: usize) -> f64 {
        self.simulation.time_min + step as f64 * self.simulation.dt
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

fn check_real<R>(num: f64, range: R) -> Result<()>
where
    R: RangeBounds<f64> + Debug,
{
    if !num.is_finite() {
        bail!("number must be finite, but is {num:?}");
    }
    check_num(num, range)
}

fn check_pos(num: f64) -> Result<()> {
    if !(num.is_finite() && num > 0.0) {
        bail!("number must be positive and finite, but is {num:?}");
    }
    Ok(())
}

fn check_weights(vec: &[f64]) -> Result<()> {
    if vec.is_empty() {
        bail!("vector must not be empty");
    }
    if vec.iter().any(|&ele| !(ele.is_finite() && ele >= 0.0)) {
        bail!("vector must have only non-negative finite elements");
    }
    let sum: f64 = vec.iter().sum();
    if sum <= 0.0 {
        bail!("vector must have a positive sum, but sums to {sum}");
    }
    Ok(())
}

fn check_schedule(dt: f64, len: usize) -> Result<()> {
    let steps_per_year = 1.0 / dt;
    let tol = 1e-8;
    if (steps_per_year - len as f64).abs() > tol {
        bail!("1/dt must equal the schedule length {len} (tolerance: {tol}), but is {steps_per_year}");
    }
    Ok(())
}
