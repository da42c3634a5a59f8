use crate::calendar;
use crate::config::Config;
use crate::growth::{Seasonality, length_increment, weight_at_length};
use crate::maturity::is_mature;
use crate::model::{IdCounter, Population, Traits};
use crate::mortality::{Deaths, MortalityRates, apply_mortality};
use crate::recruitment::{ReproSchedule, n_recruits};
use crate::sampling::{LengthFrequency, Sample, bin_samples, draw_catch};
use crate::stats::{BirthTraits, TraitSummary};
use crate::traits::TraitDistributions;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use serde::Serialize;

/// Tolerance used to match step times against fishing times.
const TIME_TOL: f64 = 1e-8;

/// Sink for progress updates, called once per step.
pub trait Progress {
    fn update(&mut self, current: usize, total: usize);
}

/// Logs progress every tenth of the run.
#[derive(Debug, Default)]
pub struct LogProgress {
    last_decile: usize,
}

impl Progress for LogProgress {
    fn update(&mut self, current: usize, total: usize) {
        if total == 0 {
            return;
        }
        let decile = 10 * current / total;
        if decile > self.last_decile {
            self.last_decile = decile;
            let progress = 100.0 * current as f64 / total as f64;
            log::info!("completed {progress:06.2}%");
        }
    }
}

/// Discards progress updates.
pub struct NoProgress;

impl Progress for NoProgress {
    fn update(&mut self, _current: usize, _total: usize) {}
}

/// Population trajectory, one entry per step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopSeries {
    pub times: Vec<f64>,
    pub dates: Vec<NaiveDate>,
    pub abundance: Vec<usize>,
    pub biomass: Vec<f64>,
    pub ssb: Vec<f64>,
}

/// Growth parameters of the simulated stock.
///
/// The `*_mu`, `c`, `ts` and `phi_prime` fields are the population values
/// an assessment should recover; the `realized_*` fields summarize the
/// individuals actually born.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthSummary {
    pub linf: f64,
    pub k: f64,
    pub c: f64,
    pub ts: f64,
    pub phi_prime: f64,
    /// Time of year of peak recruitment.
    pub t_anchor: f64,
    pub realized_linf: TraitSummary,
    pub realized_k: TraitSummary,
    pub realized_phi_prime: TraitSummary,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Results {
    pub seed: u64,
    pub pop: PopSeries,
    pub lfq: LengthFrequency,
    pub growth: GrowthSummary,
    /// Raw catch samples, written separately.
    #[serde(skip)]
    pub samples: Vec<Sample>,
}

/// What happened during one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub time: f64,
    pub n_recruits: usize,
    pub deaths: Deaths,
    pub n_sampled: usize,
}

/// Simulation engine.
///
/// Owns the configuration, the population, the identifier counter and
/// the random number generator, and advances the population one step
/// at a time.
pub struct Engine {
    cfg: Config,
    seed: u64,
    rng: ChaCha12Rng,
    pop: Population,
    ids: IdCounter,
    trait_dists: TraitDistributions,
    schedule: ReproSchedule,
    n_steps: usize,
    i_step: usize,
    dates: Vec<NaiveDate>,
    abundance: Vec<usize>,
    biomass: Vec<f64>,
    ssb: Vec<f64>,
    samples: Vec<Sample>,
    births: BirthTraits,
}

impl Engine {
    /// Create a new `Engine` with the initial population of `cfg`.
    ///
    /// Uses the configured seed, or draws one from the OS.
    pub fn generate_initial_condition(cfg: Config) -> Result<Self> {
        cfg.validate().context("failed to validate config")?;

        let seed = match cfg.simulation.seed {
            Some(seed) => seed,
            None => ChaCha12Rng::try_from_os_rng()
                .context("failed to seed from the OS")?
                .random(),
        };
        let rng = ChaCha12Rng::seed_from_u64(seed);
        log::info!("seed {seed}");

        let trait_dists =
            TraitDistributions::new(&cfg).context("failed to construct trait distributions")?;
        let schedule = ReproSchedule::new(&cfg.recruitment.repro_weights);

        let n_steps = cfg.n_steps();
        let times: Vec<f64> = (0..n_steps).map(|i_step| cfg.step_time(i_step)).collect();
        let dates = calendar::step_dates(
            &times,
            cfg.simulation.time_min,
            cfg.simulation.time_min_date,
        )
        .context("failed to compute step dates")?;
        log::info!("{n_steps} steps from {} to {}", dates[0], dates[n_steps - 1]);

        let n0 = cfg.simulation.n0;
        let mut engine = Self {
            seed,
            rng,
            pop: Population::with_capacity(n0),
            ids: IdCounter::new(),
            trait_dists,
            schedule,
            n_steps,
            i_step: 0,
            dates,
            abundance: Vec::with_capacity(n_steps),
            biomass: Vec::with_capacity(n_steps),
            ssb: Vec::with_capacity(n_steps),
            samples: Vec::new(),
            births: BirthTraits::default(),
            cfg,
        };

        // The initial cohort starts at age 1.
        engine
            .add_individuals(n0, 1.0)
            .context("failed to add initial individuals")?;

        Ok(engine)
    }

    /// Advance through every remaining step and collect the results.
    pub fn run_simulation(mut self, progress: &mut dyn Progress) -> Result<Results> {
        while self.i_step < self.n_steps {
            let report = self
                .perform_step()
                .with_context(|| format!("failed to perform step {}", self.i_step))?;
            log::debug!(
                "t = {:.4}: {} recruits, {} deaths ({} fished), {} sampled",
                report.time,
                report.n_recruits,
                report.deaths.total(),
                report.deaths.fished,
                report.n_sampled
            );
            progress.update(self.i_step, self.n_steps);
        }
        self.finish()
    }

    fn perform_step(&mut self) -> Result<StepReport> {
        let time = self.cfg.step_time(self.i_step);
        let dt = self.cfg.simulation.dt;

        // Fishing and sampling happen together.
        let fishing = self.is_fishing_time(time);
        let f_max = if fishing { self.cfg.harvest_rate() } else { 0.0 };
        let repro_weight = self.schedule.weight(self.i_step);

        self.grow_individuals(time - dt, time);

        self.mature_individuals();

        let n_recruits = self.reproduce(repro_weight).context("failed to add recruits")?;

        let rates = MortalityRates {
            m: self.cfg.mortality.m,
            f_max,
            l50: self.cfg.l50(),
            wqs: self.cfg.wqs(),
        };
        let deaths = apply_mortality(&mut self.pop, rates, dt, &mut self.rng)
            .context("failed to apply mortality")?;

        let n_sampled = if fishing { self.sample_catch(time) } else { 0 };

        self.pop.remove_dead();

        self.abundance.push(self.pop.len());
        self.biomass.push(self.pop.biomass());
        self.ssb.push(self.pop.spawning_biomass());

        self.i_step += 1;

        Ok(StepReport {
            time,
            n_recruits,
            deaths,
            n_sampled,
        })
    }

    fn is_fishing_time(&self, time: f64) -> bool {
        match &self.cfg.simulation.fished_times {
            None => true,
            Some(fished_times) => fished_times.iter().any(|&t| (time - t).abs() < TIME_TOL),
        }
    }

    fn grow_individuals(&mut self, t1: f64, t2: f64) {
        let season = Seasonality {
            ts: self.cfg.growth.ts,
            c: self.cfg.growth.c,
        };
        let (a, b) = (self.cfg.length_weight.a, self.cfg.length_weight.b);
        let pop = &mut self.pop;
        for i_ind in 0..pop.len() {
            let (linf, k) = (pop.linf[i_ind], pop.k[i_ind]);
            let length = length_increment(linf, k, season, pop.length[i_ind], t1, t2);
            pop.length[i_ind] = length;
            pop.weight[i_ind] = weight_at_length(length, a, b);
            pop.age[i_ind] += t2 - t1;
        }
    }

    fn mature_individuals(&mut self) {
        let pop = &mut self.pop;
        for i_ind in 0..pop.len() {
            pop.mature[i_ind] = is_mature(pop.mature[i_ind], pop.length[i_ind], pop.lmat[i_ind]);
        }
    }

    fn reproduce(&mut self, repro_weight: f64) -> Result<usize> {
        if self.pop.n_mature() == 0 {
            return Ok(0);
        }
        let rec = &self.cfg.recruitment;
        let n_new = n_recruits(rec.rmax, rec.beta, self.pop.spawning_biomass(), repro_weight);
        self.add_individuals(n_new, 0.0)?;
        Ok(n_new)
    }

    fn add_individuals(&mut self, n: usize, age: f64) -> Result<()> {
        if n == 0 {
            return Ok(());
        }
        let (a, b) = (self.cfg.length_weight.a, self.cfg.length_weight.b);
        let id_range = self.ids.allocate(n)?;
        let traits_vec: Vec<Traits> = self.trait_dists.express(n, &mut self.rng);
        for (id, traits) in id_range.zip(traits_vec) {
            self.births.record(&traits);
            self.pop.push(id, age, 0.0, weight_at_length(0.0, a, b), traits);
        }
        Ok(())
    }

    /// Keep a sample of this step's catch. A step without catch is
    /// skipped without failing the run.
    fn sample_catch(&mut self, time: f64) -> usize {
        match draw_catch(&self.pop, self.cfg.output.sample_fraction, &mut self.rng) {
            Ok(i_ind_vec) => {
                let individuals: Vec<_> =
                    i_ind_vec.iter().map(|&i_ind| self.pop.record(i_ind)).collect();
                let n_sampled = individuals.len();
                self.samples.push(Sample {
                    time,
                    date: self.dates[self.i_step],
                    individuals,
                });
                n_sampled
            }
            Err(error) => {
                log::debug!("skipped catch sample at t = {time}: {error:#}");
                0
            }
        }
    }

    fn finish(self) -> Result<Results> {
        let n_done = self.i_step;
        let times: Vec<f64> = (0..n_done).map(|i_step| self.cfg.step_time(i_step)).collect();

        if self.pop.is_empty() {
            log::warn!("population is extinct at the end of the run");
        }
        log::info!("{} individuals created", self.ids.last());

        let lfq = bin_samples(&self.samples, self.cfg.output.bin_size);
        if lfq.is_empty() {
            log::info!("no catch was sampled");
        } else {
            let n_measured: u64 = (0..lfq.times.len()).map(|i| lfq.sample_total(i)).sum();
            log::info!(
                "{} catch samples, {n_measured} individuals measured in {} length bins",
                lfq.times.len(),
                lfq.mid_lengths.len()
            );
        }

        let grw = &self.cfg.growth;
        let growth = GrowthSummary {
            linf: grw.linf_mu,
            k: grw.k_mu,
            c: grw.c,
            ts: grw.ts,
            phi_prime: grw.k_mu.log10() + 2.0 * grw.linf_mu.log10(),
            t_anchor: self.schedule.peak_time(),
            realized_linf: self.births.linf.summary(),
            realized_k: self.births.k.summary(),
            realized_phi_prime: self.births.phi_prime.summary(),
        };

        let pop = PopSeries {
            times,
            dates: self.dates[..n_done].to_vec(),
            abundance: self.abundance,
            biomass: self.biomass,
            ssb: self.ssb,
        };

        Ok(Results {
            seed: self.seed,
            pop,
            lfq,
            growth,
            samples: self.samples,
        })
    }
}
