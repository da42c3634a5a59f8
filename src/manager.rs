use crate::config::Config;
use crate::engine::{Engine, LogProgress, NoProgress, Progress};
use anyhow::{Context, Result};
use glob::glob;
use rmp_serde::encode;
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg = Config::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    /// Report what a run with the loaded configuration would cover.
    pub fn check_sim(&self) -> Result<()> {
        let sim = &self.cfg.simulation;
        let n_fished = match &sim.fished_times {
            None => self.cfg.n_steps(),
            Some(fished_times) => fished_times.len(),
        };
        log::info!(
            "config is valid: {} steps of {:.4} from t = {} ({}), {n_fished} fishing times",
            self.cfg.n_steps(),
            sim.dt,
            sim.time_min,
            sim.time_min_date
        );
        Ok(())
    }

    /// Run one simulation into a new run directory.
    ///
    /// `seed` overrides the seed of the configuration.
    pub fn create_run(&self, seed: Option<u64>) -> Result<()> {
        let run_idx = self.count_run_dirs().context("failed to count run dirs")?;
        let run_dir = self.run_dir(run_idx);
        fs::create_dir_all(&run_dir).with_context(|| format!("failed to create {run_dir:?}"))?;
        log::info!("created {run_dir:?}");

        let mut cfg = self.cfg.clone();
        if seed.is_some() {
            cfg.simulation.seed = seed;
        }

        let mut progress: Box<dyn Progress> = if cfg.output.progress {
            Box::new(LogProgress::default())
        } else {
            Box::new(NoProgress)
        };

        let engine =
            Engine::generate_initial_condition(cfg).context("failed to generate initial condition")?;
        let results = engine
            .run_simulation(progress.as_mut())
            .context("failed to run simulation")?;

        let results_file = run_dir.join("results.json");
        let file = File::create(&results_file)
            .with_context(|| format!("failed to create {results_file:?}"))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &results).context("failed to serialize results")?;
        writer.flush().context("failed to flush writer stream")?;
        log::info!("wrote {results_file:?}");

        let samples_file = run_dir.join("samples.msgpack");
        let file = File::create(&samples_file)
            .with_context(|| format!("failed to create {samples_file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write(&mut writer, &results.samples).context("failed to serialize samples")?;
        writer.flush().context("failed to flush writer stream")?;
        log::info!("wrote {samples_file:?}");

        Ok(())
    }

    /// Remove every run directory.
    pub fn clean_sim(&self) -> Result<()> {
        for run_dir in self.run_dirs().context("failed to list run dirs")? {
            fs::remove_dir_all(&run_dir).with_context(|| format!("failed to remove {run_dir:?}"))?;
            log::info!("removed {run_dir:?}");
        }
        Ok(())
    }

    fn run_dirs(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.sim_dir.join("run-*");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let run_dirs = glob(pattern)
            .context("failed to glob run dirs")?
            .filter_map(Result::ok)
            .filter(|p| p.is_dir())
            .collect();
        Ok(run_dirs)
    }

    fn count_run_dirs(&self) -> Result<usize> {
        Ok(self.run_dirs()?.len())
    }

    fn run_dir(&self, run_idx: usize) -> PathBuf {
        self.sim_dir.join(format!("run-{run_idx:04}"))
    }
}
