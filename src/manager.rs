use crate::analysis::Analyzer;
use crate::config::Config;
use crate::drift::DriftEngine;
use crate::engine::Engine;
use crate::export::{create_file, save_records, write_agents_csv, write_drift_csv};
use crate::model::{DriftRecord, Record};
use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use glob::glob;
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Simulation model run by a [`Manager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EngineKind {
    /// Agent population under environmental selection.
    Agents,
    /// Neutral allele frequency resampling.
    Drift,
}

impl EngineKind {
    fn name(self) -> &'static str {
        match self {
            Self::Agents => "agents",
            Self::Drift => "drift",
        }
    }
}

pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    /// Perform a new replicate run of the given engine in its own run dir.
    pub fn create_run(&self, kind: EngineKind) -> Result<()> {
        match kind {
            EngineKind::Agents if self.cfg.agents.is_none() => {
                bail!("config has no [agents] section")
            }
            EngineKind::Drift if self.cfg.drift.is_none() => bail!("config has no [drift] section"),
            _ => {}
        }

        let run_idx = self.count_run_dirs().context("failed to count run dirs")?;

        let run_dir = self.run_dir(run_idx);
        fs::create_dir_all(&run_dir).with_context(|| format!("failed to create {run_dir:?}"))?;
        log::info!("created {run_dir:?}");

        let seed = match self.cfg.seed {
            Some(seed) => seed.wrapping_add(run_idx as u64),
            None => rand::rng().random(),
        };
        log::info!("using seed {seed}");
        let rng = ChaCha12Rng::seed_from_u64(seed);

        match kind {
            EngineKind::Agents => self.run_agents(run_idx, rng),
            EngineKind::Drift => self.run_drift(run_idx, rng),
        }
    }

    fn run_agents(&self, run_idx: usize, rng: ChaCha12Rng) -> Result<()> {
        let agents = self.cfg.agents.as_ref().context("config has no [agents] section")?;

        let pool = self.cfg.pool()?;
        let phenotypes = self.cfg.phenotype_set()?;
        let phenotype_map = self.cfg.phenotype_map(&pool, &phenotypes)?;
        let schedule = agents.schedule()?;
        let generations = agents.generations()?;

        let mut engine = Engine::new(
            agents.params(),
            pool,
            phenotypes,
            phenotype_map,
            schedule,
            rng,
        )
        .context("failed to construct agent engine")?;

        for _ in 0..generations {
            engine.advance();

            let n_agt = engine.agents().len();
            log::info!(
                "completed generation {:04} (pressure {:.2}, {n_agt} agents)",
                engine.generation(),
                engine.env()
            );
        }

        let kind = EngineKind::Agents;
        let writer = create_file(self.csv_file(run_idx, kind))?;
        write_agents_csv(writer, engine.phenotypes(), engine.report())
            .context("failed to export records")?;
        save_records(self.records_file(run_idx, kind), engine.report())
            .context("failed to save records")?;

        Ok(())
    }

    fn run_drift(&self, run_idx: usize, rng: ChaCha12Rng) -> Result<()> {
        let drift = self.cfg.drift.as_ref().context("config has no [drift] section")?;

        let pool = self.cfg.pool()?;
        let mut engine = DriftEngine::new(&pool, drift.mutation_rate, rng)
            .context("failed to construct drift engine")?;
        log::info!("expanded pool into {} individuals", engine.len());

        let rec_vec: Vec<DriftRecord> = engine.run(drift.generations).collect();
        if let Some(last) = rec_vec.last() {
            log::info!("{last:?}");
        }

        let kind = EngineKind::Drift;
        let writer = create_file(self.csv_file(run_idx, kind))?;
        write_drift_csv(writer, &rec_vec).context("failed to export records")?;
        save_records(self.records_file(run_idx, kind), &rec_vec)
            .context("failed to save records")?;

        Ok(())
    }

    /// Aggregate every engine's replicate runs into a results file.
    pub fn analyze_sim(&self) -> Result<()> {
        let n_runs = self.count_run_dirs().context("failed to count run dirs")?;

        let phenotypes = self.cfg.phenotype_set()?;
        let labels: Vec<_> = phenotypes.labels().map(String::from).collect();
        log::info!("analyzing {n_runs} runs");

        let mut agents_analyzer = Analyzer::<Record>::for_agents(&labels);
        let mut drift_analyzer = Analyzer::<DriftRecord>::for_drift();

        for run_idx in 0..n_runs {
            let file = self.records_file(run_idx, EngineKind::Agents);
            if file.is_file() {
                agents_analyzer
                    .add_file(&file)
                    .with_context(|| format!("failed to add {file:?}"))?;
            }
            let file = self.records_file(run_idx, EngineKind::Drift);
            if file.is_file() {
                drift_analyzer
                    .add_file(&file)
                    .with_context(|| format!("failed to add {file:?}"))?;
            }
        }

        if agents_analyzer.n_runs() > 0 {
            agents_analyzer
                .save_results(self.results_file(EngineKind::Agents))
                .context("failed to save results")?;
        }
        if drift_analyzer.n_runs() > 0 {
            drift_analyzer
                .save_results(self.results_file(EngineKind::Drift))
                .context("failed to save results")?;
        }

        Ok(())
    }

    /// Remove all run dirs and results files.
    pub fn clean_sim(&self) -> Result<()> {
        for run_dir in self.glob_paths("run-*")? {
            fs::remove_dir_all(&run_dir)
                .with_context(|| format!("failed to remove {run_dir:?}"))?;
            log::info!("removed {run_dir:?}");
        }
        for file in self.glob_paths("results-*.json")? {
            fs::remove_file(&file).with_context(|| format!("failed to remove {file:?}"))?;
            log::info!("removed {file:?}");
        }
        Ok(())
    }

    fn glob_paths(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let pattern = self.sim_dir.join(pattern);
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let paths = glob(pattern)
            .context("failed to glob paths")?
            .filter_map(Result::ok)
            .collect();
        Ok(paths)
    }

    fn count_run_dirs(&self) -> Result<usize> {
        let count = self
            .glob_paths("run-*")?
            .into_iter()
            .filter(|p| p.is_dir())
            .count();
        Ok(count)
    }

    fn run_dir(&self, run_idx: usize) -> PathBuf {
        self.sim_dir.join(format!("run-{run_idx:04}"))
    }

    fn csv_file(&self, run_idx: usize, kind: EngineKind) -> PathBuf {
        self.run_dir(run_idx).join(format!("{}.csv", kind.name()))
    }

    fn records_file(&self, run_idx: usize, kind: EngineKind) -> PathBuf {
        self.run_dir(run_idx).join(format!("{}.msgpack", kind.name()))
    }

    fn results_file(&self, kind: EngineKind) -> PathBuf {
        self.sim_dir.join(format!("results-{}.json", kind.name()))
    }
}
