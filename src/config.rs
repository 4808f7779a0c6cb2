use crate::engine::{DEATH_THRESHOLD, Params};
use crate::model::{
    Haplotype, HaplotypePool, Phenotype, PhenotypeMap, PhenotypeSet, Schedule, Segment,
    SuffixRule,
};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path, str::FromStr};

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Base random seed (run `k` uses `seed + k`).
    pub seed: Option<u64>,

    /// Haplotype pool.
    pub haplotypes: Vec<HaplotypeConfig>,

    /// Phenotypes and their fitness laws (defaults to light and dark).
    #[serde(default)]
    pub phenotypes: Vec<PhenotypeConfig>,

    /// Phenotype assignment for haplotypes without an explicit one.
    pub phenotype_rule: Option<SuffixRule>,

    /// Agent population engine parameters.
    pub agents: Option<AgentsConfig>,

    /// Allele frequency engine parameters.
    pub drift: Option<DriftConfig>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HaplotypeConfig {
    pub id: String,
    #[serde(default)]
    pub sequence: String,
    #[serde(default)]
    pub frequency: f64,
    #[serde(default)]
    pub count: u64,
    pub phenotype: Option<String>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhenotypeConfig {
    pub label: String,
    /// Fitness at pressure 0.
    pub low: f64,
    /// Fitness at pressure 1.
    pub high: f64,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentsConfig {
    /// Initial number of agents.
    pub n_agents: usize,
    /// Maximum number of agents.
    pub max_agents: usize,
    /// Mutation probability per agent per generation.
    pub mutation_rate: f64,
    #[serde(default = "default_death_threshold")]
    pub death_threshold: f64,
    /// Number of generations (defaults to the schedule length).
    pub generations: Option<usize>,
    pub schedule: ScheduleConfig,
}

fn default_death_threshold() -> f64 {
    DEATH_THRESHOLD
}

/// Environmental pressure given either value by value or as segments.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleConfig {
    #[serde(default)]
    pub pressure: Vec<f64>,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriftConfig {
    pub generations: usize,
    pub mutation_rate: f64,
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
        contents.parse()
    }

    fn validate(&self) -> Result<()> {
        check_num(self.haplotypes.len(), 1..10_000).context("invalid number of haplotypes")?;
        for hap in &self.haplotypes {
            check_num(hap.frequency, 0.0..f64::INFINITY)
                .with_context(|| format!("invalid frequency of {:?}", hap.id))?;
        }
        for phe in &self.phenotypes {
            check_num(phe.low, 0.0..10.0)
                .with_context(|| format!("invalid low fitness of {:?}", phe.label))?;
            check_num(phe.high, 0.0..10.0)
                .with_context(|| format!("invalid high fitness of {:?}", phe.label))?;
        }

        // Building the inputs checks pool, phenotypes and their mapping.
        let pool = self.pool()?;
        let phenotypes = self.phenotype_set()?;
        self.phenotype_map(&pool, &phenotypes)?;

        if self.agents.is_none() && self.drift.is_none() {
            bail!("at least one of [agents] or [drift] must be present");
        }

        if let Some(agents) = &self.agents {
            agents.validate().context("invalid [agents] section")?;
        }
        if let Some(drift) = &self.drift {
            drift.validate().context("invalid [drift] section")?;
        }

        Ok(())
    }

    pub fn pool(&self) -> Result<HaplotypePool> {
        let hap_vec = self
            .haplotypes
            .iter()
            .map(|hap| Haplotype {
                sequence: hap.sequence.clone(),
                ..Haplotype::new(hap.id.clone(), hap.frequency, hap.count)
            })
            .collect();
        let pool = HaplotypePool::new(hap_vec).context("invalid haplotype pool")?;
        Ok(pool)
    }

    pub fn phenotype_set(&self) -> Result<PhenotypeSet> {
        if self.phenotypes.is_empty() {
            return Ok(PhenotypeSet::default());
        }
        let phe_vec = self
            .phenotypes
            .iter()
            .map(|phe| Phenotype::new(phe.label.clone(), phe.low, phe.high))
            .collect();
        let phenotypes = PhenotypeSet::new(phe_vec).context("invalid phenotypes")?;
        Ok(phenotypes)
    }

    /// Explicit assignments take precedence over the phenotype rule.
    pub fn phenotype_map(
        &self,
        pool: &HaplotypePool,
        phenotypes: &PhenotypeSet,
    ) -> Result<PhenotypeMap> {
        let map = PhenotypeMap::from_fn(pool, phenotypes, |hap| {
            let i_hap = pool.index_of(&hap.id)?;
            self.haplotypes[i_hap].phenotype.clone().or_else(|| {
                self.phenotype_rule
                    .as_ref()
                    .map(|rule| rule.apply(&hap.id).to_string())
            })
        })
        .context("invalid phenotype assignment")?;
        Ok(map)
    }
}

impl AgentsConfig {
    fn validate(&self) -> Result<()> {
        check_num(self.n_agents, 1..100_000).context("invalid initial number of agents")?;
        check_num(self.max_agents, self.n_agents..1_000_000)
            .context("invalid maximum number of agents")?;
        check_num(self.mutation_rate, 0.0..=1.0).context("invalid mutation rate")?;
        check_num(self.death_threshold, 0.0..=1.0).context("invalid death threshold")?;
        if let Some(generations) = self.generations {
            check_num(generations, 1..10_000).context("invalid number of generations")?;
        }
        self.schedule().context("invalid schedule")?;
        Ok(())
    }

    pub fn params(&self) -> Params {
        Params {
            n_agents: self.n_agents,
            max_agents: self.max_agents,
            mutation_rate: self.mutation_rate,
            death_threshold: self.death_threshold,
        }
    }

    pub fn schedule(&self) -> Result<Schedule> {
        let cfg = &self.schedule;
        let schedule = match (cfg.pressure.is_empty(), cfg.segments.is_empty()) {
            (false, true) => Schedule::new(cfg.pressure.clone())?,
            (true, false) => Schedule::from_segments(&cfg.segments)?,
            (false, false) => bail!("schedule must give either pressure or segments, not both"),
            (true, true) => bail!("schedule must give pressure or segments"),
        };
        Ok(schedule)
    }

    pub fn generations(&self) -> Result<usize> {
        match self.generations {
            Some(generations) => Ok(generations),
            None => Ok(self.schedule()?.len()),
        }
    }
}

impl DriftConfig {
    fn validate(&self) -> Result<()> {
        check_num(self.generations, 1..10_000).context("invalid number of generations")?;
        check_num(self.mutation_rate, 0.0..=1.0).context("invalid mutation rate")?;
        Ok(())
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
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

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
seed = 7

[[haplotypes]]
id = "HAP_001"
sequence = "AACTTTATATTTTATTTTTGG"
frequency = 0.75
count = 3

[[haplotypes]]
id = "HAP_002"
frequency = 0.25
count = 1

[[haplotypes]]
id = "HAP_003"
frequency = 0.0
phenotype = "dark"

[phenotype_rule]
suffix = "002"
matched = "dark"
otherwise = "light"

[agents]
n_agents = 100
max_agents = 400
mutation_rate = 0.01

[[agents.schedule.segments]]
pressure = 0.2
generations = 10

[[agents.schedule.segments]]
pressure = 0.8
generations = 10

[drift]
generations = 50
mutation_rate = 0.1
"#;

    #[test]
    fn parses_and_builds_inputs() {
        let cfg = CONFIG.parse::<Config>().unwrap();
        assert_eq!(cfg.seed, Some(7));

        let pool = cfg.pool().unwrap();
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.get(0).sequence, "AACTTTATATTTTATTTTTGG");

        let phenotypes = cfg.phenotype_set().unwrap();
        let map = cfg.phenotype_map(&pool, &phenotypes).unwrap();
        let labels: Vec<_> = (0..pool.len())
            .map(|i_hap| phenotypes.label(map.phenotype_of(i_hap)))
            .collect();
        assert_eq!(labels, vec!["light", "dark", "dark"]);

        let agents = cfg.agents.as_ref().unwrap();
        assert_eq!(agents.death_threshold, DEATH_THRESHOLD);
        assert_eq!(agents.generations().unwrap(), 20);
        let schedule = agents.schedule().unwrap();
        assert_eq!(schedule.pressure_at(9), 0.2);
        assert_eq!(schedule.pressure_at(10), 0.8);
    }

    #[test]
    fn rejects_unmapped_haplotype() {
        let rule = "[phenotype_rule]\nsuffix = \"002\"\nmatched = \"dark\"\notherwise = \"light\"\n";
        assert!(CONFIG.contains(rule));
        let contents = CONFIG.replace(rule, "");
        assert!(contents.parse::<Config>().is_err());
    }

    #[test]
    fn rejects_invalid_values() {
        let contents = CONFIG.replace("mutation_rate = 0.01", "mutation_rate = 1.5");
        assert!(contents.parse::<Config>().is_err());

        let contents = CONFIG.replace("max_agents = 400", "max_agents = 50");
        assert!(contents.parse::<Config>().is_err());

        let contents = CONFIG.replace("frequency = 0.25", "frequency = -0.25");
        assert!(contents.parse::<Config>().is_err());
    }

    #[test]
    fn schedule_needs_exactly_one_form() {
        let mut agents = CONFIG.parse::<Config>().unwrap().agents.unwrap();
        agents.generations = Some(30);
        assert_eq!(agents.generations().unwrap(), 30);

        agents.schedule.pressure = vec![0.5];
        assert!(agents.schedule().is_err());

        agents.schedule.segments.clear();
        assert_eq!(agents.schedule().unwrap().len(), 1);

        agents.schedule.pressure.clear();
        assert!(agents.schedule().is_err());
    }
}
