use crate::agent::{Agent, StepContext, StepOutcome};
use crate::error::ConfigError;
use crate::model::{HaplotypePool, PhenotypeMap, PhenotypeSet, Record, Schedule};
use crate::stats::shannon_index;
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::{Bernoulli, Uniform, weighted::WeightedIndex};

/// Default fitness below which an agent dies.
pub const DEATH_THRESHOLD: f64 = 0.1;

/// Scalar parameters of the agent population.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Params {
    /// Initial number of agents.
    pub n_agents: usize,
    /// Hard upper bound on the number of agents.
    pub max_agents: usize,
    /// Probability of mutation per agent per generation.
    pub mutation_rate: f64,
    pub death_threshold: f64,
}

/// Agent population engine.
///
/// Holds the haplotype pool, phenotypes, environment schedule, live agents,
/// collected records and random number generator.
pub struct Engine<R: Rng = ChaCha12Rng> {
    pool: HaplotypePool,
    phenotypes: PhenotypeSet,
    phenotype_map: PhenotypeMap,
    schedule: Schedule,

    max_agents: usize,
    death_threshold: f64,
    mut_dist: Bernoulli,
    hap_dist: Uniform<usize>,

    generation: usize,
    env: f64,
    agt_vec: Vec<Agent>,
    last_id: u64,

    records: Vec<Record>,

    rng: R,
}

impl<R: Rng> Engine<R> {
    /// Create a new `Engine` with agents sampled from the pool frequencies.
    pub fn new(
        params: Params,
        pool: HaplotypePool,
        phenotypes: PhenotypeSet,
        phenotype_map: PhenotypeMap,
        schedule: Schedule,
        mut rng: R,
    ) -> Result<Self, ConfigError> {
        if params.n_agents == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        if params.n_agents > params.max_agents {
            return Err(ConfigError::PopulationAboveCap {
                n_agents: params.n_agents,
                max_agents: params.max_agents,
            });
        }
        if !(0.0..=1.0).contains(&params.mutation_rate) {
            return Err(ConfigError::ProbabilityOutOfRange {
                name: "mutation rate",
                value: params.mutation_rate,
            });
        }
        if !params.death_threshold.is_finite() || params.death_threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold(params.death_threshold));
        }
        if phenotype_map.len() != pool.len() {
            return Err(ConfigError::MapSizeMismatch {
                mapped: phenotype_map.len(),
                n_haps: pool.len(),
            });
        }
        for (i_hap, hap) in pool.iter().enumerate() {
            let i_phe = phenotype_map.phenotype_of(i_hap);
            if i_phe >= phenotypes.len() {
                return Err(ConfigError::PhenotypeOutOfRange {
                    id: hap.id.clone(),
                    i_phe,
                    n_phes: phenotypes.len(),
                });
            }
        }
        for hap in pool.iter() {
            if !hap.frequency.is_finite() || hap.frequency < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    id: hap.id.clone(),
                    weight: hap.frequency,
                });
            }
        }

        let hap_init_dist = WeightedIndex::new(pool.iter().map(|hap| hap.frequency))
            .map_err(|_| ConfigError::NoPositiveWeight)?;
        let mut_dist = Bernoulli::new(params.mutation_rate).map_err(|_| {
            ConfigError::ProbabilityOutOfRange {
                name: "mutation rate",
                value: params.mutation_rate,
            }
        })?;
        let hap_dist = Uniform::new(0, pool.len()).map_err(|_| ConfigError::EmptyPool)?;

        let mut agt_vec = Vec::with_capacity(params.max_agents);
        for id in 1..=params.n_agents as u64 {
            let hap = hap_init_dist.sample(&mut rng);
            agt_vec.push(Agent::new(id, hap, phenotype_map.phenotype_of(hap)));
        }

        let env = schedule.pressure_at(0);

        Ok(Self {
            pool,
            phenotypes,
            phenotype_map,
            schedule,
            max_agents: params.max_agents,
            death_threshold: params.death_threshold,
            mut_dist,
            hap_dist,
            generation: 0,
            env,
            agt_vec,
            last_id: params.n_agents as u64,
            records: Vec::new(),
            rng,
        })
    }

    /// Advance the population by one generation.
    ///
    /// The record of a generation describes the population before its agents step.
    /// Offspring born during the generation do not step until the next one.
    pub fn advance(&mut self) {
        self.env = self.schedule.pressure_at(self.generation);

        let record = self.snapshot();
        log::debug!("{record:?}");
        self.records.push(record);

        // Execution order decides which agents find room under the cap.
        self.agt_vec.shuffle(&mut self.rng);

        let ctx = StepContext {
            pool: &self.pool,
            phenotypes: &self.phenotypes,
            phenotype_map: &self.phenotype_map,
            env: self.env,
            mut_dist: self.mut_dist.clone(),
            hap_dist: self.hap_dist.clone(),
            death_threshold: self.death_threshold,
        };

        let n_agt_start = self.agt_vec.len();
        let mut n_agt_live = n_agt_start;
        let mut survivors = Vec::with_capacity(n_agt_start);
        let mut offspring = Vec::new();

        for mut agt in std::mem::take(&mut self.agt_vec) {
            match agt.step(&ctx, &mut self.rng) {
                StepOutcome::Died => n_agt_live -= 1,
                StepOutcome::Survived => survivors.push(agt),
                StepOutcome::Reproduced => {
                    // Births beyond the cap are dropped.
                    if n_agt_live < self.max_agents {
                        self.last_id += 1;
                        offspring.push(agt.offspring(self.last_id));
                        n_agt_live += 1;
                    }
                    survivors.push(agt);
                }
            }
        }

        survivors.append(&mut offspring);
        self.agt_vec = survivors;

        if n_agt_start > 0 && self.agt_vec.is_empty() {
            log::warn!("population extinct at generation {}", self.generation);
        }

        self.generation += 1;
    }

    /// Compute the summary record of the current population.
    pub fn snapshot(&self) -> Record {
        let mut hap_counts = vec![0; self.pool.len()];
        let mut phenotype_counts = vec![0; self.phenotypes.len()];
        for agt in &self.agt_vec {
            hap_counts[agt.hap()] += 1;
            phenotype_counts[agt.phe()] += 1;
        }

        Record {
            generation: self.generation,
            population_size: self.agt_vec.len(),
            diversity: shannon_index(&hap_counts),
            phenotype_counts,
            pressure: self.env,
        }
    }

    /// Records collected so far, one per advanced generation.
    pub fn report(&self) -> &[Record] {
        &self.records
    }

    pub fn into_report(self) -> Vec<Record> {
        self.records
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn env(&self) -> f64 {
        self.env
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agt_vec
    }

    pub fn phenotypes(&self) -> &PhenotypeSet {
        &self.phenotypes
    }
}
