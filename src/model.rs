//! Simulation data types.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Entry of the haplotype pool.
#[derive(Debug, Clone, PartialEq)]
pub struct Haplotype {
    /// Haplotype identifier.
    pub id: String,
    /// Representative sequence.
    pub sequence: String,
    /// Relative sampling weight (agent population).
    pub frequency: f64,
    /// Number of observed sequences (allele frequency population).
    pub count: u64,
}

impl Haplotype {
    pub fn new(id: impl Into<String>, frequency: f64, count: u64) -> Self {
        Self {
            id: id.into(),
            sequence: String::new(),
            frequency,
            count,
        }
    }
}

/// Immutable, ordered collection of haplotypes addressed by index.
#[derive(Debug, Clone)]
pub struct HaplotypePool {
    hap_vec: Vec<Haplotype>,
    idx_by_id: HashMap<String, usize>,
}

impl HaplotypePool {
    /// Create a pool, rejecting empty and duplicated entries.
    pub fn new(hap_vec: Vec<Haplotype>) -> Result<Self, ConfigError> {
        if hap_vec.is_empty() {
            return Err(ConfigError::EmptyPool);
        }
        let mut idx_by_id = HashMap::with_capacity(hap_vec.len());
        for (i_hap, hap) in hap_vec.iter().enumerate() {
            if idx_by_id.insert(hap.id.clone(), i_hap).is_some() {
                return Err(ConfigError::DuplicateHaplotype(hap.id.clone()));
            }
        }
        Ok(Self { hap_vec, idx_by_id })
    }

    pub fn len(&self) -> usize {
        self.hap_vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hap_vec.is_empty()
    }

    pub fn get(&self, i_hap: usize) -> &Haplotype {
        &self.hap_vec[i_hap]
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.idx_by_id.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Haplotype> {
        self.hap_vec.iter()
    }
}

/// Linear phenotype-selection law.
///
/// Fitness interpolates between `low` (at pressure 0) and `high` (at pressure 1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessLaw {
    pub low: f64,
    pub high: f64,
}

impl FitnessLaw {
    pub fn fitness(&self, env: f64) -> f64 {
        self.high * env + self.low * (1.0 - env)
    }
}

/// Phenotype label together with its fitness law.
#[derive(Debug, Clone, PartialEq)]
pub struct Phenotype {
    pub label: String,
    pub law: FitnessLaw,
}

impl Phenotype {
    pub fn new(label: impl Into<String>, low: f64, high: f64) -> Self {
        Self {
            label: label.into(),
            law: FitnessLaw { low, high },
        }
    }
}

/// Ordered set of phenotypes known to a simulation.
#[derive(Debug, Clone)]
pub struct PhenotypeSet {
    phe_vec: Vec<Phenotype>,
}

impl PhenotypeSet {
    pub fn new(phe_vec: Vec<Phenotype>) -> Result<Self, ConfigError> {
        if phe_vec.is_empty() {
            return Err(ConfigError::InvalidPhenotypes("no phenotypes".into()));
        }
        for (i_phe, phe) in phe_vec.iter().enumerate() {
            if phe_vec[..i_phe].iter().any(|other| other.label == phe.label) {
                return Err(ConfigError::InvalidPhenotypes(format!(
                    "duplicate label {:?}",
                    phe.label
                )));
            }
            if !phe.law.low.is_finite() || !phe.law.high.is_finite() {
                return Err(ConfigError::InvalidPhenotypes(format!(
                    "fitness law of {:?} is not finite",
                    phe.label
                )));
            }
        }
        Ok(Self { phe_vec })
    }

    pub fn len(&self) -> usize {
        self.phe_vec.len()
    }

    pub fn label(&self, i_phe: usize) -> &str {
        &self.phe_vec[i_phe].label
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.phe_vec.iter().map(|phe| phe.label.as_str())
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.phe_vec.iter().position(|phe| phe.label == label)
    }

    pub fn fitness(&self, i_phe: usize, env: f64) -> f64 {
        self.phe_vec[i_phe].law.fitness(env)
    }
}

impl Default for PhenotypeSet {
    /// Light moths are favored in clean conditions, dark moths under pollution.
    fn default() -> Self {
        Self {
            phe_vec: vec![
                Phenotype::new("light", 1.0, 0.5),
                Phenotype::new("dark", 0.5, 1.0),
            ],
        }
    }
}

/// Naming-convention rule assigning phenotypes from haplotype identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuffixRule {
    /// Identifier suffix to look for.
    pub suffix: String,
    /// Phenotype of haplotypes whose identifier ends with `suffix`.
    pub matched: String,
    /// Phenotype of every other haplotype.
    pub otherwise: String,
}

impl SuffixRule {
    pub fn apply(&self, id: &str) -> &str {
        if id.ends_with(&self.suffix) {
            &self.matched
        } else {
            &self.otherwise
        }
    }
}

/// Mapping from haplotype index to phenotype index.
#[derive(Debug, Clone)]
pub struct PhenotypeMap {
    phe_by_hap: Vec<usize>,
}

impl PhenotypeMap {
    /// Resolve the phenotype of every haplotype in `pool` with `assign`.
    pub fn from_fn<F>(
        pool: &HaplotypePool,
        phenotypes: &PhenotypeSet,
        mut assign: F,
    ) -> Result<Self, ConfigError>
    where
        F: FnMut(&Haplotype) -> Option<String>,
    {
        let mut phe_by_hap = Vec::with_capacity(pool.len());
        for hap in pool.iter() {
            let label =
                assign(hap).ok_or_else(|| ConfigError::UnmappedHaplotype(hap.id.clone()))?;
            let i_phe = phenotypes
                .index_of(&label)
                .ok_or(ConfigError::UnknownPhenotype(label))?;
            phe_by_hap.push(i_phe);
        }
        Ok(Self { phe_by_hap })
    }

    pub fn len(&self) -> usize {
        self.phe_by_hap.len()
    }

    pub fn phenotype_of(&self, i_hap: usize) -> usize {
        self.phe_by_hap[i_hap]
    }
}

/// Run of generations sharing one pressure value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub pressure: f64,
    pub generations: usize,
}

/// Environmental pressure per generation.
///
/// Past the last scheduled generation the final value is held.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pressure_vec: Vec<f64>,
}

impl Schedule {
    pub fn new(pressure_vec: Vec<f64>) -> Result<Self, ConfigError> {
        if pressure_vec.is_empty() {
            return Err(ConfigError::EmptySchedule);
        }
        if let Some(&value) = pressure_vec.iter().find(|p| !(0.0..=1.0).contains(*p)) {
            return Err(ConfigError::ProbabilityOutOfRange {
                name: "environmental pressure",
                value,
            });
        }
        Ok(Self { pressure_vec })
    }

    pub fn from_segments(segments: &[Segment]) -> Result<Self, ConfigError> {
        let pressure_vec = segments
            .iter()
            .flat_map(|seg| std::iter::repeat_n(seg.pressure, seg.generations))
            .collect();
        Self::new(pressure_vec)
    }

    pub fn len(&self) -> usize {
        self.pressure_vec.len()
    }

    pub fn pressure_at(&self, generation: usize) -> f64 {
        let i_last = self.pressure_vec.len() - 1;
        self.pressure_vec[generation.min(i_last)]
    }
}

/// Summary of the agent population at the start of a generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub generation: usize,
    pub population_size: usize,
    /// Shannon index over haplotypes.
    pub diversity: f64,
    /// Number of agents per phenotype, in phenotype set order.
    pub phenotype_counts: Vec<usize>,
    pub pressure: f64,
}

/// Diversity metrics of the allele frequency population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftRecord {
    pub generation: usize,
    pub haplotype_diversity: f64,
    pub shannon_index: f64,
}
