//! Error types for engine construction.
//!
//! Every engine validates its inputs once, before any generation runs,
//! and reports problems through [`ConfigError`]. Nothing after construction
//! is fallible.

/// Invalid or missing engine input.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The haplotype pool has no entries.
    #[error("haplotype pool is empty")]
    EmptyPool,

    /// The same haplotype identifier appears twice in the pool.
    #[error("duplicate haplotype {0:?}")]
    DuplicateHaplotype(String),

    /// A sampling weight is negative or not finite.
    #[error("haplotype {id:?} has invalid weight {weight}")]
    InvalidWeight {
        /// Offending haplotype.
        id: String,
        /// Offending weight.
        weight: f64,
    },

    /// All sampling weights are zero.
    #[error("at least one haplotype must have a positive weight")]
    NoPositiveWeight,

    /// The initial population size is zero.
    #[error("initial population size must be positive")]
    EmptyPopulation,

    /// The initial population does not fit under the cap.
    #[error("initial population size {n_agents} exceeds the cap {max_agents}")]
    PopulationAboveCap {
        /// Requested initial population.
        n_agents: usize,
        /// Configured cap.
        max_agents: usize,
    },

    /// The environment schedule has no values.
    #[error("environment schedule is empty")]
    EmptySchedule,

    /// A probability (mutation rate or pressure) is outside [0, 1].
    #[error("{name} must be in [0, 1], but is {value}")]
    ProbabilityOutOfRange {
        /// Name of the offending parameter.
        name: &'static str,
        /// Offending value.
        value: f64,
    },

    /// A phenotype label has no fitness law.
    #[error("unknown phenotype {0:?}")]
    UnknownPhenotype(String),

    /// A haplotype has no phenotype assignment.
    #[error("haplotype {0:?} has no phenotype")]
    UnmappedHaplotype(String),

    /// The phenotype map does not cover exactly the haplotypes of the pool.
    #[error("phenotype map covers {mapped} haplotypes, but the pool has {n_haps}")]
    MapSizeMismatch {
        /// Number of haplotypes in the map.
        mapped: usize,
        /// Number of haplotypes in the pool.
        n_haps: usize,
    },

    /// A haplotype maps to a phenotype index outside the phenotype set.
    #[error("haplotype {id:?} maps to phenotype {i_phe}, but only {n_phes} are known")]
    PhenotypeOutOfRange {
        /// Offending haplotype.
        id: String,
        /// Mapped phenotype index.
        i_phe: usize,
        /// Number of phenotypes in the set.
        n_phes: usize,
    },

    /// The death threshold is negative or not finite.
    #[error("death threshold must be finite and non-negative, but is {0}")]
    InvalidThreshold(f64),

    /// The phenotype set has no entries or repeats a label.
    #[error("invalid phenotype set: {0}")]
    InvalidPhenotypes(String),
}
