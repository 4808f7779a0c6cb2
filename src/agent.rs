//! Individual moths of the agent population.

use crate::model::{HaplotypePool, PhenotypeMap, PhenotypeSet};
use rand::prelude::*;
use rand_distr::{Bernoulli, Uniform};

/// Fitness of an agent that has not been evaluated yet.
pub const NEUTRAL_FITNESS: f64 = 1.0;

/// Everything an agent reads from its population during a step.
pub struct StepContext<'a> {
    pub pool: &'a HaplotypePool,
    pub phenotypes: &'a PhenotypeSet,
    pub phenotype_map: &'a PhenotypeMap,
    /// Current environmental pressure.
    pub env: f64,
    /// Per-step mutation event.
    pub mut_dist: Bernoulli,
    /// Mutation target over pool indices.
    pub hap_dist: Uniform<usize>,
    pub death_threshold: f64,
}

/// What the population must do with an agent after its step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Died,
    Survived,
    Reproduced,
}

/// Agent of the simulation.
///
/// Each agent carries a haplotype (`hap`) and the phenotype (`phe`) it maps to,
/// both as indices into the pool and phenotype set of its population.
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    id: u64,
    hap: usize,
    phe: usize,
    fitness: f64,
}

impl Agent {
    pub fn new(id: u64, hap: usize, phe: usize) -> Self {
        Self {
            id,
            hap,
            phe,
            fitness: NEUTRAL_FITNESS,
        }
    }

    /// Create an offspring sharing this agent's haplotype and phenotype.
    pub fn offspring(&self, id: u64) -> Self {
        Self::new(id, self.hap, self.phe)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn hap(&self) -> usize {
        self.hap
    }

    pub fn phe(&self) -> usize {
        self.phe
    }

    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    /// Perform one generation of the agent: selection, mutation, death and reproduction.
    ///
    /// The caller is responsible for removing dead agents and for inserting
    /// offspring while respecting the population cap.
    pub fn step<R: Rng>(&mut self, ctx: &StepContext, rng: &mut R) -> StepOutcome {
        self.update_fitness(ctx);

        if ctx.mut_dist.sample(rng) {
            let hap = ctx.hap_dist.sample(rng);
            self.hap = hap;
            self.phe = ctx.phenotype_map.phenotype_of(hap);
            // The new phenotype may change the fitness.
            self.update_fitness(ctx);
        }

        if self.fitness < ctx.death_threshold {
            return StepOutcome::Died;
        }

        let prob_rep = (self.fitness * ctx.env).clamp(0.0, 1.0);
        if rng.random_bool(prob_rep) {
            StepOutcome::Reproduced
        } else {
            StepOutcome::Survived
        }
    }

    fn update_fitness(&mut self, ctx: &StepContext) {
        self.fitness = ctx.phenotypes.fitness(self.phe, ctx.env);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Haplotype, Phenotype};
    use rand_chacha::ChaCha12Rng;

    struct Fixture {
        pool: HaplotypePool,
        phenotypes: PhenotypeSet,
        phenotype_map: PhenotypeMap,
    }

    impl Fixture {
        fn new(phenotypes: PhenotypeSet) -> Self {
            let pool = HaplotypePool::new(vec![
                Haplotype::new("HAP_001", 1.0, 1),
                Haplotype::new("HAP_002", 1.0, 1),
                Haplotype::new("HAP_003", 1.0, 1),
            ])
            .unwrap();
            let phenotype_map = PhenotypeMap::from_fn(&pool, &phenotypes, |hap| {
                let label = if hap.id.ends_with("002") {
                    phenotypes.label(phenotypes.len() - 1)
                } else {
                    phenotypes.label(0)
                };
                Some(label.to_string())
            })
            .unwrap();
            Self {
                pool,
                phenotypes,
                phenotype_map,
            }
        }

        fn ctx(&self, env: f64, mutation_rate: f64, death_threshold: f64) -> StepContext<'_> {
            StepContext {
                pool: &self.pool,
                phenotypes: &self.phenotypes,
                phenotype_map: &self.phenotype_map,
                env,
                mut_dist: Bernoulli::new(mutation_rate).unwrap(),
                hap_dist: Uniform::new(0, self.pool.len()).unwrap(),
                death_threshold,
            }
        }
    }

    #[test]
    fn phenotype_follows_haplotype_after_mutation() {
        let fix = Fixture::new(PhenotypeSet::default());
        let ctx = fix.ctx(0.5, 1.0, 0.1);
        let mut rng = ChaCha12Rng::seed_from_u64(7);

        let mut agt = Agent::new(1, 0, fix.phenotype_map.phenotype_of(0));
        for _ in 0..200 {
            agt.step(&ctx, &mut rng);
            assert_eq!(agt.phe(), fix.phenotype_map.phenotype_of(agt.hap()));
            assert!((agt.fitness() - 0.75).abs() < 1e-12);
        }
    }

    #[test]
    fn fitness_tracks_pressure() {
        let fix = Fixture::new(PhenotypeSet::default());
        let dark = fix.phenotypes.index_of("dark").unwrap();
        let mut rng = ChaCha12Rng::seed_from_u64(1);

        let mut agt = Agent::new(1, 1, dark);
        assert_eq!(agt.fitness(), NEUTRAL_FITNESS);

        agt.step(&fix.ctx(0.0, 0.0, 0.1), &mut rng);
        assert!((agt.fitness() - 0.5).abs() < 1e-12);

        agt.step(&fix.ctx(1.0, 0.0, 0.1), &mut rng);
        assert!((agt.fitness() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn unfit_agent_dies_without_reproducing() {
        let phenotypes = PhenotypeSet::new(vec![
            Phenotype::new("pale", 0.05, 0.05),
            Phenotype::new("sooty", 0.05, 0.05),
        ])
        .unwrap();
        let fix = Fixture::new(phenotypes);
        let ctx = fix.ctx(1.0, 0.0, 0.1);
        let mut rng = ChaCha12Rng::seed_from_u64(3);

        let mut agt = Agent::new(1, 0, 0);
        for _ in 0..50 {
            assert_eq!(agt.step(&ctx, &mut rng), StepOutcome::Died);
        }
    }

    #[test]
    fn full_fitness_at_full_pressure_always_reproduces() {
        let fix = Fixture::new(PhenotypeSet::default());
        let dark = fix.phenotypes.index_of("dark").unwrap();
        let ctx = fix.ctx(1.0, 0.0, 0.1);
        let mut rng = ChaCha12Rng::seed_from_u64(5);

        let mut agt = Agent::new(1, 1, dark);
        for _ in 0..50 {
            assert_eq!(agt.step(&ctx, &mut rng), StepOutcome::Reproduced);
        }

        let child = agt.offspring(2);
        assert_eq!(child.id(), 2);
        assert_eq!(child.hap(), agt.hap());
        assert_eq!(child.phe(), agt.phe());
        assert_eq!(child.fitness(), NEUTRAL_FITNESS);
    }

    #[test]
    fn zero_pressure_never_reproduces() {
        let fix = Fixture::new(PhenotypeSet::default());
        let ctx = fix.ctx(0.0, 0.0, 0.1);
        let mut rng = ChaCha12Rng::seed_from_u64(11);

        let mut agt = Agent::new(1, 0, fix.phenotype_map.phenotype_of(0));
        for _ in 0..50 {
            assert_eq!(agt.step(&ctx, &mut rng), StepOutcome::Survived);
        }
    }
}
