//! Neutral allele frequency model.
//!
//! Individuals are bare haplotype labels. Every generation is resampled from
//! the previous one (Wright-Fisher) with mutation towards any known label and
//! no selection, so the population size never changes.

use crate::error::ConfigError;
use crate::model::{DriftRecord, HaplotypePool};
use crate::stats::{haplotype_diversity, shannon_index};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::{Bernoulli, Uniform};

pub struct DriftEngine<R: Rng = ChaCha12Rng> {
    labels: Vec<String>,
    hap_vec: Vec<usize>,
    generation: usize,
    mut_dist: Bernoulli,
    label_dist: Uniform<usize>,
    rng: R,
}

impl<R: Rng> DriftEngine<R> {
    /// Expand the pool counts into a population of labels.
    pub fn new(pool: &HaplotypePool, mutation_rate: f64, rng: R) -> Result<Self, ConfigError> {
        let mut_dist =
            Bernoulli::new(mutation_rate).map_err(|_| ConfigError::ProbabilityOutOfRange {
                name: "mutation rate",
                value: mutation_rate,
            })?;
        let label_dist = Uniform::new(0, pool.len()).map_err(|_| ConfigError::EmptyPool)?;

        let labels = pool.iter().map(|hap| hap.id.clone()).collect();
        let hap_vec = pool
            .iter()
            .enumerate()
            .flat_map(|(i_hap, hap)| std::iter::repeat_n(i_hap, hap.count as usize))
            .collect();

        Ok(Self {
            labels,
            hap_vec,
            generation: 0,
            mut_dist,
            label_dist,
            rng,
        })
    }

    /// Replace the population with a resampled one of the same size.
    pub fn advance(&mut self) {
        let n_ind = self.hap_vec.len();
        let mut next_hap_vec = Vec::with_capacity(n_ind);
        for _ in 0..n_ind {
            let parent = self.hap_vec[self.rng.random_range(0..n_ind)];
            let hap = if self.mut_dist.sample(&mut self.rng) {
                self.label_dist.sample(&mut self.rng)
            } else {
                parent
            };
            next_hap_vec.push(hap);
        }
        self.hap_vec = next_hap_vec;
        self.generation += 1;
    }

    /// Diversity metrics of the current population.
    pub fn metrics(&self) -> DriftRecord {
        let counts = self.counts();
        DriftRecord {
            generation: self.generation,
            haplotype_diversity: haplotype_diversity(&counts),
            shannon_index: shannon_index(&counts),
        }
    }

    /// Lazily record and advance `generations` times.
    ///
    /// Each item holds the metrics measured before that generation's resampling.
    pub fn run(&mut self, generations: usize) -> Generations<'_, R> {
        Generations {
            engine: self,
            remaining: generations,
        }
    }

    /// Number of individuals per label, in pool order.
    pub fn counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.labels.len()];
        for &hap in &self.hap_vec {
            counts[hap] += 1;
        }
        counts
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.hap_vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hap_vec.is_empty()
    }

    pub fn generation(&self) -> usize {
        self.generation
    }
}

/// Iterator returned by [`DriftEngine::run`].
pub struct Generations<'a, R: Rng> {
    engine: &'a mut DriftEngine<R>,
    remaining: usize,
}

impl<R: Rng> Iterator for Generations<'_, R> {
    type Item = DriftRecord;

    fn next(&mut self) -> Option<DriftRecord> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let record = self.engine.metrics();
        self.engine.advance();
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<R: Rng> ExactSizeIterator for Generations<'_, R> {}
