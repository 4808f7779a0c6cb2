use serde::{Deserialize, Serialize};

/// Shannon index `-sum(p ln p)` of a population given its class counts.
///
/// Empty classes contribute nothing and an empty population has index 0.
pub fn shannon_index(counts: &[usize]) -> f64 {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    counts
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.ln()
        })
        .sum()
}

/// Unbiased haplotype diversity `N/(N-1) (1 - sum(p^2))`, zero when `N <= 1`.
pub fn haplotype_diversity(counts: &[usize]) -> f64 {
    let total: usize = counts.iter().sum();
    if total <= 1 {
        return 0.0;
    }
    let total = total as f64;
    let sum_p2: f64 = counts
        .iter()
        .map(|&count| (count as f64 / total).powi(2))
        .sum();
    total / (total - 1.0) * (1.0 - sum_p2)
}

/// Running mean and variance (Welford).
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccumulatorReport {
    pub n_vals: usize,
    pub mean: f64,
    pub std_dev: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;

        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;

        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;
    }

    pub fn report(&self) -> AccumulatorReport {
        AccumulatorReport {
            n_vals: self.n_vals,
            mean: if self.n_vals > 0 { self.mean } else { f64::NAN },
            std_dev: if self.n_vals > 1 {
                (self.diff_2_sum / (self.n_vals as f64 - 1.0)).sqrt()
            } else {
                f64::NAN
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shannon_index_boundaries() {
        assert_eq!(shannon_index(&[]), 0.0);
        assert_eq!(shannon_index(&[0, 0]), 0.0);
        assert_eq!(shannon_index(&[10, 0]), 0.0);
        assert!((shannon_index(&[1, 1]) - 2f64.ln()).abs() < 1e-12);
        assert!((shannon_index(&[3, 1]) - 0.5623351446188083).abs() < 1e-12);
    }

    #[test]
    fn haplotype_diversity_boundaries() {
        assert_eq!(haplotype_diversity(&[]), 0.0);
        assert_eq!(haplotype_diversity(&[1, 0]), 0.0);
        assert_eq!(haplotype_diversity(&[5]), 0.0);
        assert!((haplotype_diversity(&[3, 1]) - 0.5).abs() < 1e-12);
        assert!((haplotype_diversity(&[1, 1]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn accumulator_mean_and_std_dev() {
        let mut acc = Accumulator::new();
        assert!(acc.report().mean.is_nan());

        for val in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            acc.add(val);
        }
        let report = acc.report();
        assert_eq!(report.n_vals, 8);
        assert!((report.mean - 5.0).abs() < 1e-12);
        assert!((report.std_dev - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }
}
