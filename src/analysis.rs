use crate::model::{DriftRecord, Record};
use crate::stats::Accumulator;
use anyhow::{Context, Result};
use rmp_serde::decode;
use serde::de::DeserializeOwned;
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

/// Observable aggregated over the records of replicate runs.
pub trait Obs<T> {
    fn update(&mut self, rec: &T);
    fn end_run(&mut self) {}
    fn report(&self) -> serde_json::Value;
}

type Getter<T> = Box<dyn Fn(&T) -> f64>;

/// Mean and spread of a column at every generation.
pub struct Series<T> {
    name: String,
    get: Getter<T>,
    acc_vec: Vec<Accumulator>,
}

impl<T> Series<T> {
    pub fn new(name: impl Into<String>, get: impl Fn(&T) -> f64 + 'static) -> Self {
        Self {
            name: name.into(),
            get: Box::new(get),
            acc_vec: Vec::new(),
        }
    }
}

impl<T: HasGeneration> Obs<T> for Series<T> {
    fn update(&mut self, rec: &T) {
        let i_gen = rec.generation();
        if self.acc_vec.len() <= i_gen {
            self.acc_vec.resize_with(i_gen + 1, Accumulator::new);
        }
        self.acc_vec[i_gen].add((self.get)(rec));
    }

    fn report(&self) -> serde_json::Value {
        let reports: Vec<_> = self.acc_vec.iter().map(|acc| acc.report()).collect();
        serde_json::json!({ "name": self.name, "series": reports })
    }
}

/// Distribution of a column's last value across runs.
pub struct Terminal<T> {
    name: String,
    get: Getter<T>,
    last: Option<f64>,
    acc: Accumulator,
}

impl<T> Terminal<T> {
    pub fn new(name: impl Into<String>, get: impl Fn(&T) -> f64 + 'static) -> Self {
        Self {
            name: name.into(),
            get: Box::new(get),
            last: None,
            acc: Accumulator::new(),
        }
    }
}

impl<T> Obs<T> for Terminal<T> {
    fn update(&mut self, rec: &T) {
        self.last = Some((self.get)(rec));
    }

    fn end_run(&mut self) {
        if let Some(val) = self.last.take() {
            self.acc.add(val);
        }
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({ "name": self.name, "terminal": self.acc.report() })
    }
}

pub trait HasGeneration {
    fn generation(&self) -> usize;
}

impl HasGeneration for Record {
    fn generation(&self) -> usize {
        self.generation
    }
}

impl HasGeneration for DriftRecord {
    fn generation(&self) -> usize {
        self.generation
    }
}

pub struct Analyzer<T> {
    n_runs: usize,
    obs_ptr_vec: Vec<Box<dyn Obs<T>>>,
}

impl Analyzer<Record> {
    pub fn for_agents(labels: &[String]) -> Self {
        let mut obs_ptr_vec: Vec<Box<dyn Obs<Record>>> = Vec::new();
        obs_ptr_vec.push(Box::new(Series::new("population_size", |rec: &Record| {
            rec.population_size as f64
        })));
        obs_ptr_vec.push(Box::new(Series::new("diversity", |rec: &Record| rec.diversity)));
        for (i_phe, label) in labels.iter().enumerate() {
            obs_ptr_vec.push(Box::new(Series::new(
                format!("freq_{label}"),
                move |rec: &Record| rec.phenotype_counts.get(i_phe).copied().unwrap_or(0) as f64,
            )));
        }
        obs_ptr_vec.push(Box::new(Terminal::new("extinct", |rec: &Record| {
            if rec.population_size == 0 { 1.0 } else { 0.0 }
        })));
        obs_ptr_vec.push(Box::new(Terminal::new("final_diversity", |rec: &Record| {
            rec.diversity
        })));
        Self {
            n_runs: 0,
            obs_ptr_vec,
        }
    }
}

impl Analyzer<DriftRecord> {
    pub fn for_drift() -> Self {
        let mut obs_ptr_vec: Vec<Box<dyn Obs<DriftRecord>>> = Vec::new();
        obs_ptr_vec.push(Box::new(Series::new(
            "haplotype_diversity",
            |rec: &DriftRecord| rec.haplotype_diversity,
        )));
        obs_ptr_vec.push(Box::new(Series::new("shannon_index", |rec: &DriftRecord| {
            rec.shannon_index
        })));
        obs_ptr_vec.push(Box::new(Terminal::new("monomorphic", |rec: &DriftRecord| {
            if rec.haplotype_diversity == 0.0 { 1.0 } else { 0.0 }
        })));
        Self {
            n_runs: 0,
            obs_ptr_vec,
        }
    }
}

impl<T: DeserializeOwned> Analyzer<T> {
    /// Add the records of one run.
    pub fn add_run(&mut self, rec_vec: &[T]) {
        for rec in rec_vec {
            for obs in &mut self.obs_ptr_vec {
                obs.update(rec);
            }
        }
        for obs in &mut self.obs_ptr_vec {
            obs.end_run();
        }
        self.n_runs += 1;
    }

    /// Add the records of one run stored in a MessagePack file.
    pub fn add_file<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);
        let rec_vec: Vec<T> = decode::from_read(&mut reader).context("failed to read records")?;
        self.add_run(&rec_vec);
        Ok(())
    }

    pub fn n_runs(&self) -> usize {
        self.n_runs
    }

    pub fn report(&self) -> serde_json::Value {
        let reports: Vec<_> = self.obs_ptr_vec.iter().map(|obs| obs.report()).collect();
        serde_json::json!({ "n_runs": self.n_runs, "observables": reports })
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &self.report()).context("failed to write results")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drift_run(values: &[f64]) -> Vec<DriftRecord> {
        values
            .iter()
            .enumerate()
            .map(|(generation, &hd)| DriftRecord {
                generation,
                haplotype_diversity: hd,
                shannon_index: 2.0 * hd,
            })
            .collect()
    }

    #[test]
    fn series_average_replicates_per_generation() {
        let mut analyzer = Analyzer::for_drift();
        analyzer.add_run(&drift_run(&[0.5, 0.4, 0.0]));
        analyzer.add_run(&drift_run(&[0.7, 0.6, 0.2]));

        let report = analyzer.report();
        assert_eq!(report["n_runs"], 2);

        let series = &report["observables"][0]["series"];
        assert_eq!(report["observables"][0]["name"], "haplotype_diversity");
        assert_eq!(series.as_array().unwrap().len(), 3);
        assert!((series[0]["mean"].as_f64().unwrap() - 0.6).abs() < 1e-12);
        assert!((series[2]["mean"].as_f64().unwrap() - 0.1).abs() < 1e-12);

        let monomorphic = &report["observables"][2]["terminal"];
        assert_eq!(monomorphic["n_vals"], 2);
        assert!((monomorphic["mean"].as_f64().unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn agent_columns_follow_phenotypes() {
        let labels = vec!["light".to_string(), "dark".to_string()];
        let mut analyzer = Analyzer::for_agents(&labels);
        analyzer.add_run(&[
            Record {
                generation: 0,
                population_size: 4,
                diversity: 0.5,
                phenotype_counts: vec![3, 1],
                pressure: 0.2,
            },
            Record {
                generation: 1,
                population_size: 0,
                diversity: 0.0,
                phenotype_counts: vec![0, 0],
                pressure: 0.2,
            },
        ]);

        let report = analyzer.report();
        let names: Vec<_> = report["observables"]
            .as_array()
            .unwrap()
            .iter()
            .map(|obs| obs["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "population_size",
                "diversity",
                "freq_light",
                "freq_dark",
                "extinct",
                "final_diversity"
            ]
        );
        assert_eq!(report["observables"][2]["series"][0]["mean"], 3.0);
        assert_eq!(report["observables"][4]["terminal"]["mean"], 1.0);
    }
}
