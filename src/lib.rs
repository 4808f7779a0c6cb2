//! Agent-based simulation of moth haplotype diversity under environmental
//! selection pressure, together with a neutral allele frequency model.

pub mod agent;
pub mod analysis;
pub mod config;
pub mod drift;
pub mod engine;
pub mod error;
pub mod export;
pub mod manager;
pub mod model;
pub mod stats;
