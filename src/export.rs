//! Tabular export of simulation records.

use crate::model::{DriftRecord, PhenotypeSet, Record};
use anyhow::{Context, Result};
use csv::Writer;
use rmp_serde::encode;
use serde::Serialize;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// Write agent population records as CSV with one `freq_<label>` column per phenotype.
pub fn write_agents_csv<W: Write>(
    writer: W,
    phenotypes: &PhenotypeSet,
    rec_vec: &[Record],
) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);

    let mut header = vec![
        "generation".to_string(),
        "population_size".to_string(),
        "diversity".to_string(),
    ];
    header.extend(phenotypes.labels().map(|label| format!("freq_{label}")));
    header.push("pressure".to_string());
    wtr.write_record(&header).context("failed to write header")?;

    for rec in rec_vec {
        let mut row = vec![
            rec.generation.to_string(),
            rec.population_size.to_string(),
            rec.diversity.to_string(),
        ];
        row.extend(rec.phenotype_counts.iter().map(|count| count.to_string()));
        row.push(rec.pressure.to_string());
        wtr.write_record(&row)
            .with_context(|| format!("failed to write generation {}", rec.generation))?;
    }

    wtr.flush().context("failed to flush writer stream")?;
    Ok(())
}

/// Write allele frequency records as CSV.
pub fn write_drift_csv<W: Write>(writer: W, rec_vec: &[DriftRecord]) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    for rec in rec_vec {
        wtr.serialize(rec)
            .with_context(|| format!("failed to write generation {}", rec.generation))?;
    }
    wtr.flush().context("failed to flush writer stream")?;
    Ok(())
}

/// Serialize records to a MessagePack file.
pub fn save_records<T: Serialize, P: AsRef<Path>>(file: P, rec_vec: &[T]) -> Result<()> {
    let file = file.as_ref();
    let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    let mut writer = BufWriter::new(file);
    encode::write(&mut writer, &rec_vec).context("failed to serialize records")?;
    writer.flush().context("failed to flush writer stream")?;
    Ok(())
}

pub fn create_file<P: AsRef<Path>>(file: P) -> Result<BufWriter<File>> {
    let file = file.as_ref();
    let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    Ok(BufWriter::new(file))
}
