use super::chart::ChartSeries;
use super::table::SummaryTable;
use crate::codec::{AttributeSchema, PatientRecord, RecordParseError};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableIoError {
    #[error("TSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Column '{0}' in the patients file is not a model attribute.")]
    UnknownColumn(String),
    #[error("Column '{0}' appears more than once in the patients file.")]
    DuplicateColumn(String),
    #[error("Invalid patient value: {0}")]
    Record(#[from] RecordParseError),
    #[error("The patients file {0} contains no patients.")]
    NoPatients(String),
}

/// Reads one patient per row from a tab-separated file whose header names
/// attributes. Columns that are absent, and cells that are empty, keep the
/// attribute's default selection.
pub fn read_patients(
    path: &Path,
    schema: &AttributeSchema,
) -> Result<Vec<PatientRecord>, TableIoError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    for (idx, name) in headers.iter().enumerate() {
        if schema.get(name).is_none() {
            return Err(TableIoError::UnknownColumn(name.to_string()));
        }
        if headers.iter().take(idx).any(|seen| seen == name) {
            return Err(TableIoError::DuplicateColumn(name.to_string()));
        }
    }

    let mut patients = Vec::new();
    for row in reader.records() {
        let row = row?;
        let mut record = PatientRecord::defaults(schema);
        for (name, cell) in headers.iter().zip(row.iter()) {
            if cell.is_empty() {
                continue;
            }
            record.set_raw(schema, name, cell)?;
        }
        patients.push(record);
    }

    if patients.is_empty() {
        return Err(TableIoError::NoPatients(path.display().to_string()));
    }
    log::debug!("Read {} patients from {}", patients.len(), path.display());
    Ok(patients)
}

/// Writes the summary table as TSV, header first.
pub fn write_summary_tsv(path: &Path, table: &SummaryTable) -> Result<(), TableIoError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)?;
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row.cells())?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the chart data in long form: one `Patients, Time, Survival` line
/// per curve point.
pub fn write_curves_tsv(path: &Path, series: &[ChartSeries]) -> Result<(), TableIoError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)?;
    writer.write_record(["Patients", "Time", "Survival"])?;

    let mut ryu_buffer = ryu::Buffer::new();
    for line in series {
        let patient = line.patient.to_string();
        for point in &line.points {
            let time = point.time_index.to_string();
            let survival = ryu_buffer.format(point.probability);
            writer.write_record([patient.as_str(), time.as_str(), survival])?;
        }
    }
    writer.flush()?;
    Ok(())
}
