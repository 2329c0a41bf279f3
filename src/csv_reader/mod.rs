use std::fmt;

use csv::StringRecord;
use log::{debug, info};

use crate::categoriser::TrainingExample;
use crate::transaction::is_sentinel_category;

#[cfg(test)]
mod tests;

/// Structural problems with an uploaded file. These abort the whole batch,
/// unlike row-level reject reasons, which are reported and skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CsvError {
    MalformedCsv(String),
}

impl fmt::Display for CsvError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CsvError::MalformedCsv(s) => write!(f, "malformed csv: {}", s),
        }
    }
}

impl std::error::Error for CsvError {}

/// Where the transaction schema columns live within an uploaded file.
/// The category column is optional on input.
pub(crate) struct ColumnMap {
    pub(crate) date: usize,
    pub(crate) description: usize,
    pub(crate) amount: usize,
    pub(crate) category: Option<usize>,
}

/// A raw data row: its 1-based position within the upload and the
/// unparsed column values.
pub(crate) struct RawRow {
    pub(crate) position: usize,
    pub(crate) record: StringRecord,
}

/// Parse uploaded bytes as a delimited table with a header row and locate
/// the schema columns. Header names are matched case-insensitively after
/// trimming surrounding whitespace.
pub(crate) fn read_table(bytes: &[u8], filename: &str) -> Result<(ColumnMap, Vec<RawRow>), CsvError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
    let headers = reader
        .headers()
        .map_err(|e| CsvError::MalformedCsv(e.to_string()))?
        .clone();
    let columns = map_columns(&headers)?;
    info!("Reading {} with header row {:?}", filename, headers);

    let mut rows = vec![];
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| CsvError::MalformedCsv(e.to_string()))?;
        rows.push(RawRow { position: i + 1, record });
    }

    Ok((columns, rows))
}

fn map_columns(headers: &StringRecord) -> Result<ColumnMap, CsvError> {
    let date = locate_column(headers, "date");
    let description = locate_column(headers, "description");
    let amount = locate_column(headers, "amount");
    let category = locate_column(headers, "category");

    let date = date.ok_or_else(|| missing_column("date"))?;
    let description = description.ok_or_else(|| missing_column("description"))?;
    let amount = amount.ok_or_else(|| missing_column("amount"))?;

    Ok(ColumnMap { date, description, amount, category })
}

fn locate_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|header| header.trim().eq_ignore_ascii_case(name))
}

fn missing_column(name: &str) -> CsvError {
    CsvError::MalformedCsv(format!("unable to locate '{}' column", name))
}

/// Read the curated training set: a CSV with 'description' and 'category'
/// columns. Rows with a blank description or a sentinel category cannot
/// teach the classifier anything and are skipped.
pub(crate) fn read_training_examples(bytes: &[u8]) -> Result<Vec<TrainingExample>, CsvError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
    let headers = reader
        .headers()
        .map_err(|e| CsvError::MalformedCsv(e.to_string()))?
        .clone();
    let description = locate_column(&headers, "description").ok_or_else(|| missing_column("description"))?;
    let category = locate_column(&headers, "category").ok_or_else(|| missing_column("category"))?;

    let mut examples = vec![];
    let mut skipped = 0usize;
    for record in reader.records() {
        let record = record.map_err(|e| CsvError::MalformedCsv(e.to_string()))?;
        let text = record.get(description).map(str::trim).unwrap_or("");
        let label = record.get(category).map(str::trim).unwrap_or("");
        if text.is_empty() || is_sentinel_category(label) {
            skipped += 1;
            continue;
        }
        examples.push(TrainingExample {
            description: text.to_string(),
            category: label.to_string(),
        });
    }

    if skipped > 0 {
        debug!("Skipped {} unusable training rows", skipped);
    }
    Ok(examples)
}
