use std::fs;
use std::path::PathBuf;

use crate::csv_reader::{read_table, read_training_examples, CsvError};

#[test]
fn test_read_table_locates_columns() {
    let bytes = fixture_bytes("statement.csv");
    let (columns, rows) = read_table(&bytes, "statement.csv").unwrap();

    assert_eq!(columns.date, 0);
    assert_eq!(columns.description, 1);
    assert_eq!(columns.amount, 2);
    assert_eq!(columns.category, Some(3));
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].position, 1);
    assert_eq!(rows[2].position, 3);
}

#[test]
fn test_missing_amount_column_is_malformed() {
    let bytes = fixture_bytes("no_amount.csv");
    match read_table(&bytes, "no_amount.csv") {
        Err(CsvError::MalformedCsv(reason)) => assert!(reason.contains("amount")),
        Ok(_) => panic!("expected a malformed csv error"),
    }
}

#[test]
fn test_header_names_trimmed_and_case_insensitive() {
    let bytes = b"  DATE , Description ,AMOUNT\n2024-01-02,COFFEE,-4.50\n";
    let (columns, rows) = read_table(bytes, "inline").unwrap();

    assert_eq!(columns.date, 0);
    assert_eq!(columns.category, None);
    assert_eq!(rows.len(), 1);
}

#[test]
fn test_read_training_examples_skips_sentinel_rows() {
    let bytes = fixture_bytes("training.csv");
    let examples = read_training_examples(&bytes).unwrap();

    assert_eq!(examples.len(), 3);
    assert_eq!(examples[0].description, "Starbucks Coffee");
    assert_eq!(examples[0].category, "Dining");
}

/// Return the content of a file within the test data directory
pub(crate) fn fixture_bytes(filename: &str) -> Vec<u8> {
    let mut dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    dir.push("fixture");
    dir.push(filename);
    fs::read(dir).unwrap()
}
