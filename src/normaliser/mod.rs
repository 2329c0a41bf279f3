use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::Serialize;

use crate::csv_reader::{ColumnMap, RawRow};
use crate::money::{self, Cents};
use crate::transaction::{is_sentinel_category, UNCATEGORISED};

/// A normalised row, not yet merged into the store. An unparsable date is
/// carried as `None` rather than dropping the row here; the ingestion
/// pipeline decides what happens to it.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub(crate) position: usize,
    pub(crate) date: Option<NaiveDate>,
    pub(crate) description: String,
    pub(crate) amount: Cents,
    pub(crate) category: String,
    pub(crate) needs_categorisation: bool,
}

/// Why a row failed normalisation. Row-level: the batch continues.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RejectReason {
    InvalidDate,
    InvalidAmount,
    MissingField,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RejectReason::InvalidDate => write!(f, "invalid date"),
            RejectReason::InvalidAmount => write!(f, "invalid amount"),
            RejectReason::MissingField => write!(f, "missing field"),
        }
    }
}

/// A rejected row: its 1-based position within the upload and the reason.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct RejectedRow {
    pub(crate) position: usize,
    pub(crate) reason: RejectReason,
}

/// Output of normalising one upload: candidates carry on through the
/// pipeline, rejects are reported back to the caller.
pub(crate) struct Normalised {
    pub(crate) candidates: Vec<Candidate>,
    pub(crate) rejects: Vec<RejectedRow>,
}

/// Convert located raw rows into typed record candidates. Good rows
/// proceed, bad rows are collected; one bad row never fails the batch.
pub(crate) fn normalise(columns: &ColumnMap, rows: &[RawRow]) -> Normalised {
    let mut candidates = vec![];
    let mut rejects = vec![];

    for row in rows {
        match normalise_row(columns, row) {
            Ok(candidate) => candidates.push(candidate),
            Err(reason) => {
                debug!("Rejecting row {}: {}", row.position, reason);
                rejects.push(RejectedRow { position: row.position, reason });
            }
        }
    }

    Normalised { candidates, rejects }
}

fn normalise_row(columns: &ColumnMap, row: &RawRow) -> Result<Candidate, RejectReason> {
    let date_raw = row.record.get(columns.date).map(str::trim).unwrap_or("");
    let description = row.record.get(columns.description).map(str::trim).unwrap_or("");
    let amount_raw = row.record.get(columns.amount).map(str::trim).unwrap_or("");

    if description.is_empty() {
        return Err(RejectReason::MissingField);
    }

    let amount = money::parse_cents(amount_raw).ok_or(RejectReason::InvalidAmount)?;
    let date = parse_date(date_raw);

    let category = match columns.category {
        Some(i) => row.record.get(i).map(str::trim).unwrap_or(""),
        None => "",
    };
    let (category, needs_categorisation) = if is_sentinel_category(category) {
        (UNCATEGORISED.to_string(), true)
    } else {
        (category.to_string(), false)
    };

    Ok(Candidate {
        position: row.position,
        date,
        description: description.to_string(),
        amount,
        category,
        needs_categorisation,
    })
}

lazy_static! {
    static ref YMD: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
    static ref ISO_DATETIME: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}").unwrap();
    static ref DMY_SLASH: Regex = Regex::new(r"^\d{2}/\d{2}/\d{4}$").unwrap();
    static ref DAY_MONTH_NAME: Regex = Regex::new(r"^\d{1,2} [A-Za-z]{3} \d{4}$").unwrap();
}

/// Parse the date formats seen in bank exports. Returns None for anything
/// unrecognised.
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    if YMD.is_match(raw) {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
    } else if ISO_DATETIME.is_match(raw) {
        NaiveDateTime::parse_from_str(&raw[0..19], "%Y-%m-%dT%H:%M:%S").ok().map(|dt| dt.date())
    } else if DMY_SLASH.is_match(raw) {
        NaiveDate::parse_from_str(raw, "%d/%m/%Y").ok()
    } else if DAY_MONTH_NAME.is_match(raw) {
        NaiveDate::parse_from_str(raw, "%d %b %Y").ok()
    } else {
        None
    }
}
