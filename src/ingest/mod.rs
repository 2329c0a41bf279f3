use log::{info, warn};
use serde::Serialize;

use crate::categoriser::{CategoriserError, ModelHandle};
use crate::csv_reader::{self, CsvError};
use crate::normaliser::{self, RejectReason, RejectedRow};
use crate::store::{MergeOutcome, TransactionStore};

/// Outcome of one upload. Row-level problems are listed, never raised;
/// `accepted` counts every row that survived normalisation and was merged,
/// with the new/updated/duplicate breakdown alongside.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct IngestReport {
    pub(crate) accepted: usize,
    pub(crate) inserted: usize,
    pub(crate) updated: usize,
    pub(crate) duplicates: usize,
    pub(crate) categorised: usize,
    pub(crate) rejects: Vec<RejectedRow>,
}

/// Run one upload end-to-end: parse, normalise, best-effort categorise,
/// merge. Fails only when the bytes cannot be read as a table at all; in
/// that case nothing is merged.
pub(crate) fn run(
    bytes: &[u8],
    filename: &str,
    models: &ModelHandle,
    store: &mut TransactionStore,
) -> Result<IngestReport, CsvError> {
    let (columns, rows) = csv_reader::read_table(bytes, filename)?;
    let normalised = normaliser::normalise(&columns, &rows);

    let mut report = IngestReport { rejects: normalised.rejects, ..Default::default() };

    // The store only holds records with a real date; rows flagged with an
    // unparsable date are reported here rather than silently dropped.
    let mut candidates = vec![];
    for candidate in normalised.candidates {
        if candidate.date.is_some() {
            candidates.push(candidate);
        } else {
            report.rejects.push(RejectedRow { position: candidate.position, reason: RejectReason::InvalidDate });
        }
    }

    // Categorisation is best effort: without a trained model the upload
    // still lands, with categories left unassigned.
    let pending: Vec<usize> = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| c.needs_categorisation)
        .map(|(i, _)| i)
        .collect();
    if !pending.is_empty() {
        let descriptions: Vec<&str> = pending.iter().map(|&i| candidates[i].description.as_str()).collect();
        match models.predict_batch(&descriptions) {
            Ok(predictions) => {
                for (&i, category) in pending.iter().zip(predictions) {
                    candidates[i].category = category;
                    report.categorised += 1;
                }
            }
            Err(CategoriserError::ModelNotFound) => {
                info!("No trained model; leaving {} rows uncategorised", pending.len());
            }
            Err(e) => {
                warn!("Categorisation failed, rows left uncategorised: {}", e);
            }
        }
    }

    for candidate in &candidates {
        if let Some(date) = candidate.date {
            match store.merge(date, &candidate.description, candidate.amount, &candidate.category) {
                MergeOutcome::Inserted => report.inserted += 1,
                MergeOutcome::Updated => report.updated += 1,
                MergeOutcome::Duplicate => report.duplicates += 1,
            }
            report.accepted += 1;
        }
    }

    report.rejects.sort_by_key(|r| r.position);
    info!(
        "Ingested {}: {} accepted ({} new, {} updated, {} duplicates), {} categorised, {} rejected",
        filename,
        report.accepted,
        report.inserted,
        report.updated,
        report.duplicates,
        report.categorised,
        report.rejects.len()
    );
    Ok(report)
}
