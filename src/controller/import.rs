use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::Context;
use comfy_table::{Table, TableComponent};
use log::{info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::controller::Controller;
use crate::ingest::IngestReport;

/// Import one statement file, or scan a directory recursively and import
/// every statement file not seen before. A file that fails to ingest is
/// reported and skipped; the rest of the scan continues.
pub(crate) fn execute_import(controller: &Controller, path: &Path) -> anyhow::Result<()> {
    if path.is_file() {
        let file_id = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        return import_file(controller, path, &file_id);
    }

    let files = scan_files(path)?;
    let new_files = controller.unseen_files(&files);
    if new_files.is_empty() {
        info!("No new statement files detected.");
        return Ok(());
    }

    for file_id in &new_files {
        let full_path = path.join(file_id);
        if let Err(e) = import_file(controller, &full_path, file_id) {
            warn!("{}: {}", file_id, e);
        }
    }

    Ok(())
}

fn import_file(controller: &Controller, path: &Path, file_id: &str) -> anyhow::Result<()> {
    info!("Importing transactions from {}", path.display());
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;

    let report = controller.ingest(&bytes, file_id)?;
    controller.record_imported_file(file_id, md5::compute(&bytes))?;
    print_report(file_id, &report);
    Ok(())
}

fn print_report(file_id: &str, report: &IngestReport) {
    let mut table = Table::new();
    table.set_header(vec!["File", "Accepted", "New", "Updated", "Duplicates", "Categorised", "Rejected"]);
    table.remove_style(TableComponent::HorizontalLines);
    table.remove_style(TableComponent::MiddleIntersections);
    table.remove_style(TableComponent::LeftBorderIntersections);
    table.remove_style(TableComponent::RightBorderIntersections);
    table.add_row(vec![
        file_id.to_string(),
        report.accepted.to_string(),
        report.inserted.to_string(),
        report.updated.to_string(),
        report.duplicates.to_string(),
        report.categorised.to_string(),
        report.rejects.len().to_string(),
    ]);
    println!("{table}");

    for reject in &report.rejects {
        println!("  row {} rejected: {}", reject.position, reject.reason);
    }
}

/// Scan a dir recursively and list all eligible statement files. The file
/// id is the path relative to the scan root, so amex/2024-01.csv keeps
/// its account prefix.
fn scan_files(root: &Path) -> anyhow::Result<BTreeSet<String>> {
    info!("Scanning statement files in {}", root.display());

    let mut files = BTreeSet::new();
    for entry in WalkDir::new(root).into_iter().filter_entry(|e| !is_hidden(e)) {
        let entry = entry?;
        if entry.path_is_symlink() || entry.path().is_dir() {
            continue;
        }

        let file_id = entry.path().strip_prefix(root)?.to_string_lossy().to_string();
        if file_id.to_ascii_lowercase().ends_with(".csv") {
            files.insert(file_id);
        }
    }

    Ok(files)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}
