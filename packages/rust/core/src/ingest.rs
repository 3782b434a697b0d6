//! Search-result CSV ingestion.
//!
//! Reads the exported search-result CSV into [`SearchRecord`]s. The header
//! row is located by name, not position, and a trailing representative
//! figure column is optional. Rows with an empty id (or a repeated header
//! row) are skipped with a warning; an unreadable file or a missing column
//! is fatal, since there is no input to run on.

use std::path::Path;

use tracing::{info, warn};

use patentinsight_shared::{PatentInsightError, Result, SearchRecord};

/// Required CSV columns, in the documented export order.
const REQUIRED_COLUMNS: &[&str] = &[
    "id",
    "title",
    "assignee",
    "inventor/author",
    "priority date",
    "filing/creation date",
    "publication date",
    "grant date",
    "result link",
];

/// Optional trailing column.
const FIGURE_COLUMN: &str = "representative figure link";

/// Outcome of reading the input CSV.
#[derive(Debug)]
pub struct IngestResult {
    /// Records in file order.
    pub records: Vec<SearchRecord>,
    /// Rows skipped (empty id, repeated header, malformed row).
    pub skipped: usize,
    pub warnings: Vec<String>,
}

/// Read and validate the search-result CSV.
pub fn read_search_records(path: &Path) -> Result<IngestResult> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| match e.into_kind() {
            csv::ErrorKind::Io(io) => PatentInsightError::io(path, io),
            other => PatentInsightError::validation(format!(
                "failed to open {}: {other:?}",
                path.display()
            )),
        })?;

    let headers = reader
        .headers()
        .map_err(|e| {
            PatentInsightError::validation(format!("failed to read CSV header: {e}"))
        })?
        .clone();

    let mut indices = Vec::with_capacity(REQUIRED_COLUMNS.len());
    for column in REQUIRED_COLUMNS {
        let idx = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(column))
            .ok_or_else(|| {
                PatentInsightError::validation(format!(
                    "input CSV is missing required column '{column}'"
                ))
            })?;
        indices.push(idx);
    }
    let figure_idx = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(FIGURE_COLUMN));

    let mut result = IngestResult {
        records: Vec::new(),
        skipped: 0,
        warnings: Vec::new(),
    };

    for (line, row) in reader.records().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                result.skipped += 1;
                result
                    .warnings
                    .push(format!("skipped malformed CSV row {}: {e}", line + 2));
                continue;
            }
        };

        let field = |i: usize| row.get(indices[i]).unwrap_or("").to_string();

        let id = field(0);
        // Skip blank rows and repeated header rows inside the data.
        if id.is_empty() || id == "id" {
            result.skipped += 1;
            continue;
        }

        result.records.push(SearchRecord {
            id,
            title: field(1),
            assignee: field(2),
            inventors: field(3),
            priority_date: field(4),
            filing_date: field(5),
            publication_date: field(6),
            grant_date: field(7),
            result_link: field(8),
            figure_link: figure_idx
                .and_then(|i| row.get(i))
                .filter(|s| !s.is_empty())
                .map(String::from),
        });
    }

    for warning in &result.warnings {
        warn!("{warning}");
    }
    info!(
        path = %path.display(),
        records = result.records.len(),
        skipped = result.skipped,
        "loaded search records"
    );

    Ok(result)
}
