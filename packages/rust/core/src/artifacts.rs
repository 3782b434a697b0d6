//! Output artifact reading and writing.
//!
//! All artifacts are indented UTF-8 JSON with timestamped filenames, so a
//! run never overwrites a previous run's output. The sorted view of an
//! existing scored artifact can be regenerated standalone, without
//! re-running fetch, integrate, or score.

use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use patentinsight_shared::{PatentInsightError, Result, ScoredRecord};

use crate::rank;

/// Build a timestamped artifact filename, e.g. `scored_patents_20250806_101500.json`.
pub fn timestamped_filename(base: &str, timestamp: &str) -> String {
    format!("{base}_{timestamp}.json")
}

/// Format the current local time with the configured timestamp format.
pub fn current_timestamp(format: &str) -> String {
    Local::now().format(format).to_string()
}

/// Write a value as indented JSON, creating parent directories as needed.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| PatentInsightError::io(parent, e))?;
    }

    let json = serde_json::to_string_pretty(value)
        .map_err(|e| PatentInsightError::validation(format!("serialization failed: {e}")))?;

    std::fs::write(path, json).map_err(|e| PatentInsightError::io(path, e))?;
    Ok(())
}

/// Read a JSON artifact back into a typed value.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| PatentInsightError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| {
        PatentInsightError::validation(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Regenerate the sorted artifact from an existing scored-records file.
///
/// Returns the output path plus (total, kept) record counts. Running this
/// twice over the same input produces identical output.
pub fn sort_scored_file(input: &Path, output: Option<&Path>) -> Result<(PathBuf, usize, usize)> {
    let records: Vec<ScoredRecord> = read_json(input)?;
    let total = records.len();

    let outcome = rank::rank(records, 0.0);
    let kept = outcome.sorted.len();

    let output_path = match output {
        Some(path) => path.to_path_buf(),
        None => sorted_sibling_path(input),
    };

    write_json(&output_path, &outcome.sorted)?;

    info!(
        input = %input.display(),
        output = %output_path.display(),
        total,
        kept,
        "sorted scored file created"
    );

    Ok((output_path, total, kept))
}

/// Derive `<stem>_sorted.json` next to the input file.
fn sorted_sibling_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("scored_patents");
    input.with_file_name(format!("{stem}_sorted.json"))
}
