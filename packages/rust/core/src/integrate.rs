//! Abstract integration: merge search records with fetched abstracts.
//!
//! Matching is by exact, case-sensitive identifier; a casing mismatch is a
//! data-quality issue to surface, not silently fix. Unmatched records keep a
//! null abstract and are counted, never dropped. Output preserves the input
//! record order.

use std::collections::HashMap;

use tracing::{info, instrument, warn};

use patentinsight_shared::{
    AbstractResult, IntegratedRecord, RecordMeta, SearchRecord, Stage, StageError,
};

/// Counters and per-record errors from one integration pass.
#[derive(Debug, Default)]
pub struct IntegrationStats {
    pub processed: usize,
    /// Records that received an abstract.
    pub matched: usize,
    /// Records with no successful fetch result (abstract stays null).
    pub unmatched: usize,
    /// Records excluded for failing required-field validation.
    pub validation_failures: usize,
    pub errors: Vec<StageError>,
}

/// Merge search records with fetch results keyed by identifier.
#[instrument(skip_all, fields(records = records.len(), abstracts = abstracts.len()))]
pub fn integrate(
    records: &[SearchRecord],
    abstracts: &[AbstractResult],
) -> (Vec<IntegratedRecord>, IntegrationStats) {
    // First successful result per id wins; failed fetches never match.
    let mut by_id: HashMap<&str, &AbstractResult> = HashMap::new();
    for result in abstracts.iter().filter(|r| r.is_success()) {
        by_id.entry(result.id.as_str()).or_insert(result);
    }

    let mut integrated = Vec::with_capacity(records.len());
    let mut stats = IntegrationStats::default();

    for record in records {
        stats.processed += 1;

        if record.id.is_empty() || record.title.is_empty() {
            stats.validation_failures += 1;
            let message = format!(
                "record '{}' is missing a required field (id and title must be non-empty)",
                record.id
            );
            warn!("{message}");
            stats.errors.push(StageError {
                stage: Stage::Integrate,
                id: (!record.id.is_empty()).then(|| record.id.clone()),
                message,
            });
            continue;
        }

        let fetched = by_id.get(record.id.as_str());
        let abstract_text = fetched.and_then(|r| r.abstract_text.clone());

        if abstract_text.is_some() {
            stats.matched += 1;
        } else {
            stats.unmatched += 1;
        }

        integrated.push(IntegratedRecord {
            id: record.id.clone(),
            title: record.title.clone(),
            abstract_text,
            abstract_title: fetched.and_then(|r| r.title.clone()),
            abstract_url: fetched.map(|r| r.url.clone()),
            metadata: RecordMeta::from(record),
        });
    }

    info!(
        processed = stats.processed,
        matched = stats.matched,
        unmatched = stats.unmatched,
        validation_failures = stats.validation_failures,
        "integration complete"
    );

    (integrated, stats)
}
