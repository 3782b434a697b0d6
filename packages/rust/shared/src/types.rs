//! Core domain types for the PatentInsight pipeline.
//!
//! Records flow through the four stages as distinct types: a [`SearchRecord`]
//! comes from the search-result CSV, the fetch stage produces one
//! [`AbstractResult`] per record, integration merges the two into an
//! [`IntegratedRecord`], and scoring derives a [`ScoredRecord`] from it.
//! The run as a whole is audited by an [`ExecutionSummary`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FetchErrorKind;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Pipeline stages, used in statistics and error-log entries. `Init` covers
/// pre-flight work (config loading, input reading) before the first stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Init,
    Fetch,
    Integrate,
    Score,
    Rank,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::Fetch => "fetch",
            Stage::Integrate => "integrate",
            Stage::Score => "score",
            Stage::Rank => "rank",
        };
        write!(f, "{name}")
    }
}

// ---------------------------------------------------------------------------
// SearchRecord
// ---------------------------------------------------------------------------

/// One row of the search-result CSV. Immutable once read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRecord {
    /// Unique record key (e.g., `US-9254383-B2`).
    pub id: String,
    pub title: String,
    pub assignee: String,
    pub inventors: String,
    pub priority_date: String,
    pub filing_date: String,
    pub publication_date: String,
    pub grant_date: String,
    /// Source-result URL used for abstract fetching.
    pub result_link: String,
    /// Representative figure link (optional trailing CSV column).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub figure_link: Option<String>,
}

// ---------------------------------------------------------------------------
// AbstractResult
// ---------------------------------------------------------------------------

/// Final outcome of fetching one record's abstract, success or failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbstractResult {
    pub id: String,
    /// Title extracted from the source page, if any selector matched.
    pub title: Option<String>,
    /// Abstract text extracted from the source page, if any selector matched.
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub url: String,
    /// Failure classification; `None` on success (including partial
    /// extraction, where one field is missing but the fetch itself worked).
    pub error: Option<FetchErrorKind>,
    pub error_message: Option<String>,
    /// Number of retries performed after the initial attempt.
    pub retry_count: u32,
    pub fetched_at: DateTime<Utc>,
}

impl AbstractResult {
    /// Whether the fetch itself succeeded (content may still be partial).
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

// ---------------------------------------------------------------------------
// IntegratedRecord
// ---------------------------------------------------------------------------

/// Bibliographic metadata carried through from the search-result input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordMeta {
    pub assignee: String,
    pub inventors: String,
    pub priority_date: String,
    pub filing_date: String,
    pub publication_date: String,
    pub grant_date: String,
    pub result_link: String,
}

impl From<&SearchRecord> for RecordMeta {
    fn from(record: &SearchRecord) -> Self {
        Self {
            assignee: record.assignee.clone(),
            inventors: record.inventors.clone(),
            priority_date: record.priority_date.clone(),
            filing_date: record.filing_date.clone(),
            publication_date: record.publication_date.clone(),
            grant_date: record.grant_date.clone(),
            result_link: record.result_link.clone(),
        }
    }
}

/// A search record merged with its fetched abstract.
///
/// `abstract_text` is `None` only if no successful fetch result matched the
/// record's id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegratedRecord {
    pub id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub abstract_title: Option<String>,
    pub abstract_url: Option<String>,
    pub metadata: RecordMeta,
}

// ---------------------------------------------------------------------------
// ScoredRecord
// ---------------------------------------------------------------------------

/// Per-keyword match evidence within one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordDetail {
    /// The literal configured keyword phrase.
    pub keyword: String,
    /// Total occurrences across title and abstract.
    pub match_count: usize,
    pub in_title: bool,
    pub in_abstract: bool,
}

/// An integrated record with relevance scores attached.
///
/// `overall_score` may be NaN, meaning "no keyword evidence"; this is
/// distinct from a true zero and serializes as JSON `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(with = "nan_as_null")]
    pub overall_score: f64,
    /// Raw score per category, for categories with at least one keyword.
    pub category_scores: BTreeMap<String, f64>,
    /// Literal keyword strings that matched, per category.
    pub matched_keywords: BTreeMap<String, Vec<String>>,
    /// Match counts and contributing fields, per category.
    pub keyword_details: BTreeMap<String, Vec<KeywordDetail>>,
    /// 1-based position by score order; assigned by the ranker, `None` for
    /// NaN-scored records.
    pub ranking: Option<usize>,
    pub metadata: RecordMeta,
}

/// Serialize NaN as JSON `null` and read `null` back as NaN, so scored
/// artifacts round-trip through serde_json.
pub mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_none()
        } else {
            serializer.serialize_some(value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

// ---------------------------------------------------------------------------
// ExecutionSummary
// ---------------------------------------------------------------------------

/// Terminal status of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    /// All stages ran; per-record errors (if any) were absorbed.
    Completed,
    /// The run halted early under the stop-on-error policy; artifacts
    /// produced before the halt are preserved.
    Partial,
    /// A fatal configuration or I/O error aborted the run.
    Failed,
}

/// Counters for one stage of a run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StageStats {
    /// False when the stage was skipped (e.g., fetch in skip-fetch mode).
    pub ran: bool,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Per-stage counters for the whole run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StageReport {
    pub fetch: StageStats,
    pub integrate: StageStats,
    pub score: StageStats,
    pub rank: StageStats,
}

/// One entry in the ordered error log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageError {
    pub stage: Stage,
    /// Record identifier, when the error is attributable to one record.
    pub id: Option<String>,
    pub message: String,
}

/// Digest of the scored output, embedded in the summary artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalResults {
    pub total_records: usize,
    /// Records scoring at or above 30.
    pub high_relevance_count: usize,
    /// Records scoring in [10, 30).
    pub medium_relevance_count: usize,
    /// Records scoring below 10.
    pub low_relevance_count: usize,
    pub nan_score_count: usize,
    pub top_records: Vec<TopRecord>,
}

/// A highly ranked record, for the summary digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopRecord {
    pub id: String,
    pub title: String,
    #[serde(with = "nan_as_null")]
    pub overall_score: f64,
    pub ranking: usize,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
}

/// The run's single durable audit artifact, built incrementally by the
/// orchestrator and written once at the end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub stages: StageReport,
    /// Number of records in the sorted (NaN-excluded) output.
    pub ranked_count: usize,
    pub error_log: Vec<StageError>,
    pub warnings: Vec<String>,
    pub final_results: Option<FinalResults>,
}

impl ExecutionSummary {
    /// Start a new summary in the `Running` state.
    pub fn begin() -> Self {
        Self {
            start_time: Utc::now(),
            end_time: None,
            status: RunStatus::Running,
            stages: StageReport::default(),
            ranked_count: 0,
            error_log: Vec::new(),
            warnings: Vec::new(),
            final_results: None,
        }
    }

    /// Append a per-record or per-stage error to the ordered log.
    pub fn record_error(&mut self, stage: Stage, id: Option<String>, message: impl Into<String>) {
        self.error_log.push(StageError {
            stage,
            id,
            message: message.into(),
        });
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Close the summary with a terminal status.
    pub fn finish(&mut self, status: RunStatus) {
        self.status = status;
        self.end_time = Some(Utc::now());
    }

    pub fn error_count(&self) -> usize {
        self.error_log.len()
    }
}
