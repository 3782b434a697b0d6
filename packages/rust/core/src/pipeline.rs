//! Workflow orchestration: fetch -> integrate -> score -> rank/persist.
//!
//! The orchestrator owns all per-run state, hands each stage's output to the
//! next as an immutable value, and absorbs per-record errors into stage
//! statistics. Only a fatal configuration error or total input
//! unavailability moves the run to the failed state; everything else either
//! completes or, under the stop-on-error policy, halts with partial output
//! preserved. The execution summary is written unconditionally.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{error, info, instrument, warn};

use patentinsight_fetcher::AbstractFetcher;
use patentinsight_shared::{
    AbstractResult, AppConfig, ExecutionSummary, FetchConfig, FetchErrorKind, FinalResults,
    PatentInsightError, Result, RunStatus, ScoredRecord, SearchRecord, Stage, StageStats,
    TopRecord, load_keywords,
};

use crate::rank::RankOutcome;
use crate::score::RelevanceScorer;
use crate::{artifacts, ingest, integrate, rank};

// ---------------------------------------------------------------------------
// Options & outcome
// ---------------------------------------------------------------------------

/// Options for one pipeline run, supplied by the CLI layer.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input_csv: PathBuf,
    pub keywords_file: PathBuf,
    /// Overrides `[output].base_dir` when set.
    pub output_dir: Option<PathBuf>,
    /// 1-based offset of the first record to process.
    pub start_number: usize,
    /// Number of records to process; `None` runs through the end of input.
    pub batch_size: Option<usize>,
    /// Skip the fetch stage and integrate against this abstracts artifact.
    pub abstracts_file: Option<PathBuf>,
    /// Test mode: synthesize fetch results from this mock-abstracts file.
    pub mock_abstracts_file: Option<PathBuf>,
    /// Overrides `[error_handling].continue_on_error` when set.
    pub continue_on_error: Option<bool>,
    /// Number of records in the summary digest.
    pub top_n: usize,
}

impl RunOptions {
    pub fn new(input_csv: impl Into<PathBuf>, keywords_file: impl Into<PathBuf>) -> Self {
        Self {
            input_csv: input_csv.into(),
            keywords_file: keywords_file.into(),
            output_dir: None,
            start_number: 1,
            batch_size: None,
            abstracts_file: None,
            mock_abstracts_file: None,
            continue_on_error: None,
            top_n: 10,
        }
    }
}

/// Paths of the artifacts a run produced.
#[derive(Debug, Default)]
pub struct RunArtifacts {
    pub abstracts: Option<PathBuf>,
    pub integrated: Option<PathBuf>,
    pub scored: Option<PathBuf>,
    pub sorted: Option<PathBuf>,
    pub summary: Option<PathBuf>,
}

/// Result of a non-fatal pipeline run (completed or halted).
#[derive(Debug)]
pub struct PipelineOutcome {
    pub summary: ExecutionSummary,
    pub artifacts: RunArtifacts,
}

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the run finishes, however it finishes.
    fn done(&self, summary: &ExecutionSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _summary: &ExecutionSummary) {}
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Run the full pipeline.
///
/// Returns `Ok` for completed and halted runs (the summary's status tells
/// them apart) and `Err` only for fatal configuration/input errors. The
/// execution summary artifact is written in every case.
#[instrument(skip_all, fields(input = %options.input_csv.display()))]
pub async fn run_pipeline(
    config: &AppConfig,
    options: &RunOptions,
    progress: &dyn ProgressReporter,
) -> Result<PipelineOutcome> {
    let mut summary = ExecutionSummary::begin();
    let mut run_artifacts = RunArtifacts::default();

    let output_dir = options
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output.base_dir));
    let stamp = artifacts::current_timestamp(&config.output.timestamp_format);

    info!(output_dir = %output_dir.display(), "starting pipeline run");

    let result = run_stages(
        config,
        options,
        &output_dir,
        &stamp,
        &mut summary,
        &mut run_artifacts,
        progress,
    )
    .await;

    let status = match &result {
        Ok(status) => *status,
        Err(_) => RunStatus::Failed,
    };
    summary.finish(status);

    // The summary is the run's one durable audit artifact; emit it even
    // when the run halted or failed.
    let summary_path =
        output_dir.join(artifacts::timestamped_filename("orchestrator_results", &stamp));
    match artifacts::write_json(&summary_path, &summary) {
        Ok(()) => run_artifacts.summary = Some(summary_path),
        Err(write_err) => {
            error!(error = %write_err, "failed to write execution summary");
            if let Err(stage_err) = result {
                return Err(stage_err);
            }
            return Err(write_err);
        }
    }

    progress.done(&summary);
    info!(
        status = ?summary.status,
        errors = summary.error_count(),
        ranked = summary.ranked_count,
        "pipeline run finished"
    );

    result.map(|_| PipelineOutcome {
        summary,
        artifacts: run_artifacts,
    })
}

// ---------------------------------------------------------------------------
// Stage sequencing
// ---------------------------------------------------------------------------

/// Record a fatal error against a stage before propagating it.
fn fatal(
    summary: &mut ExecutionSummary,
    stage: Stage,
    err: PatentInsightError,
) -> PatentInsightError {
    summary.record_error(stage, None, err.to_string());
    err
}

async fn run_stages(
    config: &AppConfig,
    options: &RunOptions,
    output_dir: &Path,
    stamp: &str,
    summary: &mut ExecutionSummary,
    run_artifacts: &mut RunArtifacts,
    progress: &dyn ProgressReporter,
) -> Result<RunStatus> {
    let continue_on_error = options
        .continue_on_error
        .unwrap_or(config.error_handling.continue_on_error);

    // --- Init: pre-flight checks, nothing written yet ---
    progress.phase("Loading keyword configuration");
    let keyword_config =
        load_keywords(&options.keywords_file).map_err(|e| fatal(summary, Stage::Init, e))?;
    let scorer =
        RelevanceScorer::new(&keyword_config).map_err(|e| fatal(summary, Stage::Init, e))?;

    progress.phase("Reading search records");
    let ingest_result = ingest::read_search_records(&options.input_csv)
        .map_err(|e| fatal(summary, Stage::Init, e))?;
    for warning in ingest_result.warnings {
        summary.warn(warning);
    }

    if options.start_number == 0 {
        return Err(fatal(
            summary,
            Stage::Init,
            PatentInsightError::config("start_number is 1-based and must be >= 1"),
        ));
    }
    let window = batch_window(
        &ingest_result.records,
        options.start_number,
        options.batch_size,
    );
    if window.is_empty() {
        summary.warn(format!(
            "batch window selects no records (start {} of {} records)",
            options.start_number,
            ingest_result.records.len()
        ));
    }
    info!(
        total = ingest_result.records.len(),
        window = window.len(),
        start = options.start_number,
        "selected batch window"
    );

    // --- Fetch ---
    let abstracts: Vec<AbstractResult> = if let Some(path) = &options.abstracts_file {
        progress.phase("Loading existing abstracts");
        let loaded: Vec<AbstractResult> =
            artifacts::read_json(path).map_err(|e| fatal(summary, Stage::Fetch, e))?;
        // Stage skipped entirely: stats stay at their zero/not-run default.
        info!(abstracts = loaded.len(), "fetch stage skipped, using existing artifact");
        loaded
    } else {
        let fetched = if let Some(path) = &options.mock_abstracts_file {
            progress.phase("Fetching abstracts (mock)");
            mock_fetch(path, window).map_err(|e| fatal(summary, Stage::Fetch, e))?
        } else {
            progress.phase("Fetching abstracts");
            let fetcher = AbstractFetcher::new(FetchConfig::from(config))
                .map_err(|e| fatal(summary, Stage::Fetch, e))?;
            fetcher.fetch_batch(window, !continue_on_error).await
        };

        let succeeded = fetched.iter().filter(|r| r.is_success()).count();
        summary.stages.fetch = StageStats {
            ran: true,
            processed: fetched.len(),
            succeeded,
            failed: fetched.len() - succeeded,
        };
        for result in &fetched {
            match &result.error {
                Some(kind) => summary.record_error(
                    Stage::Fetch,
                    Some(result.id.clone()),
                    format!(
                        "{kind}: {}",
                        result.error_message.as_deref().unwrap_or("fetch failed")
                    ),
                ),
                None => {
                    if result.abstract_text.is_none() {
                        summary.warn(format!("no abstract extracted for {}", result.id));
                    }
                    if result.title.is_none() {
                        summary.warn(format!("no title extracted for {}", result.id));
                    }
                }
            }
        }

        let path =
            output_dir.join(artifacts::timestamped_filename("patents_with_abstracts", stamp));
        artifacts::write_json(&path, &fetched).map_err(|e| fatal(summary, Stage::Fetch, e))?;
        run_artifacts.abstracts = Some(path);

        if !continue_on_error && summary.stages.fetch.failed > 0 {
            warn!("halting after fetch stage under stop-on-error policy");
            return Ok(RunStatus::Partial);
        }

        fetched
    };

    // --- Integrate ---
    progress.phase("Integrating abstracts");
    let (integrated, integration_stats) = integrate::integrate(window, &abstracts);
    summary.stages.integrate = StageStats {
        ran: true,
        processed: integration_stats.processed,
        succeeded: integrated.len(),
        failed: integration_stats.validation_failures,
    };
    summary.error_log.extend(integration_stats.errors);
    if integration_stats.unmatched > 0 {
        summary.warn(format!(
            "{} record(s) had no matching abstract",
            integration_stats.unmatched
        ));
    }

    let path = output_dir.join(artifacts::timestamped_filename("integrated_patents", stamp));
    artifacts::write_json(&path, &integrated).map_err(|e| fatal(summary, Stage::Integrate, e))?;
    run_artifacts.integrated = Some(path);

    if !continue_on_error && summary.stages.integrate.failed > 0 {
        warn!("halting after integrate stage under stop-on-error policy");
        return Ok(RunStatus::Partial);
    }

    // --- Score ---
    progress.phase("Scoring relevance");
    let scored = scorer.score_all(&integrated);
    summary.stages.score = StageStats {
        ran: true,
        processed: scored.len(),
        succeeded: scored.len(),
        failed: 0,
    };

    // --- Rank & persist ---
    progress.phase("Ranking results");
    let outcome = rank::rank(scored, scorer.settings().min_score_threshold);
    summary.stages.rank = StageStats {
        ran: true,
        processed: outcome.ranked.len(),
        succeeded: outcome.ranked.len(),
        failed: 0,
    };
    summary.ranked_count = outcome.sorted.len();

    let scored_path = output_dir.join(artifacts::timestamped_filename("scored_patents", stamp));
    artifacts::write_json(&scored_path, &outcome.ranked)
        .map_err(|e| fatal(summary, Stage::Rank, e))?;
    run_artifacts.scored = Some(scored_path);

    let sorted_path =
        output_dir.join(format!("scored_patents_{stamp}_sorted.json"));
    artifacts::write_json(&sorted_path, &outcome.sorted)
        .map_err(|e| fatal(summary, Stage::Rank, e))?;
    run_artifacts.sorted = Some(sorted_path);

    summary.final_results = Some(build_final_results(&outcome, options.top_n));

    Ok(RunStatus::Completed)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Select the 1-based contiguous slice of the input to process.
fn batch_window(records: &[SearchRecord], start: usize, size: Option<usize>) -> &[SearchRecord] {
    let from = (start - 1).min(records.len());
    let to = match size {
        Some(n) => (from + n).min(records.len()),
        None => records.len(),
    };
    &records[from..to]
}

/// One entry of the mock-abstracts file (test mode): id -> content.
#[derive(Debug, Deserialize)]
struct MockAbstract {
    title: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    url: Option<String>,
}

/// Synthesize fetch results from a local mock file instead of the network.
fn mock_fetch(path: &Path, records: &[SearchRecord]) -> Result<Vec<AbstractResult>> {
    let mocks: HashMap<String, MockAbstract> = artifacts::read_json(path)?;

    Ok(records
        .iter()
        .map(|record| {
            let now = chrono::Utc::now();
            match mocks.get(&record.id) {
                Some(mock) => AbstractResult {
                    id: record.id.clone(),
                    title: mock.title.clone(),
                    abstract_text: mock.abstract_text.clone(),
                    url: mock.url.clone().unwrap_or_else(|| record.result_link.clone()),
                    error: None,
                    error_message: None,
                    retry_count: 0,
                    fetched_at: now,
                },
                None => AbstractResult {
                    id: record.id.clone(),
                    title: None,
                    abstract_text: None,
                    url: record.result_link.clone(),
                    error: Some(FetchErrorKind::ParseError),
                    error_message: Some(format!(
                        "id '{}' not present in mock abstracts file",
                        record.id
                    )),
                    retry_count: 0,
                    fetched_at: now,
                },
            }
        })
        .collect())
}

/// Relevance banding and top-N digest for the summary artifact.
fn build_final_results(outcome: &RankOutcome, top_n: usize) -> FinalResults {
    let valid: Vec<&ScoredRecord> = outcome
        .ranked
        .iter()
        .filter(|r| !r.overall_score.is_nan())
        .collect();

    FinalResults {
        total_records: outcome.ranked.len(),
        high_relevance_count: valid.iter().filter(|r| r.overall_score >= 30.0).count(),
        medium_relevance_count: valid
            .iter()
            .filter(|r| r.overall_score >= 10.0 && r.overall_score < 30.0)
            .count(),
        low_relevance_count: valid.iter().filter(|r| r.overall_score < 10.0).count(),
        nan_score_count: outcome.ranked.len() - valid.len(),
        top_records: outcome
            .sorted
            .iter()
            .take(top_n)
            .map(|r| TopRecord {
                id: r.id.clone(),
                title: r.title.clone(),
                overall_score: r.overall_score,
                ranking: r.ranking.unwrap_or(0),
                abstract_text: r.abstract_text.clone(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod pipeline_tests {
    use super::*;

    const HEADER: &str = "id,title,assignee,inventor/author,priority date,filing/creation date,publication date,grant date,result link";

    const KEYWORDS: &str = r#"{
        "neuro": {
            "keywords": ["stimulation", "monitoring"],
            "weight": 1.0,
            "description": "Neurostimulation relevance"
        }
    }"#;

    struct TestRun {
        dir: PathBuf,
    }

    impl TestRun {
        fn new(name: &str) -> Self {
            let dir = std::env::temp_dir().join(format!(
                "patentinsight-pipeline-{name}-{}",
                std::process::id()
            ));
            let _ = std::fs::remove_dir_all(&dir);
            std::fs::create_dir_all(&dir).expect("create test dir");
            Self { dir }
        }

        fn write(&self, name: &str, content: &str) -> PathBuf {
            let path = self.dir.join(name);
            std::fs::write(&path, content).expect("write test file");
            path
        }

        fn output_dir(&self) -> PathBuf {
            self.dir.join("out")
        }

        fn config(&self) -> AppConfig {
            let mut config = AppConfig::default();
            config.output.base_dir = self.output_dir().to_string_lossy().to_string();
            config
        }
    }

    impl Drop for TestRun {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }

    fn csv_row(id: &str, title: &str) -> String {
        format!(
            "{id},{title},Acme,Jane Doe,2015-01-01,2015-06-01,2016-02-01,2016-02-02,https://example.com/patent/{id}/en"
        )
    }

    fn mock_entry(title: &str, abstract_text: &str) -> String {
        format!(r#"{{"title": "{title}", "abstract": "{abstract_text}", "url": null}}"#)
    }

    #[tokio::test]
    async fn continue_mode_reaches_done_despite_one_fetch_failure() {
        let run = TestRun::new("continue");
        let csv = format!(
            "{HEADER}\n{}\n{}\n{}\n{}\n",
            csv_row("US-1-A", "Nerve stimulation device"),
            csv_row("US-2-B", "Cortical monitoring system"),
            csv_row("US-3-C", "Closed-loop stimulation method"),
            csv_row("US-4-D", "Gear assembly"),
        );
        let input = run.write("input.csv", &csv);
        let keywords = run.write("keywords.json", KEYWORDS);
        // US-4-D is absent from the mock file: its fetch fails terminally.
        let mocks = run.write(
            "mocks.json",
            &format!(
                r#"{{
                    "US-1-A": {},
                    "US-2-B": {},
                    "US-3-C": {}
                }}"#,
                mock_entry("Nerve stimulation device", "Stimulation of peripheral nerves."),
                mock_entry("Cortical monitoring system", "Continuous monitoring of signals."),
                mock_entry("Closed-loop stimulation method", "Stimulation with monitoring feedback.")
            ),
        );

        let mut options = RunOptions::new(&input, &keywords);
        options.mock_abstracts_file = Some(mocks);

        let outcome = run_pipeline(&run.config(), &options, &SilentProgress)
            .await
            .expect("run");

        assert_eq!(outcome.summary.status, RunStatus::Completed);
        assert_eq!(outcome.summary.error_count(), 1);
        assert_eq!(outcome.summary.error_log[0].stage, Stage::Fetch);
        assert_eq!(outcome.summary.error_log[0].id.as_deref(), Some("US-4-D"));
        assert_eq!(outcome.summary.stages.fetch.processed, 4);
        assert_eq!(outcome.summary.stages.fetch.succeeded, 3);
        assert_eq!(outcome.summary.stages.fetch.failed, 1);

        // The unmatched record still integrates with a null abstract, but
        // carries no keyword evidence, so only 3 records rank.
        assert_eq!(outcome.summary.stages.integrate.succeeded, 4);
        assert_eq!(outcome.summary.ranked_count, 3);

        for path in [
            outcome.artifacts.abstracts.as_ref(),
            outcome.artifacts.integrated.as_ref(),
            outcome.artifacts.scored.as_ref(),
            outcome.artifacts.sorted.as_ref(),
            outcome.artifacts.summary.as_ref(),
        ] {
            assert!(path.expect("artifact path").exists());
        }

        let digest = outcome.summary.final_results.expect("final results");
        assert_eq!(digest.total_records, 4);
        assert_eq!(digest.nan_score_count, 1);
    }

    #[tokio::test]
    async fn batch_window_touches_only_requested_records() {
        let run = TestRun::new("window");

        let mut csv = format!("{HEADER}\n");
        let mut mocks = Vec::new();
        for i in 1..=25 {
            let id = format!("P-{i:02}");
            csv.push_str(&csv_row(&id, "Stimulation device"));
            csv.push('\n');
            mocks.push(format!(
                r#""{id}": {}"#,
                mock_entry("Stimulation device", "A stimulation method.")
            ));
        }
        let input = run.write("input.csv", &csv);
        let keywords = run.write("keywords.json", KEYWORDS);
        let mock_file = run.write("mocks.json", &format!("{{{}}}", mocks.join(",")));

        let mut options = RunOptions::new(&input, &keywords);
        options.mock_abstracts_file = Some(mock_file);
        options.start_number = 11;
        options.batch_size = Some(10);

        let outcome = run_pipeline(&run.config(), &options, &SilentProgress)
            .await
            .expect("run");

        assert_eq!(outcome.summary.status, RunStatus::Completed);
        assert_eq!(outcome.summary.stages.fetch.processed, 10);

        let scored: Vec<ScoredRecord> =
            artifacts::read_json(outcome.artifacts.scored.as_ref().unwrap()).expect("read scored");
        let ids: Vec<&str> = scored.iter().map(|r| r.id.as_str()).collect();
        let expected: Vec<String> = (11..=20).map(|i| format!("P-{i:02}")).collect();
        assert_eq!(ids, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn stop_on_error_halts_with_partial_output() {
        let run = TestRun::new("halt");
        let csv = format!(
            "{HEADER}\n{}\n{}\n",
            csv_row("US-1-A", "Stimulation device"),
            csv_row("US-2-B", "Monitoring system"),
        );
        let input = run.write("input.csv", &csv);
        let keywords = run.write("keywords.json", KEYWORDS);
        // Empty mock file: every fetch fails.
        let mocks = run.write("mocks.json", "{}");

        let mut options = RunOptions::new(&input, &keywords);
        options.mock_abstracts_file = Some(mocks);
        options.continue_on_error = Some(false);

        let outcome = run_pipeline(&run.config(), &options, &SilentProgress)
            .await
            .expect("run");

        assert_eq!(outcome.summary.status, RunStatus::Partial);
        assert!(outcome.summary.error_count() >= 1);
        // The fetch artifact is preserved; later stages never ran.
        assert!(outcome.artifacts.abstracts.is_some());
        assert!(outcome.artifacts.scored.is_none());
        assert!(!outcome.summary.stages.integrate.ran);
        assert!(outcome.artifacts.summary.as_ref().unwrap().exists());
    }

    #[tokio::test]
    async fn skip_fetch_mode_reports_fetch_as_not_run() {
        let run = TestRun::new("skipfetch");
        let csv = format!("{HEADER}\n{}\n", csv_row("US-1-A", "Stimulation device"));
        let input = run.write("input.csv", &csv);
        let keywords = run.write("keywords.json", KEYWORDS);

        let existing = vec![AbstractResult {
            id: "US-1-A".into(),
            title: Some("Stimulation device".into()),
            abstract_text: Some("Stimulation with monitoring.".into()),
            url: "https://example.com/patent/US-1-A/en".into(),
            error: None,
            error_message: None,
            retry_count: 0,
            fetched_at: chrono::Utc::now(),
        }];
        let abstracts_path = run.dir.join("abstracts.json");
        artifacts::write_json(&abstracts_path, &existing).expect("write abstracts");

        let mut options = RunOptions::new(&input, &keywords);
        options.abstracts_file = Some(abstracts_path);

        let outcome = run_pipeline(&run.config(), &options, &SilentProgress)
            .await
            .expect("run");

        assert_eq!(outcome.summary.status, RunStatus::Completed);
        assert!(!outcome.summary.stages.fetch.ran);
        assert_eq!(outcome.summary.stages.fetch.processed, 0);
        assert_eq!(outcome.summary.stages.integrate.succeeded, 1);
        assert_eq!(outcome.summary.ranked_count, 1);
    }

    #[tokio::test]
    async fn invalid_keyword_weight_fails_before_any_stage() {
        let run = TestRun::new("fatal");
        let csv = format!("{HEADER}\n{}\n", csv_row("US-1-A", "Stimulation device"));
        let input = run.write("input.csv", &csv);
        let keywords = run.write(
            "keywords.json",
            r#"{"bad": {"keywords": ["x"], "weight": -1.0}}"#,
        );

        let options = RunOptions::new(&input, &keywords);
        let err = run_pipeline(&run.config(), &options, &SilentProgress)
            .await
            .unwrap_err();
        assert!(err.is_fatal());

        // The summary artifact is still written, with failed status.
        let entries: Vec<_> = std::fs::read_dir(run.output_dir())
            .expect("output dir")
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_string_lossy()
                    .starts_with("orchestrator_results_")
            })
            .collect();
        assert_eq!(entries.len(), 1);
        let written: ExecutionSummary =
            artifacts::read_json(&entries[0].path()).expect("read summary");
        assert_eq!(written.status, RunStatus::Failed);
        assert!(!written.stages.fetch.ran);
    }

    #[tokio::test]
    async fn missing_input_csv_is_fatal() {
        let run = TestRun::new("noinput");
        let keywords = run.write("keywords.json", KEYWORDS);

        let options = RunOptions::new(run.dir.join("missing.csv"), &keywords);
        let err = run_pipeline(&run.config(), &options, &SilentProgress)
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn fixture_dataset_ranks_relevant_records_first() {
        let run = TestRun::new("fixtures");

        let mut options = RunOptions::new(
            "../../../fixtures/csv/sample_patents.csv",
            "../../../fixtures/json/scoring_keywords.fixture.json",
        );
        options.mock_abstracts_file =
            Some(PathBuf::from("../../../fixtures/json/mock_abstracts.fixture.json"));

        let outcome = run_pipeline(&run.config(), &options, &SilentProgress)
            .await
            .expect("run");

        assert_eq!(outcome.summary.status, RunStatus::Completed);
        // The derailleur record has no mock abstract and no keyword
        // evidence in its title, so it is the one fetch error and the one
        // unscored record.
        assert_eq!(outcome.summary.error_count(), 1);
        assert_eq!(
            outcome.summary.error_log[0].id.as_deref(),
            Some("US-7777777-B2")
        );

        let sorted: Vec<ScoredRecord> =
            artifacts::read_json(outcome.artifacts.sorted.as_ref().unwrap()).expect("read sorted");
        assert_eq!(sorted.len(), 4);
        assert!(sorted.iter().all(|r| r.id != "US-7777777-B2"));
        for pair in sorted.windows(2) {
            assert!(pair[0].overall_score >= pair[1].overall_score);
        }

        let vns = sorted
            .iter()
            .find(|r| r.id == "US-9254383-B2")
            .expect("sample record scored");
        assert!(vns.category_scores["mental_health"] > 0.0);
        assert!(vns.category_scores["biosensor"] > 0.0);
        assert!(vns.category_scores["intervention"] > 0.0);
    }

    #[test]
    fn batch_window_bounds() {
        let records: Vec<SearchRecord> = (1..=5)
            .map(|i| SearchRecord {
                id: format!("P-{i}"),
                title: "t".into(),
                assignee: String::new(),
                inventors: String::new(),
                priority_date: String::new(),
                filing_date: String::new(),
                publication_date: String::new(),
                grant_date: String::new(),
                result_link: String::new(),
                figure_link: None,
            })
            .collect();

        assert_eq!(batch_window(&records, 1, None).len(), 5);
        assert_eq!(batch_window(&records, 2, Some(2)).len(), 2);
        assert_eq!(batch_window(&records, 2, Some(2))[0].id, "P-2");
        assert_eq!(batch_window(&records, 5, Some(10)).len(), 1);
        assert!(batch_window(&records, 9, Some(3)).is_empty());
    }
}
