//! Shared types, error model, and configuration for PatentInsight.
//!
//! This crate is the foundation depended on by the fetcher, core, and CLI
//! crates. It provides:
//! - [`PatentInsightError`], the unified error type and fatality split
//! - Domain types ([`SearchRecord`], [`AbstractResult`], [`IntegratedRecord`],
//!   [`ScoredRecord`], [`ExecutionSummary`])
//! - App configuration ([`AppConfig`], [`FetchConfig`], config loading)
//! - Keyword configuration ([`KeywordConfig`], load + pre-flight validation)

pub mod config;
pub mod error;
pub mod keywords;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ErrorHandlingConfig, FetchConfig, FetcherConfig, MAX_FETCH_CONCURRENCY,
    OutputConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{FetchErrorKind, PatentInsightError, Result};
pub use keywords::{KeywordCategory, KeywordConfig, ScoringSettings, load_keywords};
pub use types::{
    AbstractResult, ExecutionSummary, FinalResults, IntegratedRecord, KeywordDetail, RecordMeta,
    RunStatus, ScoredRecord, SearchRecord, Stage, StageError, StageReport, StageStats, TopRecord,
};
