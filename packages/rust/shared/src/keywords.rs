//! Keyword-category configuration for relevance scoring.
//!
//! Loaded once per run from a JSON file mapping category name to keywords,
//! weight, and description, with a reserved `scoring_settings` key for the
//! global matching options. Validated before any stage runs; an invalid
//! weight is the one fatal pre-flight condition in the pipeline.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PatentInsightError, Result};

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// One scoring category: an ordered set of keyword phrases and a weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeywordCategory {
    pub keywords: Vec<String>,
    /// Multiplier applied to the category's match ratio (0 to 1 typical).
    pub weight: f64,
    #[serde(default)]
    pub description: String,
}

/// Global matching options, under the reserved `scoring_settings` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringSettings {
    #[serde(default)]
    pub case_sensitive: bool,

    /// When true (default), substring matches count; when false, only
    /// whole-phrase matches count.
    #[serde(default = "default_true")]
    pub partial_match: bool,

    /// Weight multiplier for matches found in the title.
    #[serde(default = "default_title_weight")]
    pub title_weight: f64,

    /// Weight multiplier for matches found in the abstract.
    #[serde(default = "default_abstract_weight")]
    pub abstract_weight: f64,

    /// Records scoring below this are excluded from the sorted artifact.
    #[serde(default)]
    pub min_score_threshold: f64,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            partial_match: default_true(),
            title_weight: default_title_weight(),
            abstract_weight: default_abstract_weight(),
            min_score_threshold: 0.0,
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_title_weight() -> f64 {
    1.5
}
fn default_abstract_weight() -> f64 {
    1.0
}

/// The full keyword configuration file.
///
/// Every top-level key other than `scoring_settings` names a category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeywordConfig {
    #[serde(default)]
    pub scoring_settings: ScoringSettings,

    #[serde(flatten)]
    pub categories: BTreeMap<String, KeywordCategory>,
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

/// Load and validate a keyword configuration file.
pub fn load_keywords(path: &Path) -> Result<KeywordConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PatentInsightError::io(path, e))?;

    let config: KeywordConfig = serde_json::from_str(&content).map_err(|e| {
        PatentInsightError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    config.validate()?;

    tracing::info!(
        path = %path.display(),
        categories = config.categories.len(),
        "loaded keyword configuration"
    );

    Ok(config)
}

impl KeywordConfig {
    /// Pre-flight validation; any failure here aborts the run before any
    /// stage mutates output.
    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(PatentInsightError::config(
                "keyword configuration defines no categories",
            ));
        }

        for (name, category) in &self.categories {
            if !category.weight.is_finite() || category.weight < 0.0 {
                return Err(PatentInsightError::config(format!(
                    "category '{name}' has invalid weight {}; weights must be finite and >= 0",
                    category.weight
                )));
            }
            if category.keywords.is_empty() {
                tracing::warn!(category = %name, "category has no keywords; excluded from scoring");
            }
            if category.keywords.iter().any(|k| k.trim().is_empty()) {
                return Err(PatentInsightError::config(format!(
                    "category '{name}' contains an empty keyword"
                )));
            }
        }

        let settings = &self.scoring_settings;
        for (field, value) in [
            ("title_weight", settings.title_weight),
            ("abstract_weight", settings.abstract_weight),
            ("min_score_threshold", settings.min_score_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PatentInsightError::config(format!(
                    "scoring_settings.{field} must be finite and >= 0, got {value}"
                )));
            }
        }

        Ok(())
    }
}
