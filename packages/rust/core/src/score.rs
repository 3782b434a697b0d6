//! Keyword-based relevance scoring.
//!
//! Each record is scored against every configured category. A category's
//! score is its field-weighted match ratio times its weight times 100,
//! capped so it never exceeds `weight x 100`; the overall score is the mean
//! over categories that define at least one keyword. A record with no
//! keyword evidence scores NaN, which is deliberately distinct from zero.

use std::collections::BTreeMap;

use regex::RegexBuilder;
use tracing::{debug, info, instrument};

use patentinsight_shared::{
    IntegratedRecord, KeywordConfig, KeywordDetail, PatentInsightError, Result, ScoredRecord,
    ScoringSettings,
};

// ---------------------------------------------------------------------------
// Compiled configuration
// ---------------------------------------------------------------------------

/// How one configured keyword is matched against record text.
enum Matcher {
    /// Substring containment; the needle is pre-lowercased when matching
    /// case-insensitively.
    Substring(String),
    /// Whole-phrase match at word boundaries (partial matching disabled).
    Phrase(regex::Regex),
}

struct CompiledKeyword {
    /// The literal configured phrase, reported in match evidence.
    literal: String,
    matcher: Matcher,
}

impl CompiledKeyword {
    /// Occurrences of this keyword in one field. `folded` is the field text
    /// pre-folded for substring matching; `original` is the raw field text
    /// for regex matching.
    fn count(&self, folded: &str, original: &str) -> usize {
        match &self.matcher {
            Matcher::Substring(needle) => folded.match_indices(needle.as_str()).count(),
            Matcher::Phrase(regex) => regex.find_iter(original).count(),
        }
    }
}

struct CompiledCategory {
    name: String,
    weight: f64,
    keywords: Vec<CompiledKeyword>,
}

// ---------------------------------------------------------------------------
// RelevanceScorer
// ---------------------------------------------------------------------------

/// Scores integrated records against a validated keyword configuration.
pub struct RelevanceScorer {
    categories: Vec<CompiledCategory>,
    settings: ScoringSettings,
}

impl RelevanceScorer {
    /// Compile a keyword configuration. Validation here is the pipeline's
    /// one fatal pre-flight check.
    pub fn new(config: &KeywordConfig) -> Result<Self> {
        config.validate()?;
        let settings = config.scoring_settings.clone();

        let mut categories = Vec::with_capacity(config.categories.len());
        for (name, category) in &config.categories {
            let mut keywords = Vec::with_capacity(category.keywords.len());
            for keyword in &category.keywords {
                let matcher = if settings.partial_match {
                    let needle = if settings.case_sensitive {
                        keyword.clone()
                    } else {
                        keyword.to_lowercase()
                    };
                    Matcher::Substring(needle)
                } else {
                    let pattern = format!(r"\b{}\b", regex::escape(keyword));
                    let regex = RegexBuilder::new(&pattern)
                        .case_insensitive(!settings.case_sensitive)
                        .build()
                        .map_err(|e| {
                            PatentInsightError::config(format!(
                                "cannot compile keyword '{keyword}' in category '{name}': {e}"
                            ))
                        })?;
                    Matcher::Phrase(regex)
                };
                keywords.push(CompiledKeyword {
                    literal: keyword.clone(),
                    matcher,
                });
            }
            categories.push(CompiledCategory {
                name: name.clone(),
                weight: category.weight,
                keywords,
            });
        }

        Ok(Self {
            categories,
            settings,
        })
    }

    pub fn settings(&self) -> &ScoringSettings {
        &self.settings
    }

    /// Score one integrated record.
    pub fn score(&self, record: &IntegratedRecord) -> ScoredRecord {
        let title = record.title.as_str();
        let abstract_text = record.abstract_text.as_deref().unwrap_or("");

        let (title_folded, abstract_folded) = if self.settings.case_sensitive {
            (title.to_string(), abstract_text.to_string())
        } else {
            (title.to_lowercase(), abstract_text.to_lowercase())
        };

        let mut category_scores = BTreeMap::new();
        let mut matched_keywords = BTreeMap::new();
        let mut keyword_details = BTreeMap::new();
        let mut contributing: Vec<f64> = Vec::new();
        let mut any_match = false;

        for category in &self.categories {
            let total = category.keywords.len();
            if total == 0 {
                // No keywords: the category has no computable score and is
                // excluded from the mean rather than treated as zero.
                continue;
            }

            let mut weighted_sum = 0.0;
            let mut names = Vec::new();
            let mut details = Vec::new();

            for keyword in &category.keywords {
                let title_count = keyword.count(&title_folded, title);
                let abstract_count = keyword.count(&abstract_folded, abstract_text);
                if title_count + abstract_count == 0 {
                    continue;
                }

                any_match = true;
                let mut contribution = 0.0;
                if title_count > 0 {
                    contribution += self.settings.title_weight;
                }
                if abstract_count > 0 {
                    contribution += self.settings.abstract_weight;
                }
                weighted_sum += contribution;

                names.push(keyword.literal.clone());
                details.push(KeywordDetail {
                    keyword: keyword.literal.clone(),
                    match_count: title_count + abstract_count,
                    in_title: title_count > 0,
                    in_abstract: abstract_count > 0,
                });
            }

            // Cap the weighted sum at the keyword count so the category
            // score never exceeds weight x 100.
            let capped = weighted_sum.min(total as f64);
            let score = capped / total as f64 * category.weight * 100.0;

            category_scores.insert(category.name.clone(), score);
            contributing.push(score);
            if !names.is_empty() {
                matched_keywords.insert(category.name.clone(), names);
                keyword_details.insert(category.name.clone(), details);
            }
        }

        let text_empty = title.trim().is_empty() && abstract_text.trim().is_empty();
        let overall_score = if contributing.is_empty() || !any_match || text_empty {
            f64::NAN
        } else {
            contributing.iter().sum::<f64>() / contributing.len() as f64
        };

        debug!(id = %record.id, overall_score, "scored record");

        ScoredRecord {
            id: record.id.clone(),
            title: record.title.clone(),
            abstract_text: record.abstract_text.clone(),
            overall_score,
            category_scores,
            matched_keywords,
            keyword_details,
            ranking: None,
            metadata: record.metadata.clone(),
        }
    }

    /// Score a batch, preserving input order.
    #[instrument(skip_all, fields(records = records.len()))]
    pub fn score_all(&self, records: &[IntegratedRecord]) -> Vec<ScoredRecord> {
        let scored: Vec<ScoredRecord> = records.iter().map(|r| self.score(r)).collect();
        info!(records = scored.len(), "relevance scoring complete");
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patentinsight_shared::RecordMeta;

    fn meta() -> RecordMeta {
        RecordMeta {
            assignee: "Acme".into(),
            inventors: "Jane Doe".into(),
            priority_date: "2015-01-01".into(),
            filing_date: "2015-06-01".into(),
            publication_date: "2016-02-01".into(),
            grant_date: "2016-02-02".into(),
            result_link: "https://example.com/p".into(),
        }
    }

    fn record(id: &str, title: &str, abstract_text: Option<&str>) -> IntegratedRecord {
        IntegratedRecord {
            id: id.into(),
            title: title.into(),
            abstract_text: abstract_text.map(String::from),
            abstract_title: None,
            abstract_url: None,
            metadata: meta(),
        }
    }

    fn config(json: &str) -> KeywordConfig {
        serde_json::from_str(json).expect("parse keyword config")
    }

    const SAMPLE_CONFIG: &str = r#"{
        "mental_health": {
            "keywords": ["stimulation", "monitoring", "mood"],
            "weight": 1.0,
            "description": "Mental-health relevance"
        },
        "biosensor": {
            "keywords": ["monitoring", "sensor"],
            "weight": 0.8,
            "description": "Sensing"
        },
        "intervention": {
            "keywords": ["stimulation", "therapy"],
            "weight": 0.9,
            "description": "Treatment delivery"
        }
    }"#;

    #[test]
    fn sample_record_matches_expected_categories() {
        let scorer = RelevanceScorer::new(&config(SAMPLE_CONFIG)).unwrap();
        let scored = scorer.score(&record(
            "US-9254383-B2",
            "Devices and methods for vagus nerve stimulation",
            Some(
                "Stimulation of the vagus nerve paired with monitoring of patient \
                 state enables closed-loop therapy delivery.",
            ),
        ));

        assert!(scored.matched_keywords["mental_health"].contains(&"stimulation".to_string()));
        assert!(scored.matched_keywords["mental_health"].contains(&"monitoring".to_string()));
        assert!(scored.matched_keywords["biosensor"].contains(&"monitoring".to_string()));
        assert!(scored.matched_keywords["intervention"].contains(&"stimulation".to_string()));

        // Every category has evidence, so every category scores above zero.
        assert!(scored.category_scores["mental_health"] > 0.0);
        assert!(scored.category_scores["biosensor"] > 0.0);
        assert!(scored.category_scores["intervention"] > 0.0);

        // Both intervention keywords hit: stimulation and therapy.
        assert_eq!(scored.matched_keywords["intervention"].len(), 2);
        assert!(!scored.overall_score.is_nan());
    }

    #[test]
    fn no_keyword_evidence_scores_nan_not_zero() {
        let scorer = RelevanceScorer::new(&config(SAMPLE_CONFIG)).unwrap();
        let scored = scorer.score(&record(
            "US-0-X",
            "Gear assembly for bicycles",
            Some("A derailleur with improved shifting."),
        ));

        assert!(scored.overall_score.is_nan());
        assert!(scored.matched_keywords.is_empty());
    }

    #[test]
    fn empty_title_and_abstract_scores_nan() {
        let scorer = RelevanceScorer::new(&config(SAMPLE_CONFIG)).unwrap();
        let scored = scorer.score(&record("US-0-X", "", None));
        assert!(scored.overall_score.is_nan());
    }

    #[test]
    fn zero_keyword_category_excluded_from_mean() {
        let scorer = RelevanceScorer::new(&config(
            r#"{
                "real": {"keywords": ["sensor"], "weight": 1.0},
                "empty": {"keywords": [], "weight": 1.0}
            }"#,
        ))
        .unwrap();

        let scored = scorer.score(&record("US-1-A", "T", Some("a sensor array")));

        // "sensor" in the abstract only: 1.0 / 1 * 1.0 * 100 = 100.
        assert_eq!(scored.category_scores.len(), 1);
        assert_eq!(scored.overall_score, 100.0);
    }

    #[test]
    fn title_matches_weigh_more_than_abstract_matches() {
        let cfg = config(r#"{"c": {"keywords": ["alpha", "beta"], "weight": 1.0}}"#);
        let scorer = RelevanceScorer::new(&cfg).unwrap();

        // alpha in title only: 1.5 / 2 * 100 = 75.
        let in_title = scorer.score(&record("T", "alpha compound", Some("nothing here")));
        assert_eq!(in_title.category_scores["c"], 75.0);

        // alpha in abstract only: 1.0 / 2 * 100 = 50.
        let in_abstract = scorer.score(&record("A", "compound", Some("uses alpha waves")));
        assert_eq!(in_abstract.category_scores["c"], 50.0);

        let detail = &in_title.keyword_details["c"][0];
        assert!(detail.in_title);
        assert!(!detail.in_abstract);
    }

    #[test]
    fn category_score_is_capped_at_weight_times_100() {
        let cfg = config(r#"{"c": {"keywords": ["sensor"], "weight": 0.8}}"#);
        let scorer = RelevanceScorer::new(&cfg).unwrap();

        // One keyword in both fields would sum to 2.5 without the cap.
        let scored = scorer.score(&record("X", "sensor device", Some("the sensor is small")));
        assert_eq!(scored.category_scores["c"], 80.0);
    }

    #[test]
    fn match_counts_cover_both_fields() {
        let cfg = config(r#"{"c": {"keywords": ["sensor"], "weight": 1.0}}"#);
        let scorer = RelevanceScorer::new(&cfg).unwrap();

        let scored = scorer.score(&record(
            "X",
            "Sensor array",
            Some("One sensor here, another sensor there."),
        ));
        let detail = &scored.keyword_details["c"][0];
        assert_eq!(detail.match_count, 3);
        assert!(detail.in_title && detail.in_abstract);
    }

    #[test]
    fn matching_is_case_insensitive_by_default() {
        let cfg = config(r#"{"c": {"keywords": ["Stimulation"], "weight": 1.0}}"#);
        let scorer = RelevanceScorer::new(&cfg).unwrap();
        let scored = scorer.score(&record("X", "STIMULATION DEVICE", None));
        assert_eq!(scored.matched_keywords["c"].len(), 1);
    }

    #[test]
    fn case_sensitive_mode_respects_casing() {
        let cfg = config(
            r#"{
                "scoring_settings": {"case_sensitive": true},
                "c": {"keywords": ["Stimulation"], "weight": 1.0}
            }"#,
        );
        let scorer = RelevanceScorer::new(&cfg).unwrap();

        assert!(scorer
            .score(&record("X", "stimulation device", None))
            .overall_score
            .is_nan());
        assert!(!scorer
            .score(&record("X", "Stimulation device", None))
            .overall_score
            .is_nan());
    }

    #[test]
    fn partial_match_disabled_requires_whole_phrase() {
        let cfg = config(
            r#"{
                "scoring_settings": {"partial_match": false},
                "c": {"keywords": ["stim"], "weight": 1.0}
            }"#,
        );
        let scorer = RelevanceScorer::new(&cfg).unwrap();

        // "stim" appears only inside "stimulation"; no whole-word match.
        assert!(scorer
            .score(&record("X", "a stimulation device", None))
            .overall_score
            .is_nan());
        assert!(!scorer
            .score(&record("X", "a stim protocol", None))
            .overall_score
            .is_nan());
    }

    #[test]
    fn invalid_weight_rejected_before_scoring() {
        let cfg = config(r#"{"c": {"keywords": ["x"], "weight": -1.0}}"#);
        assert!(RelevanceScorer::new(&cfg).is_err());
    }
}
