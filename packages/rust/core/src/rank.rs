//! Result ranking and sorting.
//!
//! Produces two views of the scored records: the pass-through view in
//! original order with rankings annotated, and the sorted view with
//! NaN-scored and below-threshold records removed. The sort is stable and
//! descending by overall score; ties keep their original relative order and
//! no secondary key is invented.

use std::cmp::Ordering;

use tracing::{info, instrument};

use patentinsight_shared::ScoredRecord;

/// The two output views of one ranking pass.
#[derive(Debug)]
pub struct RankOutcome {
    /// All records in their original order, rankings annotated. NaN-scored
    /// records are included with `ranking: None`.
    pub ranked: Vec<ScoredRecord>,
    /// Scoreable records only, sorted by overall score descending.
    pub sorted: Vec<ScoredRecord>,
}

/// Rank and sort scored records.
///
/// `min_score_threshold` additionally excludes low-scoring records from the
/// sorted view; pass 0.0 to keep every scoreable record.
#[instrument(skip_all, fields(records = records.len()))]
pub fn rank(records: Vec<ScoredRecord>, min_score_threshold: f64) -> RankOutcome {
    // Order the scoreable indices by score descending. sort_by is stable,
    // so equal scores keep their input order.
    let mut order: Vec<(usize, f64)> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.overall_score.is_nan())
        .map(|(i, r)| (i, r.overall_score))
        .collect();
    order.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    let mut rankings: Vec<Option<usize>> = vec![None; records.len()];
    for (position, (index, _)) in order.iter().enumerate() {
        rankings[*index] = Some(position + 1);
    }

    let mut ranked = records;
    for (record, ranking) in ranked.iter_mut().zip(&rankings) {
        record.ranking = *ranking;
    }

    let sorted: Vec<ScoredRecord> = order
        .iter()
        .filter(|(_, score)| *score >= min_score_threshold)
        .map(|(index, _)| ranked[*index].clone())
        .collect();

    info!(
        ranked = ranked.len(),
        sorted = sorted.len(),
        excluded = ranked.len() - sorted.len(),
        "ranking complete"
    );

    RankOutcome { ranked, sorted }
}
