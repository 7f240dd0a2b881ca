//! Comparative scoring across subjects.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::aggregator::{AggregateRecord, MetricsAggregator};

/// Score given to a subject whose average duration is 0ms.
pub const SCORE_CEILING: f64 = 100.0;

/// One entry of a ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedSubject {
    pub subject: String,
    pub score: f64,
}

/// Outcome of comparing every recorded subject.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    /// Highest scoring subject, `None` when nothing has been recorded
    pub fastest: Option<String>,
    /// Descending by score; ties keep registration order
    pub ranking: Vec<RankedSubject>,
}

/// Turns aggregates into comparable scores.
///
/// Lower average duration means a higher score, floored at 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreCalculator;

impl ScoreCalculator {
    pub fn new() -> Self {
        Self
    }

    pub fn score_of(&self, record: &AggregateRecord) -> f64 {
        (SCORE_CEILING - record.average_duration).max(0.0)
    }

    /// Rank every subject with a live record.
    pub fn compare(&self, aggregator: &MetricsAggregator) -> Comparison {
        let mut ranking: Vec<RankedSubject> = aggregator
            .get_all()
            .iter()
            .map(|record| RankedSubject {
                subject: record.subject.clone(),
                score: self.score_of(record),
            })
            .collect();

        // `sort_by` is stable, so equal scores stay in registration order.
        ranking.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        Comparison {
            fastest: ranking.first().map(|entry| entry.subject.clone()),
            ranking,
        }
    }
}
