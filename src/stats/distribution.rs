use serde::Serialize;

use super::quantile::quantile;
use crate::models::{ScoreRecord, Subject};

/// Five-number summary backing one box in a box plot.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BoxSummary {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// Box summary of a single subject, keyed by its display label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectBox {
    pub label: &'static str,
    #[serde(flatten)]
    pub summary: BoxSummary,
}

/// Summarizes `series` without reordering it. An empty series gives all zeros.
pub fn box_summary(series: &[f64]) -> BoxSummary {
    let mut sorted = series.to_vec();
    sorted.sort_by(f64::total_cmp);

    let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
        return BoxSummary::default();
    };
    BoxSummary {
        min,
        q1: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q3: quantile(&sorted, 0.75),
        max,
    }
}

pub fn subject_series(records: &[ScoreRecord], subject: Subject) -> Vec<f64> {
    records.iter().map(|record| record.score(subject)).collect()
}

pub fn box_plots(records: &[ScoreRecord], subjects: &[Subject]) -> Vec<SubjectBox> {
    subjects
        .iter()
        .map(|&subject| SubjectBox {
            label: subject.label(),
            summary: box_summary(&subject_series(records, subject)),
        })
        .collect()
}
