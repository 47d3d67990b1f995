use serde::Serialize;

use crate::config::Thresholds;
use crate::models::{ScoreRecord, Subject};

/// Headline numbers over the total score. Rates are percentages in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RateSummary {
    pub count: usize,
    pub avg_total: f64,
    pub max_total: f64,
    pub min_total: f64,
    pub excellent_rate: f64,
    pub qualified_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectAverage {
    pub code: &'static str,
    pub label: &'static str,
    pub avg: f64,
    /// Highest possible score of the subject, for radar chart axes.
    pub max: f64,
}

pub fn summarize(records: &[ScoreRecord], thresholds: &Thresholds) -> RateSummary {
    if records.is_empty() {
        return RateSummary::default();
    }

    let totals: Vec<f64> = records.iter().map(ScoreRecord::total).collect();
    let count = totals.len();
    let rate = |threshold: f64| {
        let hits = totals.iter().filter(|&&total| total >= threshold).count();
        hits as f64 * 100.0 / count as f64
    };

    RateSummary {
        count,
        avg_total: mean(&totals),
        max_total: totals.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        min_total: totals.iter().copied().fold(f64::INFINITY, f64::min),
        excellent_rate: rate(thresholds.excellent()),
        qualified_rate: rate(thresholds.qualified()),
    }
}

pub fn subject_averages(records: &[ScoreRecord], subjects: &[Subject]) -> Vec<SubjectAverage> {
    subjects
        .iter()
        .map(|&subject| {
            let series: Vec<f64> = records.iter().map(|r| r.score(subject)).collect();
            SubjectAverage {
                code: subject.code(),
                label: subject.label(),
                avg: mean(&series),
                max: subject.max_score(),
            }
        })
        .collect()
}

/// Arithmetic mean, `0.0` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::test_support::record_with_total;

    #[test]
    fn averages_and_max_over_totals() {
        let records = [
            record_with_total("a", 300.0),
            record_with_total("b", 350.0),
            record_with_total("c", 400.0),
        ];
        let summary = summarize(&records, &Thresholds::default());
        assert_eq!(summary.count, 3);
        assert_eq!(summary.avg_total, 350.0);
        assert_eq!(summary.max_total, 400.0);
        assert_eq!(summary.min_total, 300.0);
    }

    #[test]
    fn rates_are_percentages_with_inclusive_thresholds() {
        let records = [
            record_with_total("a", 600.0),
            record_with_total("b", 599.0),
            record_with_total("c", 450.0),
            record_with_total("d", 449.0),
        ];
        let summary = summarize(&records, &Thresholds::default());
        assert_eq!(summary.excellent_rate, 25.0);
        assert_eq!(summary.qualified_rate, 75.0);
    }

    #[test]
    fn thresholds_are_overridable() {
        let records = [record_with_total("a", 620.0), record_with_total("b", 700.0)];
        let strict = Thresholds {
            excellent_ratio: 0.9,
            ..Thresholds::default()
        };
        assert_eq!(summarize(&records, &strict).excellent_rate, 50.0);
    }

    #[test]
    fn empty_records_are_all_zero() {
        assert_eq!(summarize(&[], &Thresholds::default()), RateSummary::default());
        let averages = subject_averages(&[], &Subject::ALL);
        assert_eq!(averages.len(), 6);
        assert!(averages.iter().all(|avg| avg.avg == 0.0));
    }

    #[test]
    fn subject_averages_follow_catalog_order() {
        let records = [record_with_total("a", 300.0), record_with_total("b", 600.0)];
        let averages = subject_averages(&records, &Subject::ALL);
        let codes: Vec<&str> = averages.iter().map(|avg| avg.code).collect();
        assert_eq!(
            codes,
            ["chinese", "math", "english", "physics", "chemistry", "biology"]
        );
        assert_eq!(averages[0].max, 150.0);
        assert_eq!(averages[5].max, 100.0);
    }
}
