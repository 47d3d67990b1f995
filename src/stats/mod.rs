//! Statistics aggregation over a snapshot of score records.
//!
//! Every facet is a pure function of the same `&[ScoreRecord]` slice; none
//! of them mutates it or shares state with another facet. [`build_stats`]
//! runs them all and assembles the flat [`StatsResult`] consumed by chart
//! clients.

pub mod correlation;
pub mod distribution;
pub mod histogram;
pub mod quantile;
pub mod rates;
pub mod scatter;
pub mod segments;

use std::cmp::Ordering;

use indexmap::IndexMap;
use serde::Serialize;

use crate::config::StatsConfig;
use crate::models::{ScoreRecord, Subject};

use self::correlation::Correlation;
use self::distribution::SubjectBox;
use self::histogram::HistogramBin;
use self::rates::SubjectAverage;
use self::scatter::ScatterPoint;
use self::segments::Segment;

const TOP_N: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResult {
    pub count: usize,
    pub avg_total: f64,
    pub max_total: f64,
    pub min_total: f64,
    pub excellent_rate: f64,
    pub qualified_rate: f64,
    pub histogram: Vec<HistogramBin>,
    pub segments: Vec<Segment>,
    pub subject_averages: Vec<SubjectAverage>,
    pub subject_series: IndexMap<&'static str, Vec<f64>>,
    pub box_plots: Vec<SubjectBox>,
    pub scatter: Vec<ScatterPoint>,
    pub correlations: Vec<Correlation>,
    pub top10: Vec<ScoreRecord>,
}

pub fn build_stats(records: &[ScoreRecord], config: &StatsConfig) -> StatsResult {
    let subjects = &Subject::ALL;
    let summary = rates::summarize(records, &config.thresholds);
    let totals: Vec<f64> = records.iter().map(ScoreRecord::total).collect();

    let subject_series = subjects
        .iter()
        .map(|&subject| {
            (
                subject.label(),
                distribution::subject_series(records, subject),
            )
        })
        .collect();

    let mut ranked = records.to_vec();
    ranked.sort_by(rank_order);
    ranked.truncate(TOP_N);

    tracing::debug!(count = summary.count, "aggregated statistics");

    StatsResult {
        count: summary.count,
        avg_total: summary.avg_total,
        max_total: summary.max_total,
        min_total: summary.min_total,
        excellent_rate: summary.excellent_rate,
        qualified_rate: summary.qualified_rate,
        histogram: histogram::histogram(&totals, &config.histogram),
        segments: segments::segments(records, &config.thresholds),
        subject_averages: rates::subject_averages(records, subjects),
        subject_series,
        box_plots: distribution::box_plots(records, subjects),
        scatter: scatter::scatter(records, &config.scatter.subjects),
        correlations: correlation::correlations(records, subjects),
        top10: ranked,
    }
}

/// Roster ranking: total descending, ties broken by chinese, math and
/// english descending, then by name.
pub fn rank_order(a: &ScoreRecord, b: &ScoreRecord) -> Ordering {
    b.total()
        .total_cmp(&a.total())
        .then_with(|| b.scores.chinese.total_cmp(&a.scores.chinese))
        .then_with(|| b.scores.math.total_cmp(&a.scores.math))
        .then_with(|| b.scores.english.total_cmp(&a.scores.english))
        .then_with(|| a.name.cmp(&b.name))
}


#[cfg(test)]
mod tests {
    use super::test_support::{record, record_with_total};
    use super::*;

    fn roster() -> Vec<ScoreRecord> {
        vec![
            record("王子轩", [128.0, 140.0, 121.0, 92.0, 88.0, 90.0]),
            record("李雨涵", [110.0, 98.0, 125.0, 70.0, 66.0, 75.0]),
            record("张浩", [95.0, 72.0, 80.0, 55.0, 48.0, 60.0]),
            record("陈思", [118.0, 120.0, 117.0, 81.0, 79.0, 83.0]),
            record("刘博", [70.0, 64.0, 61.0, 40.0, 38.0, 35.0]),
            record("杨欣", [118.0, 125.0, 104.0, 85.0, 74.0, 80.0]),
        ]
    }

    #[test]
    fn facets_agree_on_count() {
        let records = roster();
        let stats = build_stats(&records, &StatsConfig::default());
        assert_eq!(stats.count, records.len());
        assert_eq!(
            stats.histogram.iter().map(|bin| bin.count).sum::<usize>(),
            records.len()
        );
        assert_eq!(
            stats.segments.iter().map(|seg| seg.count).sum::<usize>(),
            records.len()
        );
        assert_eq!(stats.scatter.len(), records.len());
        assert_eq!(stats.correlations.len(), 36);
        assert_eq!(stats.box_plots.len(), 6);
        for b in &stats.box_plots {
            let s = b.summary;
            assert!(s.min <= s.q1 && s.q1 <= s.median && s.median <= s.q3 && s.q3 <= s.max);
        }
    }

    #[test]
    fn subject_series_keeps_catalog_order_and_record_order() {
        let stats = build_stats(&roster(), &StatsConfig::default());
        let labels: Vec<&str> = stats.subject_series.keys().copied().collect();
        assert_eq!(labels, ["语文", "数学", "英语", "物理", "化学", "生物"]);
        assert_eq!(
            stats.subject_series["数学"],
            vec![140.0, 98.0, 72.0, 120.0, 64.0, 125.0]
        );
    }

    #[test]
    fn top10_is_ranked_with_tie_breaks() {
        let records = vec![
            record("b", [100.0, 100.0, 100.0, 50.0, 50.0, 50.0]),
            record("a", [100.0, 100.0, 100.0, 50.0, 50.0, 50.0]),
            record("c", [110.0, 90.0, 100.0, 50.0, 50.0, 50.0]),
            record("d", [150.0, 150.0, 150.0, 100.0, 100.0, 100.0]),
        ];
        let stats = build_stats(&records, &StatsConfig::default());
        let names: Vec<&str> = stats.top10.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["d", "c", "a", "b"]);

        let many: Vec<ScoreRecord> = (0..15_i32)
            .map(|i| record_with_total(&format!("s{i:02}"), 300.0 + f64::from(i) * 10.0))
            .collect();
        let stats = build_stats(&many, &StatsConfig::default());
        assert_eq!(stats.top10.len(), 10);
        assert_eq!(stats.top10[0].name, "s14");
    }

    #[test]
    fn empty_snapshot_is_degenerate_but_complete() {
        let stats = build_stats(&[], &StatsConfig::default());
        assert_eq!(stats.count, 0);
        assert_eq!(stats.avg_total, 0.0);
        assert_eq!(stats.max_total, 0.0);
        assert_eq!(stats.excellent_rate, 0.0);
        assert!(stats.histogram.is_empty());
        assert!(stats.segments.is_empty());
        assert!(stats.scatter.is_empty());
        assert!(stats.top10.is_empty());
        assert_eq!(stats.correlations.len(), 36);
        assert!(stats
            .correlations
            .iter()
            .all(|c| c.value == if c.x == c.y { 1.0 } else { 0.0 }));
    }

    #[test]
    fn json_uses_flat_camel_case_fields() {
        let stats = build_stats(&roster(), &StatsConfig::default());
        let value = serde_json::to_value(&stats).unwrap();
        for key in [
            "count",
            "avgTotal",
            "maxTotal",
            "minTotal",
            "excellentRate",
            "qualifiedRate",
            "histogram",
            "segments",
            "subjectAverages",
            "subjectSeries",
            "boxPlots",
            "scatter",
            "correlations",
            "top10",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert!(value["boxPlots"][0].get("median").is_some());
        assert!(value["top10"][0].get("total").is_some());
    }

    #[test]
    fn repeated_runs_are_byte_identical() {
        let records = roster();
        let config = StatsConfig::default();
        let first = serde_json::to_string(&build_stats(&records, &config)).unwrap();
        let second = serde_json::to_string(&build_stats(&records, &config)).unwrap();
        assert_eq!(first, second);
    }
}
