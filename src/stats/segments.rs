use serde::Serialize;

use crate::config::Thresholds;
use crate::models::ScoreRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub label: &'static str,
    pub count: usize,
}

/// Named score tiers, listed in presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Excellent,
    Good,
    Pass,
    Fail,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Excellent, Tier::Good, Tier::Pass, Tier::Fail];

    pub fn label(self) -> &'static str {
        match self {
            Tier::Excellent => "优秀",
            Tier::Good => "良好",
            Tier::Pass => "及格",
            Tier::Fail => "不及格",
        }
    }

    /// Excellent is `[excellent, 750]`; every lower tier is closed-open up
    /// to the next boundary. Totals outside `[0, 750]` fall into the nearest
    /// end tier.
    pub fn classify(total: f64, thresholds: &Thresholds) -> Tier {
        if total >= thresholds.excellent() {
            Tier::Excellent
        } else if total >= thresholds.good() {
            Tier::Good
        } else if total >= thresholds.qualified() {
            Tier::Pass
        } else {
            Tier::Fail
        }
    }
}

pub fn segments(records: &[ScoreRecord], thresholds: &Thresholds) -> Vec<Segment> {
    if records.is_empty() {
        return vec![];
    }

    let mut counts = [0usize; Tier::ALL.len()];
    for record in records {
        let tier = Tier::classify(record.total(), thresholds);
        counts[tier as usize] += 1;
    }

    Tier::ALL
        .iter()
        .zip(counts)
        .map(|(tier, count)| Segment {
            label: tier.label(),
            count,
        })
        .collect()
}
