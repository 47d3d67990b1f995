use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::models::{ScoreRecord, Subject};

/// One scatter-plot point. Projected subjects serialize under their codes,
/// so the default projection reads `{name, math, english, total}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterPoint {
    pub name: String,
    pub dims: Vec<(Subject, f64)>,
    pub total: f64,
}

impl Serialize for ScatterPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.dims.len() + 2))?;
        map.serialize_entry("name", &self.name)?;
        for (subject, value) in &self.dims {
            map.serialize_entry(subject.code(), value)?;
        }
        map.serialize_entry("total", &self.total)?;
        map.end()
    }
}

pub fn scatter(records: &[ScoreRecord], dims: &[Subject]) -> Vec<ScatterPoint> {
    records
        .iter()
        .map(|record| ScatterPoint {
            name: record.name.clone(),
            dims: dims.iter().map(|&s| (s, record.score(s))).collect(),
            total: record.total(),
        })
        .collect()
}
