use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::error::RecordError;

/// Highest reachable total across all six subjects.
pub const TOTAL_MAX: f64 = 750.0;

/// The fixed catalog of examined subjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Chinese,
    Math,
    English,
    Physics,
    Chemistry,
    Biology,
}

impl Subject {
    /// Catalog order, used for every per-subject output.
    pub const ALL: [Subject; 6] = [
        Subject::Chinese,
        Subject::Math,
        Subject::English,
        Subject::Physics,
        Subject::Chemistry,
        Subject::Biology,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Subject::Chinese => "chinese",
            Subject::Math => "math",
            Subject::English => "english",
            Subject::Physics => "physics",
            Subject::Chemistry => "chemistry",
            Subject::Biology => "biology",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Subject::Chinese => "语文",
            Subject::Math => "数学",
            Subject::English => "英语",
            Subject::Physics => "物理",
            Subject::Chemistry => "化学",
            Subject::Biology => "生物",
        }
    }

    pub fn max_score(self) -> f64 {
        match self {
            Subject::Chinese | Subject::Math | Subject::English => 150.0,
            Subject::Physics | Subject::Chemistry | Subject::Biology => 100.0,
        }
    }

    /// Checks a raw score against this subject's range.
    pub fn validate_score(self, value: f64) -> Result<f64, RecordError> {
        if !value.is_finite() {
            return Err(RecordError::NonFiniteScore(self));
        }
        if !(0.0..=self.max_score()).contains(&value) {
            return Err(RecordError::ScoreOutOfRange {
                subject: self,
                value,
            });
        }
        Ok(value)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Accepts either the subject code (`math`) or its label (`数学`).
impl FromStr for Subject {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Subject::ALL
            .into_iter()
            .find(|subject| subject.code() == needle || subject.label() == needle)
            .ok_or_else(|| RecordError::UnknownSubject(needle.to_string()))
    }
}

/// The six raw subject scores of one student.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SubjectScores {
    pub chinese: f64,
    pub math: f64,
    pub english: f64,
    pub physics: f64,
    pub chemistry: f64,
    pub biology: f64,
}

impl SubjectScores {
    pub fn from_array(values: [f64; 6]) -> Self {
        let [chinese, math, english, physics, chemistry, biology] = values;
        Self {
            chinese,
            math,
            english,
            physics,
            chemistry,
            biology,
        }
    }

    pub fn get(&self, subject: Subject) -> f64 {
        match subject {
            Subject::Chinese => self.chinese,
            Subject::Math => self.math,
            Subject::English => self.english,
            Subject::Physics => self.physics,
            Subject::Chemistry => self.chemistry,
            Subject::Biology => self.biology,
        }
    }

    pub fn set(&mut self, subject: Subject, value: f64) {
        let slot = match subject {
            Subject::Chinese => &mut self.chinese,
            Subject::Math => &mut self.math,
            Subject::English => &mut self.english,
            Subject::Physics => &mut self.physics,
            Subject::Chemistry => &mut self.chemistry,
            Subject::Biology => &mut self.biology,
        };
        *slot = value;
    }

    pub fn total(&self) -> f64 {
        Subject::ALL.iter().map(|&subject| self.get(subject)).sum()
    }
}

/// A stored student together with their scores.
///
/// The total is never kept as a field: it is always derived from the six
/// subject scores, so patching a subject cannot leave a stale total behind.
/// A `total` key in deserialized input is ignored and recomputed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoreRecord {
    pub id: Uuid,
    pub name: String,
    #[serde(flatten)]
    pub scores: SubjectScores,
}

impl ScoreRecord {
    pub fn total(&self) -> f64 {
        self.scores.total()
    }

    pub fn score(&self, subject: Subject) -> f64 {
        self.scores.get(subject)
    }
}

impl Serialize for ScoreRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct View<'a> {
            id: Uuid,
            name: &'a str,
            #[serde(flatten)]
            scores: &'a SubjectScores,
            total: f64,
        }

        View {
            id: self.id,
            name: &self.name,
            scores: &self.scores,
            total: self.total(),
        }
        .serialize(serializer)
    }
}

/// A validated student ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStudent {
    pub name: String,
    pub scores: SubjectScores,
}

/// Untrusted student input as it arrives from JSON or CSV.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentPayload {
    #[serde(default)]
    pub name: String,
    pub chinese: Option<f64>,
    pub math: Option<f64>,
    pub english: Option<f64>,
    pub physics: Option<f64>,
    pub chemistry: Option<f64>,
    pub biology: Option<f64>,
}

impl StudentPayload {
    fn raw(&self, subject: Subject) -> Option<f64> {
        match subject {
            Subject::Chinese => self.chinese,
            Subject::Math => self.math,
            Subject::English => self.english,
            Subject::Physics => self.physics,
            Subject::Chemistry => self.chemistry,
            Subject::Biology => self.biology,
        }
    }

    /// Trims the name and checks all six scores against the catalog.
    pub fn validate(&self) -> Result<NewStudent, RecordError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(RecordError::EmptyName);
        }

        let mut scores = SubjectScores::default();
        for subject in Subject::ALL {
            let value = self
                .raw(subject)
                .ok_or(RecordError::MissingScore(subject))?;
            scores.set(subject, subject.validate_score(value)?);
        }

        Ok(NewStudent {
            name: name.to_string(),
            scores,
        })
    }
}

/// Keyword and total-range filter applied before aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsFilter {
    pub keyword: String,
    pub min_total: f64,
    pub max_total: f64,
}

impl Default for StatsFilter {
    fn default() -> Self {
        Self {
            keyword: String::new(),
            min_total: 0.0,
            max_total: TOTAL_MAX,
        }
    }
}

impl StatsFilter {
    pub fn new(keyword: Option<&str>, min_total: Option<f64>, max_total: Option<f64>) -> Self {
        Self {
            keyword: keyword.unwrap_or_default().to_string(),
            min_total: min_total.unwrap_or(0.0),
            max_total: max_total.unwrap_or(TOTAL_MAX),
        }
        .normalized()
    }

    /// Trims the keyword, clamps both bounds to `[0, TOTAL_MAX]` and swaps
    /// them when given in the wrong order. A NaN bound falls back to its
    /// default.
    pub fn normalized(self) -> Self {
        let clamp = |value: f64, fallback: f64| {
            if value.is_nan() {
                fallback
            } else {
                value.clamp(0.0, TOTAL_MAX)
            }
        };
        let mut min_total = clamp(self.min_total, 0.0);
        let mut max_total = clamp(self.max_total, TOTAL_MAX);
        if min_total > max_total {
            std::mem::swap(&mut min_total, &mut max_total);
        }
        Self {
            keyword: self.keyword.trim().to_string(),
            min_total,
            max_total,
        }
    }

    pub fn matches(&self, record: &ScoreRecord) -> bool {
        let total = record.total();
        (self.keyword.is_empty() || record.name.contains(&self.keyword))
            && total >= self.min_total
            && total <= self.max_total
    }

    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if !self.keyword.is_empty() {
            parts.push(format!("name contains \"{}\"", self.keyword));
        }
        if self.min_total > 0.0 || self.max_total < TOTAL_MAX {
            parts.push(format!("total {}-{}", self.min_total, self.max_total));
        }
        if parts.is_empty() {
            "all students".to_string()
        } else {
            parts.join(", ")
        }
    }
}
