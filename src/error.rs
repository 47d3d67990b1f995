use thiserror::Error;
use uuid::Uuid;

use crate::models::Subject;

/// Rejections raised while validating roster input or mutating the store.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("unknown subject `{0}`, expected one of 语文/数学/英语/物理/化学/生物 or their codes")]
    UnknownSubject(String),
    #[error("{label} score must be within 0-{max}, got {value}", label = .subject.label(), max = .subject.max_score())]
    ScoreOutOfRange { subject: Subject, value: f64 },
    #[error("{label} score must be a finite number", label = .0.label())]
    NonFiniteScore(Subject),
    #[error("missing score for {label} ({code})", label = .0.label(), code = .0.code())]
    MissingScore(Subject),
    #[error("student name must not be empty")]
    EmptyName,
    #[error("student `{0}` already exists")]
    DuplicateName(String),
    #[error("record {index}: {reason}")]
    InvalidRow { index: usize, reason: String },
    #[error("student {0} not found")]
    NotFound(Uuid),
}
