//! CSV and JSON interchange for the roster.

use std::collections::HashSet;
use std::io;

use anyhow::Context;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::error::RecordError;
use crate::models::{NewStudent, ScoreRecord, Subject, StudentPayload};

/// Body of a JSON import: `{"students": [...], "replace": true}`.
#[derive(Debug, Deserialize)]
struct ImportDocument {
    students: Vec<serde_json::Value>,
    #[serde(default = "default_replace")]
    replace: bool,
}

fn default_replace() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct Snapshot {
    students: Vec<ScoreRecord>,
}

/// Validates rows in order, reporting the first failure with its 1-based
/// position. Names must be unique within the batch.
pub fn validate_rows<I>(rows: I) -> Result<Vec<NewStudent>, RecordError>
where
    I: IntoIterator<Item = Result<StudentPayload, String>>,
{
    let mut seen = HashSet::new();
    let mut students = Vec::new();

    for (offset, row) in rows.into_iter().enumerate() {
        let index = offset + 1;
        let invalid = |reason: String| RecordError::InvalidRow { index, reason };

        let payload = row.map_err(invalid)?;
        let student = payload.validate().map_err(|err| invalid(err.to_string()))?;
        if !seen.insert(student.name.clone()) {
            return Err(invalid(
                RecordError::DuplicateName(student.name).to_string(),
            ));
        }
        students.push(student);
    }

    Ok(students)
}

/// Reads `name,chinese,math,english,physics,chemistry,biology` rows.
pub fn read_csv<R: io::Read>(reader: R) -> Result<Vec<NewStudent>, RecordError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let rows = reader
        .deserialize::<StudentPayload>()
        .map(|row| row.map_err(|err| err.to_string()))
        .collect::<Vec<_>>();
    validate_rows(rows)
}

/// Parses a JSON import document, returning the students and whether they
/// replace the current roster.
pub fn read_json(text: &str) -> anyhow::Result<(Vec<NewStudent>, bool)> {
    let document: ImportDocument =
        serde_json::from_str(text).context("import must be an object with a `students` array")?;
    let rows = document.students.into_iter().map(|value| {
        serde_json::from_value::<StudentPayload>(value).map_err(|err| err.to_string())
    });
    Ok((validate_rows(rows)?, document.replace))
}

/// Loads a roster snapshot previously written by [`export_json`], checking
/// every score against the subject catalog.
pub fn read_snapshot(text: &str) -> anyhow::Result<Vec<ScoreRecord>> {
    let snapshot: Snapshot = serde_json::from_str(text).context("malformed roster snapshot")?;
    for (offset, record) in snapshot.students.iter().enumerate() {
        for subject in Subject::ALL {
            subject
                .validate_score(record.score(subject))
                .map_err(|err| RecordError::InvalidRow {
                    index: offset + 1,
                    reason: err.to_string(),
                })?;
        }
    }
    Ok(snapshot.students)
}

/// Writes the ranked roster with Chinese column headers and a 1-based rank.
pub fn write_csv<W: io::Write>(writer: W, records: &[ScoreRecord]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(writer);

    let mut header = vec!["排名", "姓名"];
    header.extend(Subject::ALL.iter().map(|subject| subject.label()));
    header.push("总分");
    writer.write_record(&header)?;

    for (rank, record) in records.iter().enumerate() {
        let mut row = vec![(rank + 1).to_string(), record.name.clone()];
        row.extend(
            Subject::ALL
                .iter()
                .map(|&subject| record.score(subject).to_string()),
        );
        row.push(record.total().to_string());
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

pub fn export_json(records: &[ScoreRecord]) -> serde_json::Value {
    json!({
        "students": records,
        "count": records.len(),
        "exportedAt": Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubjectScores;
    use uuid::Uuid;

    const CSV: &str = "\
name,chinese,math,english,physics,chemistry,biology
赵雪,120,131,118,88,90,85
孙阳, 99.5 ,101,97,66,70,72
";

    #[test]
    fn csv_rows_are_parsed_and_trimmed() {
        let students = read_csv(CSV.as_bytes()).unwrap();
        assert_eq!(students.len(), 2);
        assert_eq!(students[1].name, "孙阳");
        assert_eq!(students[1].scores.chinese, 99.5);
        assert_eq!(students[0].scores.total(), 632.0);
    }

    #[test]
    fn csv_errors_carry_row_index() {
        let text = "name,chinese,math,english,physics,chemistry,biology\n\
                    赵雪,120,131,118,88,90,85\n\
                    孙阳,99,101,97,166,70,72\n";
        match read_csv(text.as_bytes()) {
            Err(RecordError::InvalidRow { index, reason }) => {
                assert_eq!(index, 2);
                assert!(reason.contains("物理"), "{reason}");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn json_import_defaults_to_replace_and_rejects_duplicates() {
        let (students, replace) = read_json(
            r#"{"students": [{"name": "高远", "chinese": 100, "math": 100, "english": 100,
                "physics": 80, "chemistry": 80, "biology": 80}]}"#,
        )
        .unwrap();
        assert!(replace);
        assert_eq!(students[0].scores.total(), 540.0);

        let duplicate = r#"{"replace": false, "students": [
            {"name": "高远", "chinese": 1, "math": 1, "english": 1, "physics": 1, "chemistry": 1, "biology": 1},
            {"name": "高远", "chinese": 2, "math": 2, "english": 2, "physics": 2, "chemistry": 2, "biology": 2}
        ]}"#;
        let err = read_json(duplicate).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RecordError>(),
            Some(RecordError::InvalidRow { index: 2, .. })
        ));
    }

    #[test]
    fn json_import_requires_students_array() {
        assert!(read_json(r#"{"students": "nope"}"#).is_err());
        let err = read_json(r#"{"students": [{"name": "x", "chinese": "a lot"}]}"#).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RecordError>(),
            Some(RecordError::InvalidRow { index: 1, .. })
        ));
    }

    #[test]
    fn export_round_trips_through_snapshot_reader() {
        let records = vec![ScoreRecord {
            id: Uuid::new_v4(),
            name: "曹文".to_string(),
            scores: SubjectScores::from_array([110.0, 120.0, 130.0, 70.0, 80.0, 90.0]),
        }];
        let exported = export_json(&records);
        assert_eq!(exported["count"], 1);
        assert_eq!(exported["students"][0]["total"], 600.0);
        let back = read_snapshot(&exported.to_string()).unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn csv_export_has_rank_and_total() {
        let records = vec![ScoreRecord {
            id: Uuid::new_v4(),
            name: "曹文".to_string(),
            scores: SubjectScores::from_array([110.0, 120.5, 130.0, 70.0, 80.0, 90.0]),
        }];
        let mut out = Vec::new();
        write_csv(&mut out, &records).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("排名,姓名,语文,数学,英语,物理,化学,生物,总分")
        );
        assert_eq!(lines.next(), Some("1,曹文,110,120.5,130,70,80,90,600.5"));
    }
}
