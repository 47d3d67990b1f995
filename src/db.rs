use anyhow::Context;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::error::RecordError;
use crate::models::{NewStudent, ScoreRecord, StatsFilter, Subject, SubjectScores};
use crate::seed;

const COLUMNS: &str = "id, name, chinese, math, english, physics, chemistry, biology";
const TOTAL_EXPR: &str = "(chinese + math + english + physics + chemistry + biology)";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Seeds the default roster when the table is empty. Returns whether it did.
pub async fn ensure_seeded(pool: &PgPool) -> anyhow::Result<bool> {
    let count: i64 = sqlx::query("SELECT COUNT(1) AS n FROM score_atlas.students")
        .fetch_one(pool)
        .await?
        .get("n");
    if count > 0 {
        return Ok(false);
    }
    seed(pool, seed::DEFAULT_COUNT, false).await?;
    Ok(true)
}

/// Inserts a freshly generated roster of `count` students (clamped to
/// 10-120), optionally wiping the existing one first.
pub async fn seed(pool: &PgPool, count: usize, clear_existing: bool) -> anyhow::Result<usize> {
    let roster = {
        let mut rng = rand::rng();
        seed::generate_roster(&mut rng, seed::clamp_count(count))
    };

    let mut tx = pool.begin().await?;
    if clear_existing {
        sqlx::query("DELETE FROM score_atlas.students")
            .execute(&mut *tx)
            .await?;
    }
    insert_all(&mut tx, &roster).await?;
    tx.commit().await?;

    tracing::info!(count = roster.len(), clear_existing, "seeded roster");
    Ok(roster.len())
}

/// Builds the roster query. Binds are `$1` min total, `$2` max total, then
/// the keyword and the limit when present.
pub fn fetch_query(filter: &StatsFilter, limit: Option<i64>) -> String {
    let mut query = format!(
        "SELECT {COLUMNS}, {TOTAL_EXPR} AS total \
         FROM score_atlas.students \
         WHERE {TOTAL_EXPR} BETWEEN $1 AND $2"
    );
    let mut next_bind = 3;

    if !filter.keyword.is_empty() {
        query.push_str(&format!(" AND strpos(name, ${next_bind}) > 0"));
        next_bind += 1;
    }

    query.push_str(" ORDER BY total DESC, chinese DESC, math DESC, english DESC, name ASC");

    if limit.is_some() {
        query.push_str(&format!(" LIMIT ${next_bind}"));
    }

    query
}

/// Fetches the filtered roster in rank order. The single statement gives
/// the consistent snapshot the statistics are computed from.
pub async fn fetch_students(
    pool: &PgPool,
    filter: &StatsFilter,
    limit: Option<i64>,
) -> anyhow::Result<Vec<ScoreRecord>> {
    let query = fetch_query(filter, limit);
    let mut rows = sqlx::query(&query)
        .bind(filter.min_total)
        .bind(filter.max_total);

    if !filter.keyword.is_empty() {
        rows = rows.bind(filter.keyword.as_str());
    }
    if let Some(value) = limit {
        rows = rows.bind(value.max(1));
    }

    let records = rows
        .fetch_all(pool)
        .await?
        .iter()
        .map(record_from_row)
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(count = records.len(), filter = %filter.describe(), "fetched roster");
    Ok(records)
}

pub async fn add_student(pool: &PgPool, student: &NewStudent) -> anyhow::Result<ScoreRecord> {
    let record = sqlx::query(&format!(
        "INSERT INTO score_atlas.students ({COLUMNS}) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(&student.name)
    .bind(student.scores.chinese)
    .bind(student.scores.math)
    .bind(student.scores.english)
    .bind(student.scores.physics)
    .bind(student.scores.chemistry)
    .bind(student.scores.biology)
    .fetch_one(pool)
    .await
    .map_err(|err| conflict_as_duplicate(err, &student.name))?;

    let record = record_from_row(&record)?;
    tracing::info!(id = %record.id, name = %record.name, "added student");
    Ok(record)
}

/// Updates one subject score. The total is derived, so it follows along.
pub async fn patch_subject(
    pool: &PgPool,
    id: Uuid,
    subject: Subject,
    score: f64,
) -> anyhow::Result<ScoreRecord> {
    let score = subject.validate_score(score)?;
    let row = sqlx::query(&format!(
        "UPDATE score_atlas.students SET {} = $1, updated_at = now() \
         WHERE id = $2 RETURNING {COLUMNS}",
        subject.code()
    ))
    .bind(score)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(RecordError::NotFound(id))?;

    let record = record_from_row(&row)?;
    tracing::info!(%id, subject = subject.code(), score, total = record.total(), "patched score");
    Ok(record)
}

pub async fn delete_student(pool: &PgPool, id: Uuid) -> anyhow::Result<()> {
    let result = sqlx::query("DELETE FROM score_atlas.students WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RecordError::NotFound(id).into());
    }
    tracing::info!(%id, "deleted student");
    Ok(())
}

/// Writes a validated batch in one transaction, replacing the roster when
/// asked. Either every row lands or none does.
pub async fn import_students(
    pool: &PgPool,
    students: &[NewStudent],
    replace: bool,
) -> anyhow::Result<usize> {
    let mut tx = pool.begin().await?;
    if replace {
        sqlx::query("DELETE FROM score_atlas.students")
            .execute(&mut *tx)
            .await?;
    }
    insert_all(&mut tx, students).await?;
    tx.commit().await.context("failed to commit import")?;

    tracing::info!(count = students.len(), replace, "imported students");
    Ok(students.len())
}

async fn insert_all(
    tx: &mut Transaction<'_, Postgres>,
    students: &[NewStudent],
) -> anyhow::Result<()> {
    for student in students {
        sqlx::query(&format!(
            "INSERT INTO score_atlas.students ({COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        ))
        .bind(Uuid::new_v4())
        .bind(&student.name)
        .bind(student.scores.chinese)
        .bind(student.scores.math)
        .bind(student.scores.english)
        .bind(student.scores.physics)
        .bind(student.scores.chemistry)
        .bind(student.scores.biology)
        .execute(&mut **tx)
        .await
        .map_err(|err| conflict_as_duplicate(err, &student.name))?;
    }
    Ok(())
}

fn record_from_row(row: &PgRow) -> Result<ScoreRecord, sqlx::Error> {
    Ok(ScoreRecord {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        scores: SubjectScores {
            chinese: row.try_get("chinese")?,
            math: row.try_get("math")?,
            english: row.try_get("english")?,
            physics: row.try_get("physics")?,
            chemistry: row.try_get("chemistry")?,
            biology: row.try_get("biology")?,
        },
    })
}

fn conflict_as_duplicate(err: sqlx::Error, name: &str) -> anyhow::Error {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            RecordError::DuplicateName(name.to_string()).into()
        }
        _ => err.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfiltered_query_binds_only_the_range() {
        let query = fetch_query(&StatsFilter::default(), None);
        assert!(query.contains("BETWEEN $1 AND $2"));
        assert!(!query.contains("$3"));
        assert!(!query.contains("LIMIT"));
        assert!(query.ends_with("name ASC"));
    }

    #[test]
    fn keyword_and_limit_take_the_next_binds() {
        let filter = StatsFilter::new(Some("王"), None, None);
        let query = fetch_query(&filter, Some(20));
        assert!(query.contains("strpos(name, $3) > 0"));
        assert!(query.ends_with("LIMIT $4"));

        let query = fetch_query(&StatsFilter::default(), Some(5));
        assert!(query.ends_with("LIMIT $3"));
    }
}
