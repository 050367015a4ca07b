//! CLO and CLO summary queries

use super::models::{Clo, CloSummary};
use crate::Result;
use sqlx::SqliteConnection;

const CLO_COLUMNS: &str = "id, course_id, clo_index, clo, bloom, k, s, e, c";
const SUMMARY_COLUMNS: &str = "id, course_id, bloom_score, k_percent, s_percent, e_percent, c_percent";

/// A CLO line as submitted from the editor, before it has an id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewClo {
    pub clo: String,
    pub bloom: String,
    pub k: String,
    pub s: String,
    pub e: String,
    pub c: String,
}

impl From<&Clo> for NewClo {
    fn from(clo: &Clo) -> Self {
        NewClo {
            clo: clo.clo.clone(),
            bloom: clo.bloom.clone(),
            k: clo.k.clone(),
            s: clo.s.clone(),
            e: clo.e.clone(),
            c: clo.c.clone(),
        }
    }
}

/// Summary figures computed from a course's CLOs
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SummaryFigures {
    pub bloom_score: i64,
    pub k_percent: f64,
    pub s_percent: f64,
    pub e_percent: f64,
    pub c_percent: f64,
}

pub async fn list_for_course(conn: &mut SqliteConnection, course_id: i64) -> Result<Vec<Clo>> {
    let rows = sqlx::query_as::<_, Clo>(&format!(
        "SELECT {} FROM clos WHERE course_id = ? ORDER BY clo_index, id",
        CLO_COLUMNS
    ))
    .bind(course_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// Every CLO belonging to a course of the curriculum
pub async fn list_for_curriculum(conn: &mut SqliteConnection, curriculum_id: i64) -> Result<Vec<Clo>> {
    let rows = sqlx::query_as::<_, Clo>(
        r#"
        SELECT clos.id, clos.course_id, clos.clo_index, clos.clo, clos.bloom,
               clos.k, clos.s, clos.e, clos.c
        FROM clos JOIN courses ON courses.id = clos.course_id
        WHERE courses.curriculum_id = ?
        ORDER BY clos.course_id, clos.clo_index, clos.id
        "#,
    )
    .bind(curriculum_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

pub async fn insert(
    conn: &mut SqliteConnection,
    course_id: i64,
    clo_index: i64,
    clo: &NewClo,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO clos (course_id, clo_index, clo, bloom, k, s, e, c) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(course_id)
    .bind(clo_index)
    .bind(&clo.clo)
    .bind(&clo.bloom)
    .bind(&clo.k)
    .bind(&clo.s)
    .bind(&clo.e)
    .bind(&clo.c)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn insert_with_id(conn: &mut SqliteConnection, clo: &Clo) -> Result<()> {
    sqlx::query(&format!(
        "INSERT INTO clos ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        CLO_COLUMNS
    ))
    .bind(clo.id)
    .bind(clo.course_id)
    .bind(clo.clo_index)
    .bind(&clo.clo)
    .bind(&clo.bloom)
    .bind(&clo.k)
    .bind(&clo.s)
    .bind(&clo.e)
    .bind(&clo.c)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn delete_for_course(conn: &mut SqliteConnection, course_id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM clos WHERE course_id = ?")
        .bind(course_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete_for_curriculum(conn: &mut SqliteConnection, curriculum_id: i64) -> Result<u64> {
    let result = sqlx::query(
        "DELETE FROM clos WHERE course_id IN (SELECT id FROM courses WHERE curriculum_id = ?)",
    )
    .bind(curriculum_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn get_summary(conn: &mut SqliteConnection, course_id: i64) -> Result<Option<CloSummary>> {
    let row = sqlx::query_as::<_, CloSummary>(&format!(
        "SELECT {} FROM clo_summaries WHERE course_id = ?",
        SUMMARY_COLUMNS
    ))
    .bind(course_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

pub async fn list_summaries(conn: &mut SqliteConnection, curriculum_id: i64) -> Result<Vec<CloSummary>> {
    let rows = sqlx::query_as::<_, CloSummary>(
        r#"
        SELECT s.id, s.course_id, s.bloom_score, s.k_percent, s.s_percent, s.e_percent, s.c_percent
        FROM clo_summaries s JOIN courses ON courses.id = s.course_id
        WHERE courses.curriculum_id = ?
        ORDER BY s.course_id
        "#,
    )
    .bind(curriculum_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// Drop any existing summary of the course and insert a fresh one
pub async fn replace_summary(
    conn: &mut SqliteConnection,
    course_id: i64,
    figures: &SummaryFigures,
) -> Result<i64> {
    delete_summary(conn, course_id).await?;
    let result = sqlx::query(
        "INSERT INTO clo_summaries (course_id, bloom_score, k_percent, s_percent, e_percent, c_percent) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(course_id)
    .bind(figures.bloom_score)
    .bind(figures.k_percent)
    .bind(figures.s_percent)
    .bind(figures.e_percent)
    .bind(figures.c_percent)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn insert_summary_with_id(conn: &mut SqliteConnection, summary: &CloSummary) -> Result<()> {
    sqlx::query(&format!(
        "INSERT INTO clo_summaries ({}) VALUES (?, ?, ?, ?, ?, ?, ?)",
        SUMMARY_COLUMNS
    ))
    .bind(summary.id)
    .bind(summary.course_id)
    .bind(summary.bloom_score)
    .bind(summary.k_percent)
    .bind(summary.s_percent)
    .bind(summary.e_percent)
    .bind(summary.c_percent)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn delete_summary(conn: &mut SqliteConnection, course_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM clo_summaries WHERE course_id = ?")
        .bind(course_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn delete_summaries_for_curriculum(
    conn: &mut SqliteConnection,
    curriculum_id: i64,
) -> Result<u64> {
    let result = sqlx::query(
        "DELETE FROM clo_summaries WHERE course_id IN (SELECT id FROM courses WHERE curriculum_id = ?)",
    )
    .bind(curriculum_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}
