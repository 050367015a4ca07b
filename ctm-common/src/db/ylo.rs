//! Year Learning Outcome text per (PLO, semester)

use super::models::YloEntry;
use crate::Result;
use sqlx::SqliteConnection;

const COLUMNS: &str = "id, curriculum_id, plo, semester, summary_text";

pub async fn list(conn: &mut SqliteConnection, curriculum_id: i64) -> Result<Vec<YloEntry>> {
    let rows = sqlx::query_as::<_, YloEntry>(&format!(
        "SELECT {} FROM ylo_per_plo_semester WHERE curriculum_id = ? ORDER BY semester, plo",
        COLUMNS
    ))
    .bind(curriculum_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// Entries of one semester ordered by PLO tag
pub async fn list_semester(
    conn: &mut SqliteConnection,
    curriculum_id: i64,
    semester: i64,
) -> Result<Vec<YloEntry>> {
    let rows = sqlx::query_as::<_, YloEntry>(&format!(
        "SELECT {} FROM ylo_per_plo_semester WHERE curriculum_id = ? AND semester = ? ORDER BY plo",
        COLUMNS
    ))
    .bind(curriculum_id)
    .bind(semester)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

pub async fn get(
    conn: &mut SqliteConnection,
    curriculum_id: i64,
    plo: &str,
    semester: i64,
) -> Result<Option<YloEntry>> {
    let row = sqlx::query_as::<_, YloEntry>(&format!(
        "SELECT {} FROM ylo_per_plo_semester WHERE curriculum_id = ? AND plo = ? AND semester = ?",
        COLUMNS
    ))
    .bind(curriculum_id)
    .bind(plo)
    .bind(semester)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

pub async fn upsert(
    conn: &mut SqliteConnection,
    curriculum_id: i64,
    plo: &str,
    semester: i64,
    summary_text: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO ylo_per_plo_semester (curriculum_id, plo, semester, summary_text)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(curriculum_id, plo, semester) DO UPDATE SET summary_text = excluded.summary_text
        "#,
    )
    .bind(curriculum_id)
    .bind(plo)
    .bind(semester)
    .bind(summary_text)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn insert_with_id(conn: &mut SqliteConnection, entry: &YloEntry) -> Result<()> {
    sqlx::query(&format!(
        "INSERT INTO ylo_per_plo_semester ({}) VALUES (?, ?, ?, ?, ?)",
        COLUMNS
    ))
    .bind(entry.id)
    .bind(entry.curriculum_id)
    .bind(&entry.plo)
    .bind(entry.semester)
    .bind(&entry.summary_text)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM ylo_per_plo_semester WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn delete_all(conn: &mut SqliteConnection, curriculum_id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM ylo_per_plo_semester WHERE curriculum_id = ?")
        .bind(curriculum_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}
