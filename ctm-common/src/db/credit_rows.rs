//! Credit table row queries

use super::models::{CreditRow, RowKind, FREE_ELECTIVES_NAME, SEMESTERS};
use crate::{Error, Result};
use sqlx::SqliteConnection;

const COLUMNS: &str = "id, curriculum_id, row_kind, name, \
    credits_sem1, credits_sem2, credits_sem3, credits_sem4, \
    credits_sem5, credits_sem6, credits_sem7, credits_sem8, sort_order";

/// All rows of a curriculum, grouped by kind then position
pub async fn list(conn: &mut SqliteConnection, curriculum_id: i64) -> Result<Vec<CreditRow>> {
    let rows = sqlx::query_as::<_, CreditRow>(&format!(
        "SELECT {} FROM credit_rows WHERE curriculum_id = ? ORDER BY row_kind, sort_order, id",
        COLUMNS
    ))
    .bind(curriculum_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

pub async fn list_kind(
    conn: &mut SqliteConnection,
    curriculum_id: i64,
    kind: RowKind,
) -> Result<Vec<CreditRow>> {
    let rows = sqlx::query_as::<_, CreditRow>(&format!(
        "SELECT {} FROM credit_rows WHERE curriculum_id = ? AND row_kind = ? ORDER BY sort_order, id",
        COLUMNS
    ))
    .bind(curriculum_id)
    .bind(kind.as_str())
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

pub async fn get(
    conn: &mut SqliteConnection,
    curriculum_id: i64,
    id: i64,
) -> Result<Option<CreditRow>> {
    let row = sqlx::query_as::<_, CreditRow>(&format!(
        "SELECT {} FROM credit_rows WHERE curriculum_id = ? AND id = ?",
        COLUMNS
    ))
    .bind(curriculum_id)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

pub async fn require(conn: &mut SqliteConnection, curriculum_id: i64, id: i64) -> Result<CreditRow> {
    get(conn, curriculum_id, id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Credit row {}", id)))
}

pub async fn count_kind(
    conn: &mut SqliteConnection,
    curriculum_id: i64,
    kind: RowKind,
) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM credit_rows WHERE curriculum_id = ? AND row_kind = ?")
            .bind(curriculum_id)
            .bind(kind.as_str())
            .fetch_one(&mut *conn)
            .await?;
    Ok(count)
}

/// Insert a row with a fresh id
pub async fn insert(
    conn: &mut SqliteConnection,
    curriculum_id: i64,
    kind: RowKind,
    name: &str,
    credits: &[i64; SEMESTERS],
    sort_order: i64,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO credit_rows (
            curriculum_id, row_kind, name,
            credits_sem1, credits_sem2, credits_sem3, credits_sem4,
            credits_sem5, credits_sem6, credits_sem7, credits_sem8, sort_order
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(curriculum_id)
    .bind(kind.as_str())
    .bind(name)
    .bind(credits[0])
    .bind(credits[1])
    .bind(credits[2])
    .bind(credits[3])
    .bind(credits[4])
    .bind(credits[5])
    .bind(credits[6])
    .bind(credits[7])
    .bind(sort_order)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Insert a row keeping its id
pub async fn insert_with_id(conn: &mut SqliteConnection, row: &CreditRow) -> Result<()> {
    sqlx::query(&format!(
        "INSERT INTO credit_rows ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        COLUMNS
    ))
    .bind(row.id)
    .bind(row.curriculum_id)
    .bind(row.row_kind.as_str())
    .bind(&row.name)
    .bind(row.credits[0])
    .bind(row.credits[1])
    .bind(row.credits[2])
    .bind(row.credits[3])
    .bind(row.credits[4])
    .bind(row.credits[5])
    .bind(row.credits[6])
    .bind(row.credits[7])
    .bind(row.sort_order)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Update name and credits of a row of the given kind; false if no such row
pub async fn update(
    conn: &mut SqliteConnection,
    curriculum_id: i64,
    kind: RowKind,
    id: i64,
    name: &str,
    credits: &[i64; SEMESTERS],
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE credit_rows SET
            name = ?,
            credits_sem1 = ?, credits_sem2 = ?, credits_sem3 = ?, credits_sem4 = ?,
            credits_sem5 = ?, credits_sem6 = ?, credits_sem7 = ?, credits_sem8 = ?
        WHERE id = ? AND curriculum_id = ? AND row_kind = ?
        "#,
    )
    .bind(name)
    .bind(credits[0])
    .bind(credits[1])
    .bind(credits[2])
    .bind(credits[3])
    .bind(credits[4])
    .bind(credits[5])
    .bind(credits[6])
    .bind(credits[7])
    .bind(id)
    .bind(curriculum_id)
    .bind(kind.as_str())
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_name(conn: &mut SqliteConnection, id: i64, name: &str) -> Result<()> {
    sqlx::query("UPDATE credit_rows SET name = ? WHERE id = ?")
        .bind(name)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn set_credits(
    conn: &mut SqliteConnection,
    id: i64,
    credits: &[i64; SEMESTERS],
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE credit_rows SET
            credits_sem1 = ?, credits_sem2 = ?, credits_sem3 = ?, credits_sem4 = ?,
            credits_sem5 = ?, credits_sem6 = ?, credits_sem7 = ?, credits_sem8 = ?
        WHERE id = ?
        "#,
    )
    .bind(credits[0])
    .bind(credits[1])
    .bind(credits[2])
    .bind(credits[3])
    .bind(credits[4])
    .bind(credits[5])
    .bind(credits[6])
    .bind(credits[7])
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn set_sort_order(
    conn: &mut SqliteConnection,
    curriculum_id: i64,
    kind: RowKind,
    id: i64,
    sort_order: i64,
) -> Result<()> {
    sqlx::query("UPDATE credit_rows SET sort_order = ? WHERE id = ? AND curriculum_id = ? AND row_kind = ?")
        .bind(sort_order)
        .bind(id)
        .bind(curriculum_id)
        .bind(kind.as_str())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Delete rows of `kind` whose id is not in `keep`; returns the number deleted
pub async fn delete_kind_except(
    conn: &mut SqliteConnection,
    curriculum_id: i64,
    kind: RowKind,
    keep: &[i64],
) -> Result<u64> {
    let mut deleted = 0;
    for row in list_kind(conn, curriculum_id, kind).await? {
        if !keep.contains(&row.id) {
            deleted += sqlx::query("DELETE FROM credit_rows WHERE id = ?")
                .bind(row.id)
                .execute(&mut *conn)
                .await?
                .rows_affected();
        }
    }
    Ok(deleted)
}

/// Insert or update the single free-electives row of a curriculum
pub async fn upsert_free(
    conn: &mut SqliteConnection,
    curriculum_id: i64,
    credits: &[i64; SEMESTERS],
) -> Result<i64> {
    let existing = list_kind(conn, curriculum_id, RowKind::Free).await?;
    match existing.first() {
        Some(row) => {
            set_credits(conn, row.id, credits).await?;
            Ok(row.id)
        }
        None => insert(conn, curriculum_id, RowKind::Free, FREE_ELECTIVES_NAME, credits, 0).await,
    }
}

pub async fn delete_all(conn: &mut SqliteConnection, curriculum_id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM credit_rows WHERE curriculum_id = ?")
        .bind(curriculum_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}
