//! K/S/E/C catalogue queries
//!
//! Items are shared across semesters: the stored semester is always 0.

use super::models::KsecItem;
use crate::codes::{KsecCategory, KsecCode, KsecType};
use crate::{Error, Result};
use sqlx::SqliteConnection;

const COLUMNS: &str = "id, curriculum_id, semester, ksec_type, category_type, description, sort_order";

/// All items of a curriculum
pub async fn list(conn: &mut SqliteConnection, curriculum_id: i64) -> Result<Vec<KsecItem>> {
    let rows = sqlx::query_as::<_, KsecItem>(&format!(
        "SELECT {} FROM ksec_items WHERE curriculum_id = ? \
         ORDER BY ksec_type, category_type DESC, sort_order, id",
        COLUMNS
    ))
    .bind(curriculum_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// Items of one type, general-education group first
pub async fn list_type(
    conn: &mut SqliteConnection,
    curriculum_id: i64,
    ksec_type: KsecType,
) -> Result<Vec<KsecItem>> {
    let rows = sqlx::query_as::<_, KsecItem>(&format!(
        "SELECT {} FROM ksec_items WHERE curriculum_id = ? AND ksec_type = ? \
         ORDER BY category_type DESC, sort_order, id",
        COLUMNS
    ))
    .bind(curriculum_id)
    .bind(ksec_type.letter())
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// Derived codes and descriptions for one type
pub async fn catalogue(
    conn: &mut SqliteConnection,
    curriculum_id: i64,
    ksec_type: KsecType,
) -> Result<Vec<(KsecCode, String)>> {
    Ok(list_type(conn, curriculum_id, ksec_type)
        .await?
        .into_iter()
        .filter_map(|item| item.code().map(|code| (code, item.description.trim().to_string())))
        .collect())
}

pub async fn get(
    conn: &mut SqliteConnection,
    curriculum_id: i64,
    id: i64,
) -> Result<Option<KsecItem>> {
    let row = sqlx::query_as::<_, KsecItem>(&format!(
        "SELECT {} FROM ksec_items WHERE curriculum_id = ? AND id = ?",
        COLUMNS
    ))
    .bind(curriculum_id)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

pub async fn insert(
    conn: &mut SqliteConnection,
    curriculum_id: i64,
    ksec_type: KsecType,
    category: KsecCategory,
    description: &str,
    sort_order: i64,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO ksec_items (curriculum_id, semester, ksec_type, category_type, description, sort_order) \
         VALUES (?, 0, ?, ?, ?, ?)",
    )
    .bind(curriculum_id)
    .bind(ksec_type.letter())
    .bind(category.as_str())
    .bind(description)
    .bind(sort_order)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Insert an item keeping its id; the semester is reset to 0
pub async fn insert_with_id(conn: &mut SqliteConnection, item: &KsecItem) -> Result<()> {
    sqlx::query(&format!(
        "INSERT INTO ksec_items ({}) VALUES (?, ?, 0, ?, ?, ?, ?)",
        COLUMNS
    ))
    .bind(item.id)
    .bind(item.curriculum_id)
    .bind(&item.ksec_type)
    .bind(&item.category_type)
    .bind(&item.description)
    .bind(item.sort_order)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn update(
    conn: &mut SqliteConnection,
    id: i64,
    category: KsecCategory,
    description: &str,
    sort_order: i64,
) -> Result<()> {
    sqlx::query("UPDATE ksec_items SET category_type = ?, description = ?, sort_order = ? WHERE id = ?")
        .bind(category.as_str())
        .bind(description)
        .bind(sort_order)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM ksec_items WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found(format!("K/S/E/C item {}", id)));
    }
    Ok(())
}

pub async fn delete_all(conn: &mut SqliteConnection, curriculum_id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM ksec_items WHERE curriculum_id = ?")
        .bind(curriculum_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}
