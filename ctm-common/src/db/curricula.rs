//! Curriculum queries

use super::models::Curriculum;
use crate::{Error, Result};
use sqlx::SqliteConnection;

const COLUMNS: &str = "id, name, edit_password, clo_edit_password, revision";

pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Curriculum>> {
    let rows = sqlx::query_as::<_, Curriculum>(&format!(
        "SELECT {} FROM curricula ORDER BY id",
        COLUMNS
    ))
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Option<Curriculum>> {
    let row = sqlx::query_as::<_, Curriculum>(&format!(
        "SELECT {} FROM curricula WHERE id = ?",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

/// Like [`get`], but a missing curriculum is [`Error::NotFound`]
pub async fn require(conn: &mut SqliteConnection, id: i64) -> Result<Curriculum> {
    get(conn, id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Curriculum {}", id)))
}

/// Insert a new curriculum; passwords must already be hashed
pub async fn insert(
    conn: &mut SqliteConnection,
    name: &str,
    edit_password: &str,
    clo_edit_password: &str,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO curricula (name, edit_password, clo_edit_password, revision) VALUES (?, ?, ?, 0)",
    )
    .bind(name)
    .bind(edit_password)
    .bind(clo_edit_password)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Insert a curriculum keeping its id
pub async fn insert_with_id(conn: &mut SqliteConnection, curriculum: &Curriculum) -> Result<()> {
    sqlx::query(&format!(
        "INSERT INTO curricula ({}) VALUES (?, ?, ?, ?, ?)",
        COLUMNS
    ))
    .bind(curriculum.id)
    .bind(&curriculum.name)
    .bind(&curriculum.edit_password)
    .bind(&curriculum.clo_edit_password)
    .bind(curriculum.revision)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Insert or update-in-place by id
pub async fn upsert(conn: &mut SqliteConnection, curriculum: &Curriculum) -> Result<()> {
    sqlx::query(&format!(
        r#"
        INSERT INTO curricula ({}) VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            edit_password = excluded.edit_password,
            clo_edit_password = excluded.clo_edit_password,
            revision = excluded.revision
        "#,
        COLUMNS
    ))
    .bind(curriculum.id)
    .bind(&curriculum.name)
    .bind(&curriculum.edit_password)
    .bind(&curriculum.clo_edit_password)
    .bind(curriculum.revision)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn rename(conn: &mut SqliteConnection, id: i64, name: &str) -> Result<()> {
    sqlx::query("UPDATE curricula SET name = ? WHERE id = ?")
        .bind(name)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn set_passwords(
    conn: &mut SqliteConnection,
    id: i64,
    edit_password: &str,
    clo_edit_password: &str,
) -> Result<()> {
    let result =
        sqlx::query("UPDATE curricula SET edit_password = ?, clo_edit_password = ? WHERE id = ?")
            .bind(edit_password)
            .bind(clo_edit_password)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found(format!("Curriculum {}", id)));
    }
    Ok(())
}

/// Increment the revision counter, returning the new value
pub async fn bump_revision(conn: &mut SqliteConnection, id: i64) -> Result<i64> {
    let revision: Option<i64> =
        sqlx::query_scalar("UPDATE curricula SET revision = revision + 1 WHERE id = ? RETURNING revision")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
    revision.ok_or_else(|| Error::not_found(format!("Curriculum {}", id)))
}

pub async fn set_revision(conn: &mut SqliteConnection, id: i64, revision: i64) -> Result<()> {
    sqlx::query("UPDATE curricula SET revision = ? WHERE id = ?")
        .bind(revision)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM curricula WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
