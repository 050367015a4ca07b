//! Database initialization
//!
//! Both copies of the record store share one schema. Tables are created with
//! `CREATE TABLE IF NOT EXISTS`, so opening an existing store is a no-op.
//! Primary keys use `AUTOINCREMENT` so ids handed out by the editable store are
//! never reused, which keeps explicit key copies between the stores
//! collision-free.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Open (creating if needed) a store file and apply the schema
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every table and index (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_curricula_table(pool).await?;
    create_credit_rows_table(pool).await?;
    create_courses_table(pool).await?;
    create_ksec_items_table(pool).await?;
    create_clos_table(pool).await?;
    create_clo_summaries_table(pool).await?;
    create_ylo_table(pool).await?;
    Ok(())
}

async fn create_curricula_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS curricula (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            edit_password TEXT NOT NULL DEFAULT '',
            clo_edit_password TEXT NOT NULL DEFAULT '',
            revision INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_credit_rows_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS credit_rows (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            curriculum_id INTEGER NOT NULL REFERENCES curricula(id),
            row_kind TEXT NOT NULL CHECK (row_kind IN ('general', 'core', 'plo', 'free')),
            name TEXT NOT NULL,
            credits_sem1 INTEGER NOT NULL DEFAULT 0,
            credits_sem2 INTEGER NOT NULL DEFAULT 0,
            credits_sem3 INTEGER NOT NULL DEFAULT 0,
            credits_sem4 INTEGER NOT NULL DEFAULT 0,
            credits_sem5 INTEGER NOT NULL DEFAULT 0,
            credits_sem6 INTEGER NOT NULL DEFAULT 0,
            credits_sem7 INTEGER NOT NULL DEFAULT 0,
            credits_sem8 INTEGER NOT NULL DEFAULT 0,
            sort_order INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    // At most one free-electives row per curriculum
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_credit_rows_single_free
        ON credit_rows(curriculum_id) WHERE row_kind = 'free'
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_credit_rows_curriculum ON credit_rows(curriculum_id, row_kind)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_courses_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS courses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            curriculum_id INTEGER NOT NULL REFERENCES curricula(id),
            credit_row_id INTEGER REFERENCES credit_rows(id) ON DELETE SET NULL,
            course_code TEXT NOT NULL,
            course_name TEXT NOT NULL DEFAULT '',
            credits INTEGER NOT NULL DEFAULT 0,
            semester INTEGER NOT NULL CHECK (semester BETWEEN 1 AND 8),
            plo TEXT NOT NULL DEFAULT '',
            category TEXT NOT NULL DEFAULT '',
            knowledge TEXT NOT NULL DEFAULT '',
            skills TEXT NOT NULL DEFAULT '',
            ethics TEXT NOT NULL DEFAULT '',
            character TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_courses_curriculum_semester ON courses(curriculum_id, semester)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_ksec_items_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ksec_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            curriculum_id INTEGER NOT NULL REFERENCES curricula(id),
            semester INTEGER NOT NULL DEFAULT 0,
            ksec_type TEXT NOT NULL CHECK (ksec_type IN ('K', 'S', 'E', 'C')),
            category_type TEXT NOT NULL CHECK (category_type IN ('GE', 'CE')),
            description TEXT NOT NULL DEFAULT '',
            sort_order INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_clos_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS clos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            course_id INTEGER NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
            clo_index INTEGER NOT NULL,
            clo TEXT NOT NULL DEFAULT '',
            bloom TEXT NOT NULL DEFAULT '',
            k TEXT NOT NULL DEFAULT '',
            s TEXT NOT NULL DEFAULT '',
            e TEXT NOT NULL DEFAULT '',
            c TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_clo_summaries_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS clo_summaries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            course_id INTEGER NOT NULL UNIQUE REFERENCES courses(id) ON DELETE CASCADE,
            bloom_score INTEGER NOT NULL DEFAULT 0,
            k_percent REAL NOT NULL DEFAULT 0,
            s_percent REAL NOT NULL DEFAULT 0,
            e_percent REAL NOT NULL DEFAULT 0,
            c_percent REAL NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_ylo_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ylo_per_plo_semester (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            curriculum_id INTEGER NOT NULL REFERENCES curricula(id),
            plo TEXT NOT NULL,
            semester INTEGER NOT NULL,
            summary_text TEXT NOT NULL DEFAULT '',
            UNIQUE (curriculum_id, plo, semester)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
