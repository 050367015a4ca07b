//! Shared fixtures for the integration tests

#![allow(dead_code)]

use ctm_common::db::courses::{self, NewCourse};
use ctm_common::db::{credit_rows, curricula, RowKind, SEMESTERS};
use ctm_common::Mirror;
use sqlx::SqliteConnection;
use tempfile::TempDir;

/// A mirror over two fresh stores in a temporary folder
pub async fn temp_mirror() -> (TempDir, Mirror) {
    let dir = TempDir::new().unwrap();
    let mirror = Mirror::open(
        &dir.path().join("real.sqlite3"),
        &dir.path().join("example.sqlite3"),
    )
    .await
    .unwrap();
    (dir, mirror)
}

pub async fn add_curriculum(conn: &mut SqliteConnection, name: &str) -> i64 {
    curricula::insert(conn, name, "", "").await.unwrap()
}

pub async fn add_row(conn: &mut SqliteConnection, cid: i64, kind: RowKind, name: &str) -> i64 {
    let order = credit_rows::count_kind(conn, cid, kind).await.unwrap() + 1;
    credit_rows::insert(conn, cid, kind, name, &[0; SEMESTERS], order)
        .await
        .unwrap()
}

pub async fn add_course(
    conn: &mut SqliteConnection,
    cid: i64,
    row: Option<i64>,
    code: &str,
    semester: i64,
    credits: i64,
    plo: &str,
) -> i64 {
    courses::insert(
        conn,
        &NewCourse {
            curriculum_id: cid,
            credit_row_id: row,
            course_code: code.to_string(),
            course_name: format!("{} name", code),
            credits,
            semester,
            plo: plo.to_string(),
            category: String::new(),
        },
    )
    .await
    .unwrap()
}
