//! Tests for store creation and schema constraints

use ctm_common::db::init::init_database;
use ctm_common::db::{courses, credit_rows, curricula, RowKind, SEMESTERS};
use ctm_common::db::courses::NewCourse;
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("real.sqlite3");

    let result = init_database(&db_path).await;
    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("example.sqlite3");

    let pool1 = init_database(&db_path).await.unwrap();
    {
        let mut conn = pool1.acquire().await.unwrap();
        curricula::insert(&mut conn, "B.Eng", "", "").await.unwrap();
    }
    pool1.close().await;

    let pool2 = init_database(&db_path).await.unwrap();
    let mut conn = pool2.acquire().await.unwrap();
    let all = curricula::list(&mut conn).await.unwrap();
    assert_eq!(all.len(), 1, "Existing data must survive re-initialization");
}

#[tokio::test]
async fn test_single_free_row_enforced() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("real.sqlite3")).await.unwrap();
    let mut conn = pool.acquire().await.unwrap();

    let cid = curricula::insert(&mut conn, "B.Sc", "", "").await.unwrap();
    let zero = [0i64; SEMESTERS];
    credit_rows::insert(&mut conn, cid, RowKind::Free, "Free Electives", &zero, 0)
        .await
        .unwrap();
    let second = credit_rows::insert(&mut conn, cid, RowKind::Free, "Free Electives", &zero, 0).await;
    assert!(second.is_err(), "A second free row must be rejected by the schema");
}

#[tokio::test]
async fn test_deleting_credit_row_unlinks_courses() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("real.sqlite3")).await.unwrap();
    let mut conn = pool.acquire().await.unwrap();

    let cid = curricula::insert(&mut conn, "B.Sc", "", "").await.unwrap();
    let row = credit_rows::insert(&mut conn, cid, RowKind::Core, "Basic Engineering", &[0; SEMESTERS], 1)
        .await
        .unwrap();
    let course_id = courses::insert(
        &mut conn,
        &NewCourse {
            curriculum_id: cid,
            credit_row_id: Some(row),
            course_code: "EN101".to_string(),
            course_name: "Statics".to_string(),
            credits: 3,
            semester: 1,
            ..Default::default()
        },
    )
    .await
    .unwrap();

    credit_rows::delete_all(&mut conn, cid).await.unwrap();

    let course = courses::require(&mut conn, cid, course_id).await.unwrap();
    assert_eq!(course.credit_row_id, None);
}
