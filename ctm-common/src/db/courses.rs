//! Course queries

use super::models::{Course, FREE_ELECTIVE_CATEGORY};
use crate::{Error, Result};
use sqlx::SqliteConnection;

const COLUMNS: &str = "id, curriculum_id, credit_row_id, course_code, course_name, credits, \
    semester, plo, category, knowledge, skills, ethics, character, description";

/// Fields supplied when creating a course from the course-list form
#[derive(Debug, Clone, Default)]
pub struct NewCourse {
    pub curriculum_id: i64,
    pub credit_row_id: Option<i64>,
    pub course_code: String,
    pub course_name: String,
    pub credits: i64,
    pub semester: i64,
    pub plo: String,
    pub category: String,
}

pub async fn list(conn: &mut SqliteConnection, curriculum_id: i64) -> Result<Vec<Course>> {
    let rows = sqlx::query_as::<_, Course>(&format!(
        "SELECT {} FROM courses WHERE curriculum_id = ? ORDER BY semester, course_code, id",
        COLUMNS
    ))
    .bind(curriculum_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

pub async fn list_semester(
    conn: &mut SqliteConnection,
    curriculum_id: i64,
    semester: i64,
) -> Result<Vec<Course>> {
    let rows = sqlx::query_as::<_, Course>(&format!(
        "SELECT {} FROM courses WHERE curriculum_id = ? AND semester = ? ORDER BY course_code, id",
        COLUMNS
    ))
    .bind(curriculum_id)
    .bind(semester)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// Courses listed under one credit row in one semester
pub async fn list_for_row(
    conn: &mut SqliteConnection,
    curriculum_id: i64,
    credit_row_id: i64,
    semester: i64,
) -> Result<Vec<Course>> {
    let rows = sqlx::query_as::<_, Course>(&format!(
        "SELECT {} FROM courses WHERE curriculum_id = ? AND credit_row_id = ? AND semester = ? \
         ORDER BY course_code, id",
        COLUMNS
    ))
    .bind(curriculum_id)
    .bind(credit_row_id)
    .bind(semester)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

pub async fn list_free_electives(
    conn: &mut SqliteConnection,
    curriculum_id: i64,
    semester: i64,
) -> Result<Vec<Course>> {
    let rows = sqlx::query_as::<_, Course>(&format!(
        "SELECT {} FROM courses WHERE curriculum_id = ? AND category = ? AND semester = ? \
         ORDER BY course_code, id",
        COLUMNS
    ))
    .bind(curriculum_id)
    .bind(FREE_ELECTIVE_CATEGORY)
    .bind(semester)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

pub async fn get(
    conn: &mut SqliteConnection,
    curriculum_id: i64,
    id: i64,
) -> Result<Option<Course>> {
    let row = sqlx::query_as::<_, Course>(&format!(
        "SELECT {} FROM courses WHERE curriculum_id = ? AND id = ?",
        COLUMNS
    ))
    .bind(curriculum_id)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

pub async fn require(conn: &mut SqliteConnection, curriculum_id: i64, id: i64) -> Result<Course> {
    get(conn, curriculum_id, id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Course {}", id)))
}

pub async fn insert(conn: &mut SqliteConnection, course: &NewCourse) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO courses (
            curriculum_id, credit_row_id, course_code, course_name, credits, semester, plo, category
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(course.curriculum_id)
    .bind(course.credit_row_id)
    .bind(&course.course_code)
    .bind(&course.course_name)
    .bind(course.credits)
    .bind(course.semester)
    .bind(&course.plo)
    .bind(&course.category)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Insert a course keeping its id
pub async fn insert_with_id(conn: &mut SqliteConnection, course: &Course) -> Result<()> {
    sqlx::query(&format!(
        "INSERT INTO courses ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        COLUMNS
    ))
    .bind(course.id)
    .bind(course.curriculum_id)
    .bind(course.credit_row_id)
    .bind(&course.course_code)
    .bind(&course.course_name)
    .bind(course.credits)
    .bind(course.semester)
    .bind(&course.plo)
    .bind(&course.category)
    .bind(&course.knowledge)
    .bind(&course.skills)
    .bind(&course.ethics)
    .bind(&course.character)
    .bind(&course.description)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Update the fields edited on the course-list page
pub async fn update_listing(
    conn: &mut SqliteConnection,
    id: i64,
    course_name: &str,
    credits: i64,
    plo: &str,
) -> Result<()> {
    sqlx::query("UPDATE courses SET course_name = ?, credits = ?, plo = ? WHERE id = ?")
        .bind(course_name)
        .bind(credits)
        .bind(plo)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Update the four K/S/E/C selections of a course
pub async fn update_ksec(
    conn: &mut SqliteConnection,
    id: i64,
    knowledge: &str,
    skills: &str,
    ethics: &str,
    character: &str,
) -> Result<()> {
    sqlx::query("UPDATE courses SET knowledge = ?, skills = ?, ethics = ?, character = ? WHERE id = ?")
        .bind(knowledge)
        .bind(skills)
        .bind(ethics)
        .bind(character)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn set_description(conn: &mut SqliteConnection, id: i64, description: &str) -> Result<()> {
    sqlx::query("UPDATE courses SET description = ? WHERE id = ?")
        .bind(description)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM courses WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn delete_all(conn: &mut SqliteConnection, curriculum_id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM courses WHERE curriculum_id = ?")
        .bind(curriculum_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}
