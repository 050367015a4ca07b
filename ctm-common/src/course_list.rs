//! Course list and study plan saves
//!
//! A course list is the set of courses of one semester under one credit row,
//! or the free electives of one semester. Saves upsert by course code within
//! that scope and delete codes that are no longer posted.

use crate::codes::{KsecCodeSet, KsecType, PloTagSet};
use crate::db::courses::{self, NewCourse};
use crate::db::{check_semester, credit_rows, curricula, Course, FREE_ELECTIVE_CATEGORY};
use crate::{Error, Result};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Path segment naming the free-electives scope
pub const FREE_ELECTIVE_SEGMENT: &str = "free_elective";

/// Which courses a course list covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseScope {
    Row(i64),
    FreeElective,
}

impl FromStr for CourseScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == FREE_ELECTIVE_SEGMENT {
            return Ok(CourseScope::FreeElective);
        }
        s.parse()
            .map(CourseScope::Row)
            .map_err(|_| Error::not_found(format!("Course list '{}'", s)))
    }
}

impl fmt::Display for CourseScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CourseScope::Row(id) => write!(f, "{}", id),
            CourseScope::FreeElective => f.write_str(FREE_ELECTIVE_SEGMENT),
        }
    }
}

/// One validated line of a course-list form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseLine {
    pub course_code: String,
    pub course_name: String,
    pub credits: i64,
    pub plo: PloTagSet,
}

/// Validate the parallel lists posted by the course-list form
///
/// Lines with an empty code are skipped; when every code is empty the whole
/// submission is rejected. Missing trailing entries count as empty.
pub fn parse_lines(
    codes: &[String],
    names: &[String],
    credits: &[String],
    plos: &[String],
) -> Result<Vec<CourseLine>> {
    let field = |list: &[String], i: usize| list.get(i).map(|s| s.trim().to_string()).unwrap_or_default();

    let mut lines = Vec::new();
    for (i, code) in codes.iter().enumerate() {
        let code = code.trim();
        if code.is_empty() {
            continue;
        }
        let credit_text = field(credits, i);
        let credit = if credit_text.is_empty() {
            0
        } else {
            credit_text
                .parse()
                .map_err(|_| Error::invalid(format!("Credits of {} must be a number", code)))?
        };
        lines.push(CourseLine {
            course_code: code.to_string(),
            course_name: field(names, i),
            credits: credit,
            plo: PloTagSet::parse(&field(plos, i))?,
        });
    }

    if lines.is_empty() {
        return Err(Error::invalid("No course code provided"));
    }
    Ok(lines)
}

/// Counts reported after a course-list save
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CourseListOutcome {
    pub updated: usize,
    pub created: usize,
    pub deleted: usize,
}

/// Courses currently in a scope
pub async fn list_scope(
    conn: &mut SqliteConnection,
    curriculum_id: i64,
    scope: CourseScope,
    semester: i64,
) -> Result<Vec<Course>> {
    match scope {
        CourseScope::Row(row_id) => courses::list_for_row(conn, curriculum_id, row_id, semester).await,
        CourseScope::FreeElective => courses::list_free_electives(conn, curriculum_id, semester).await,
    }
}

async fn check_scope(conn: &mut SqliteConnection, curriculum_id: i64, scope: CourseScope) -> Result<()> {
    curricula::require(conn, curriculum_id).await?;
    if let CourseScope::Row(row_id) = scope {
        credit_rows::require(conn, curriculum_id, row_id).await?;
    }
    Ok(())
}

/// Upsert the posted lines by code and delete codes no longer posted
pub async fn save_course_list(
    editable: &SqlitePool,
    curriculum_id: i64,
    scope: CourseScope,
    semester: i64,
    lines: &[CourseLine],
) -> Result<CourseListOutcome> {
    let semester = check_semester(semester)?;
    let mut tx = editable.begin().await?;
    check_scope(&mut tx, curriculum_id, scope).await?;

    let existing: HashMap<String, Course> = list_scope(&mut tx, curriculum_id, scope, semester)
        .await?
        .into_iter()
        .map(|c| (c.course_code.trim().to_string(), c))
        .collect();

    let mut outcome = CourseListOutcome::default();
    let mut posted: Vec<&str> = Vec::with_capacity(lines.len());

    for line in lines {
        if posted.contains(&line.course_code.as_str()) {
            continue;
        }
        posted.push(&line.course_code);
        let plo = line.plo.to_string();
        match existing.get(&line.course_code) {
            Some(course) => {
                courses::update_listing(&mut tx, course.id, &line.course_name, line.credits, &plo).await?;
                outcome.updated += 1;
            }
            None => {
                let (credit_row_id, category) = match scope {
                    CourseScope::Row(row_id) => (Some(row_id), String::new()),
                    CourseScope::FreeElective => (None, FREE_ELECTIVE_CATEGORY.to_string()),
                };
                courses::insert(
                    &mut tx,
                    &NewCourse {
                        curriculum_id,
                        credit_row_id,
                        course_code: line.course_code.clone(),
                        course_name: line.course_name.clone(),
                        credits: line.credits,
                        semester,
                        plo,
                        category,
                    },
                )
                .await?;
                outcome.created += 1;
            }
        }
    }

    for (code, course) in &existing {
        if !posted.contains(&code.as_str()) {
            courses::delete(&mut tx, course.id).await?;
            outcome.deleted += 1;
        }
    }

    curricula::bump_revision(&mut tx, curriculum_id).await?;
    tx.commit().await?;

    info!(
        "Saved course list {} semester {} of curriculum {}: {:?}",
        scope, semester, curriculum_id, outcome
    );
    Ok(outcome)
}

/// Delete every course of a scope
pub async fn reset_course_list(
    editable: &SqlitePool,
    curriculum_id: i64,
    scope: CourseScope,
    semester: i64,
) -> Result<usize> {
    let semester = check_semester(semester)?;
    let mut tx = editable.begin().await?;
    check_scope(&mut tx, curriculum_id, scope).await?;

    let doomed = list_scope(&mut tx, curriculum_id, scope, semester).await?;
    for course in &doomed {
        courses::delete(&mut tx, course.id).await?;
    }
    curricula::bump_revision(&mut tx, curriculum_id).await?;
    tx.commit().await?;

    info!(
        "Reset course list {} semester {} of curriculum {}: {} deleted",
        scope,
        semester,
        curriculum_id,
        doomed.len()
    );
    Ok(doomed.len())
}

/// Validated K/S/E/C selections of one course
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseKsec {
    pub course_id: i64,
    pub knowledge: KsecCodeSet,
    pub skills: KsecCodeSet,
    pub ethics: KsecCodeSet,
    pub character: KsecCodeSet,
}

impl CourseKsec {
    /// Parse the four posted code lists of a course
    pub fn parse(course_id: i64, k: &str, s: &str, e: &str, c: &str) -> Result<Self> {
        Ok(Self {
            course_id,
            knowledge: KsecCodeSet::parse(KsecType::Knowledge, k)?,
            skills: KsecCodeSet::parse(KsecType::Skills, s)?,
            ethics: KsecCodeSet::parse(KsecType::Ethics, e)?,
            character: KsecCodeSet::parse(KsecType::Character, c)?,
        })
    }
}

/// Store the K/S/E/C selections of a semester's courses in one transaction
///
/// Courses outside the curriculum or semester are ignored.
pub async fn save_study_plan(
    editable: &SqlitePool,
    curriculum_id: i64,
    semester: i64,
    updates: &[CourseKsec],
) -> Result<usize> {
    let semester = check_semester(semester)?;
    let mut tx = editable.begin().await?;
    curricula::require(&mut tx, curriculum_id).await?;

    let course_ids: Vec<i64> = courses::list_semester(&mut tx, curriculum_id, semester)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();

    let mut saved = 0;
    for update in updates.iter().filter(|u| course_ids.contains(&u.course_id)) {
        courses::update_ksec(
            &mut tx,
            update.course_id,
            &update.knowledge.to_string(),
            &update.skills.to_string(),
            &update.ethics.to_string(),
            &update.character.to_string(),
        )
        .await?;
        saved += 1;
    }

    curricula::bump_revision(&mut tx, curriculum_id).await?;
    tx.commit().await?;

    info!("Saved study plan semester {} of curriculum {}: {} courses", semester, curriculum_id, saved);
    Ok(saved)
}
