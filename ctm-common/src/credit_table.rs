//! Credit table bulk save and reset
//!
//! A credit-table form submission is parsed into a [`CreditTableSubmission`]
//! and applied to the editable store in one transaction.
//!
//! Field names:
//! - `<kind>_id_<i>`, `<kind>_name_<i>`, `<kind>_credit_<i>_<j>` for posted rows
//! - `<kind>_name_new_<i>`, `<kind>_credit_new_<i>_<j>` for appended rows
//! - `<kind>_remove_<i>` to leave a posted row out of the submission
//! - `<kind>_order_<row_id>` for general/core positions
//! - `free_credit_<j>` for the free-electives row
//! - `curriculum_name` for an optional rename
//!
//! `<kind>` is `general`, `core` or `plo` and `j` runs over the 8 semesters
//! (0-based).

use crate::aggregate::{prune_ylo, recompute_plo_totals};
use crate::db::{clos, courses, credit_rows, curricula, ksec, ylo, RowKind, FREE_ELECTIVES_NAME, SEMESTERS};
use crate::password::hash_password;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::{BTreeMap, HashMap};
use tracing::info;

static FIELD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(general|core|plo)_(id|name|credit|order|remove)_(new_)?(\d+)(?:_(\d+))?$")
        .expect("static regex")
});

static FREE_CREDIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^free_credit_(\d+)$").expect("static regex"));

const DEFAULT_GENERAL_ROWS: [&str; 7] = [
    "Language",
    "Social Sciences",
    "Humanities",
    "Physical Education & Recreation",
    "Science",
    "Mathematics & Computer",
    "Integration",
];

const DEFAULT_CORE_ROWS: [&str; 5] = [
    "Basic Science & Mathematics",
    "Basic Engineering",
    "Compulsory Professional Courses",
    "Elective Professional Courses",
    "Professional Experience Enhancement",
];

const DEFAULT_PLO_ROW: &str = "PLO1:";

/// One row of the credit table as posted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSubmission {
    /// Id of the existing row, absent for new rows
    pub id: Option<i64>,
    pub name: String,
    pub credits: [i64; SEMESTERS],
}

/// Parsed credit-table form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreditTableSubmission {
    pub curriculum_name: Option<String>,
    /// Posted rows per kind, in form index order
    pub rows: HashMap<RowKind, Vec<RowSubmission>>,
    /// Rows from the `_new_` fields, always appended
    pub new_rows: HashMap<RowKind, Vec<RowSubmission>>,
    /// `(kind, row id, sort_order)` for general and core rows
    pub orders: Vec<(RowKind, i64, i64)>,
    pub free_credits: [i64; SEMESTERS],
}

#[derive(Default)]
struct RawRow {
    id: Option<i64>,
    name: Option<String>,
    removed: bool,
    credits: [i64; SEMESTERS],
}

fn parse_number(field: &str, value: &str) -> Result<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    trimmed
        .parse()
        .map_err(|_| Error::invalid(format!("'{}' is not a number (field {})", trimmed, field)))
}

fn semester_slot(field: &str, slot: Option<&str>) -> Result<usize> {
    let index: usize = slot
        .ok_or_else(|| Error::invalid(format!("Field {} has no semester index", field)))?
        .parse()
        .map_err(|_| Error::invalid(format!("Bad semester index in {}", field)))?;
    if index >= SEMESTERS {
        return Err(Error::invalid(format!("Semester index out of range in {}", field)));
    }
    Ok(index)
}

impl CreditTableSubmission {
    /// Parse url-decoded form fields
    ///
    /// Unknown fields are ignored. A non-numeric credit, id or order value is
    /// [`Error::InvalidInput`].
    pub fn from_fields<'a>(fields: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self> {
        let mut submission = Self::default();
        // (kind, is_new, index) -> row; BTreeMap keeps the form index order
        let mut raw: BTreeMap<(RowKind, bool, u64), RawRow> = BTreeMap::new();

        for (key, value) in fields {
            if key == "curriculum_name" {
                let name = value.trim();
                if !name.is_empty() {
                    submission.curriculum_name = Some(name.to_string());
                }
                continue;
            }

            if let Some(caps) = FREE_CREDIT_RE.captures(key) {
                let slot = semester_slot(key, Some(&caps[1]))?;
                submission.free_credits[slot] = parse_number(key, value)?;
                continue;
            }

            let Some(caps) = FIELD_RE.captures(key) else {
                continue;
            };
            let kind: RowKind = caps[1].parse()?;
            let field = &caps[2];
            let is_new = caps.get(3).is_some();
            let index: u64 = caps[4]
                .parse()
                .map_err(|_| Error::invalid(format!("Bad row index in {}", key)))?;
            let slot = caps.get(5).map(|m| m.as_str());

            match (field, is_new) {
                ("order", false) => {
                    if matches!(kind, RowKind::General | RowKind::Core) && !value.trim().is_empty() {
                        submission
                            .orders
                            .push((kind, index as i64, parse_number(key, value)?));
                    }
                }
                ("id", false) => {
                    if !value.trim().is_empty() {
                        raw.entry((kind, false, index)).or_default().id =
                            Some(parse_number(key, value)?);
                    }
                }
                ("remove", false) => {
                    if !value.trim().is_empty() {
                        raw.entry((kind, false, index)).or_default().removed = true;
                    }
                }
                ("name", _) => {
                    raw.entry((kind, is_new, index)).or_default().name = Some(value.trim().to_string());
                }
                ("credit", _) => {
                    let slot = semester_slot(key, slot)?;
                    raw.entry((kind, is_new, index)).or_default().credits[slot] =
                        parse_number(key, value)?;
                }
                _ => {}
            }
        }

        for ((kind, is_new, _), row) in raw.into_iter().filter(|(_, row)| !row.removed) {
            let target = if is_new {
                &mut submission.new_rows
            } else {
                &mut submission.rows
            };
            target.entry(kind).or_default().push(RowSubmission {
                id: row.id,
                name: row.name.unwrap_or_default(),
                credits: row.credits,
            });
        }

        Ok(submission)
    }

    /// Ids of the rows posted for one kind
    ///
    /// `None` when no id of the kind was posted, in which case no row of that
    /// kind is deleted. A posted row with a cleared name still counts as kept.
    pub fn posted_ids(&self, kind: RowKind) -> Option<Vec<i64>> {
        let ids: Vec<i64> = self
            .rows
            .get(&kind)
            .into_iter()
            .flatten()
            .filter_map(|r| r.id)
            .collect();
        (!ids.is_empty()).then_some(ids)
    }
}

/// Counts reported after a bulk save
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveOutcome {
    pub renamed: bool,
    pub deleted_rows: u64,
    pub updated_rows: usize,
    pub created_rows: usize,
    pub pruned_ylo: u64,
    pub revision: i64,
}

/// Apply a credit-table submission to the editable store in one transaction
pub async fn apply(
    editable: &SqlitePool,
    curriculum_id: i64,
    submission: &CreditTableSubmission,
) -> Result<SaveOutcome> {
    let mut tx = editable.begin().await?;
    let outcome = apply_in(&mut tx, curriculum_id, submission).await?;
    tx.commit().await?;

    info!(
        "Saved credit table of curriculum {}: {} updated, {} created, {} deleted, {} YLO pruned",
        curriculum_id,
        outcome.updated_rows,
        outcome.created_rows,
        outcome.deleted_rows,
        outcome.pruned_ylo
    );
    Ok(outcome)
}

async fn apply_in(
    conn: &mut SqliteConnection,
    curriculum_id: i64,
    submission: &CreditTableSubmission,
) -> Result<SaveOutcome> {
    let curriculum = curricula::require(conn, curriculum_id).await?;
    let mut outcome = SaveOutcome::default();

    if let Some(name) = &submission.curriculum_name {
        if *name != curriculum.name {
            curricula::rename(conn, curriculum_id, name).await?;
            outcome.renamed = true;
        }
    }

    for kind in RowKind::EDITABLE {
        if let Some(kept) = submission.posted_ids(kind) {
            outcome.deleted_rows +=
                credit_rows::delete_kind_except(conn, curriculum_id, kind, &kept).await?;
        }
    }

    for kind in RowKind::EDITABLE {
        for row in submission.rows.get(&kind).into_iter().flatten() {
            if row.name.is_empty() {
                continue;
            }
            match row.id {
                Some(id) => {
                    if credit_rows::update(conn, curriculum_id, kind, id, &row.name, &row.credits).await? {
                        outcome.updated_rows += 1;
                    }
                }
                None => {
                    append_row(conn, curriculum_id, kind, row).await?;
                    outcome.created_rows += 1;
                }
            }
        }
    }

    for kind in RowKind::EDITABLE {
        for row in submission.new_rows.get(&kind).into_iter().flatten() {
            if row.name.is_empty() {
                continue;
            }
            append_row(conn, curriculum_id, kind, row).await?;
            outcome.created_rows += 1;
        }
    }

    for (kind, id, order) in &submission.orders {
        credit_rows::set_sort_order(conn, curriculum_id, *kind, *id, *order).await?;
    }

    credit_rows::upsert_free(conn, curriculum_id, &submission.free_credits).await?;

    recompute_plo_totals(conn, curriculum_id).await?;
    outcome.pruned_ylo = prune_ylo(conn, curriculum_id).await?;
    outcome.revision = curricula::bump_revision(conn, curriculum_id).await?;

    Ok(outcome)
}

async fn append_row(
    conn: &mut SqliteConnection,
    curriculum_id: i64,
    kind: RowKind,
    row: &RowSubmission,
) -> Result<i64> {
    let count = credit_rows::count_kind(conn, curriculum_id, kind).await?;
    credit_rows::insert(conn, curriculum_id, kind, &row.name, &row.credits, count + 1).await
}

/// Insert the default credit rows of a fresh curriculum
pub async fn seed_default_rows(conn: &mut SqliteConnection, curriculum_id: i64) -> Result<()> {
    let zero = [0i64; SEMESTERS];
    for (i, name) in DEFAULT_GENERAL_ROWS.iter().enumerate() {
        credit_rows::insert(conn, curriculum_id, RowKind::General, name, &zero, i as i64 + 1).await?;
    }
    for (i, name) in DEFAULT_CORE_ROWS.iter().enumerate() {
        credit_rows::insert(conn, curriculum_id, RowKind::Core, name, &zero, i as i64 + 1).await?;
    }
    credit_rows::insert(conn, curriculum_id, RowKind::Plo, DEFAULT_PLO_ROW, &zero, 1).await?;
    credit_rows::insert(conn, curriculum_id, RowKind::Free, FREE_ELECTIVES_NAME, &zero, 0).await?;
    Ok(())
}

/// Wipe every dependent row of a curriculum in the editable store and seed defaults
pub async fn reset_curriculum(editable: &SqlitePool, curriculum_id: i64) -> Result<()> {
    let mut tx = editable.begin().await?;
    curricula::require(&mut tx, curriculum_id).await?;

    clos::delete_summaries_for_curriculum(&mut tx, curriculum_id).await?;
    clos::delete_for_curriculum(&mut tx, curriculum_id).await?;
    courses::delete_all(&mut tx, curriculum_id).await?;
    ylo::delete_all(&mut tx, curriculum_id).await?;
    ksec::delete_all(&mut tx, curriculum_id).await?;
    credit_rows::delete_all(&mut tx, curriculum_id).await?;

    seed_default_rows(&mut tx, curriculum_id).await?;
    curricula::bump_revision(&mut tx, curriculum_id).await?;
    tx.commit().await?;

    info!("Reset curriculum {} to the default credit table", curriculum_id);
    Ok(())
}

// Empty secrets are stored empty rather than hashed
fn stored_secret(password: &str) -> Result<String> {
    if password.trim().is_empty() {
        Ok(String::new())
    } else {
        hash_password(password.trim())
    }
}

/// Create a curriculum with hashed passwords and the default credit table
pub async fn create_curriculum(
    editable: &SqlitePool,
    name: &str,
    edit_password: &str,
    clo_edit_password: &str,
) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::invalid("Curriculum name must not be empty"));
    }
    let edit_secret = stored_secret(edit_password)?;
    let clo_secret = stored_secret(clo_edit_password)?;
    let mut tx = editable.begin().await?;
    let id = curricula::insert(&mut tx, name, &edit_secret, &clo_secret).await?;
    seed_default_rows(&mut tx, id).await?;
    tx.commit().await?;

    info!("Created curriculum {} '{}'", id, name);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rows_and_new_rows() {
        let fields = vec![
            ("curriculum_name", " B.Eng "),
            ("general_id_0", "5"),
            ("general_name_0", "Language"),
            ("general_credit_0_0", "3"),
            ("general_credit_0_7", ""),
            ("general_name_new_0", "Extra"),
            ("general_credit_new_0_2", "2"),
            ("core_order_9", "4"),
            ("free_credit_1", "6"),
            ("submit", "Save"),
        ];
        let sub = CreditTableSubmission::from_fields(fields).unwrap();

        assert_eq!(sub.curriculum_name.as_deref(), Some("B.Eng"));
        let general = &sub.rows[&RowKind::General];
        assert_eq!(general.len(), 1);
        assert_eq!(general[0].id, Some(5));
        assert_eq!(general[0].credits[0], 3);
        assert_eq!(sub.new_rows[&RowKind::General][0].credits[2], 2);
        assert_eq!(sub.orders, vec![(RowKind::Core, 9, 4)]);
        assert_eq!(sub.free_credits[1], 6);
        assert_eq!(sub.posted_ids(RowKind::General), Some(vec![5]));
        assert_eq!(sub.posted_ids(RowKind::Plo), None);
    }

    #[test]
    fn test_cleared_name_is_still_kept() {
        let fields = vec![
            ("core_id_0", "3"),
            ("core_name_0", " "),
            ("core_id_1", "4"),
            ("core_name_1", "Basic Engineering"),
        ];
        let sub = CreditTableSubmission::from_fields(fields).unwrap();
        assert_eq!(sub.posted_ids(RowKind::Core), Some(vec![3, 4]));
    }

    #[test]
    fn test_rows_without_ids_keep_everything() {
        let fields = vec![("plo_name_0", "PLO3: New")];
        let sub = CreditTableSubmission::from_fields(fields).unwrap();
        assert_eq!(sub.rows[&RowKind::Plo].len(), 1);
        assert_eq!(sub.posted_ids(RowKind::Plo), None);
    }

    #[test]
    fn test_removed_row_is_left_out() {
        let fields = vec![
            ("general_id_0", "5"),
            ("general_name_0", "Language"),
            ("general_remove_0", "on"),
            ("general_id_1", "6"),
            ("general_name_1", "Science"),
        ];
        let sub = CreditTableSubmission::from_fields(fields).unwrap();
        assert_eq!(sub.rows[&RowKind::General].len(), 1);
        assert_eq!(sub.posted_ids(RowKind::General), Some(vec![6]));
    }

    #[test]
    fn test_non_numeric_credit_rejected() {
        let fields = vec![("plo_name_0", "PLO1"), ("plo_credit_0_3", "three")];
        let err = CreditTableSubmission::from_fields(fields).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_semester_index_out_of_range() {
        let fields = vec![("core_name_0", "X"), ("core_credit_0_8", "1")];
        assert!(CreditTableSubmission::from_fields(fields).is_err());
    }
}
