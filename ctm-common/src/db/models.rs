//! Record models shared by both database copies

use crate::codes::{KsecCategory, KsecCode, KsecCodeSet, KsecType, PloTagSet};
use crate::{Error, Result};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use std::fmt;
use std::str::FromStr;

/// Number of semesters in a curriculum (4 years x 2 terms)
pub const SEMESTERS: usize = 8;

/// Category value marking a course as a free elective
pub const FREE_ELECTIVE_CATEGORY: &str = "free_elective";

/// Name of the single free-electives credit row
pub const FREE_ELECTIVES_NAME: &str = "Free Electives";

/// `"1/1"`, `"1/2"`, ... `"4/2"` for semesters 1..=8
pub fn semester_label(semester: i64) -> String {
    let year = (semester - 1) / 2 + 1;
    let term = if semester % 2 == 1 { 1 } else { 2 };
    format!("{}/{}", year, term)
}

/// Reject semesters outside 1..=8
pub fn check_semester(semester: i64) -> Result<i64> {
    if (1..=SEMESTERS as i64).contains(&semester) {
        Ok(semester)
    } else {
        Err(Error::invalid(format!("Semester must be 1..8, got {}", semester)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Curriculum {
    pub id: i64,
    pub name: String,
    #[serde(skip)]
    pub edit_password: String,
    #[serde(skip)]
    pub clo_edit_password: String,
    pub revision: i64,
}

/// Section of the credit table a row belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowKind {
    General,
    Core,
    Plo,
    Free,
}

impl RowKind {
    /// Kinds edited as repeated rows in the credit-table form
    pub const EDITABLE: [RowKind; 3] = [RowKind::General, RowKind::Core, RowKind::Plo];

    pub fn as_str(self) -> &'static str {
        match self {
            RowKind::General => "general",
            RowKind::Core => "core",
            RowKind::Plo => "plo",
            RowKind::Free => "free",
        }
    }
}

impl fmt::Display for RowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RowKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "general" => Ok(RowKind::General),
            "core" => Ok(RowKind::Core),
            "plo" => Ok(RowKind::Plo),
            "free" => Ok(RowKind::Free),
            other => Err(Error::invalid(format!("Unknown row kind '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreditRow {
    pub id: i64,
    pub curriculum_id: i64,
    pub row_kind: RowKind,
    pub name: String,
    pub credits: [i64; SEMESTERS],
    pub sort_order: i64,
}

impl CreditRow {
    pub fn total_credits(&self) -> i64 {
        self.credits.iter().sum()
    }
}

impl<'r> FromRow<'r, SqliteRow> for CreditRow {
    fn from_row(row: &'r SqliteRow) -> sqlx::Result<Self> {
        let kind: String = row.try_get("row_kind")?;
        let row_kind = kind.parse().map_err(|e: Error| sqlx::Error::ColumnDecode {
            index: "row_kind".to_string(),
            source: Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())),
        })?;

        let mut credits = [0i64; SEMESTERS];
        for (i, slot) in credits.iter_mut().enumerate() {
            *slot = row.try_get(format!("credits_sem{}", i + 1).as_str())?;
        }

        Ok(CreditRow {
            id: row.try_get("id")?,
            curriculum_id: row.try_get("curriculum_id")?,
            row_kind,
            name: row.try_get("name")?,
            credits,
            sort_order: row.try_get("sort_order")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Course {
    pub id: i64,
    pub curriculum_id: i64,
    pub credit_row_id: Option<i64>,
    pub course_code: String,
    pub course_name: String,
    pub credits: i64,
    pub semester: i64,
    pub plo: String,
    pub category: String,
    pub knowledge: String,
    pub skills: String,
    pub ethics: String,
    pub character: String,
    pub description: String,
}

impl Course {
    pub fn plo_tags(&self) -> PloTagSet {
        PloTagSet::parse_lenient(&self.plo)
    }

    /// Stored code text for one indicator type
    pub fn ksec_text(&self, ksec_type: KsecType) -> &str {
        match ksec_type {
            KsecType::Knowledge => &self.knowledge,
            KsecType::Skills => &self.skills,
            KsecType::Ethics => &self.ethics,
            KsecType::Character => &self.character,
        }
    }

    pub fn ksec_codes(&self, ksec_type: KsecType) -> KsecCodeSet {
        KsecCodeSet::parse_lenient(ksec_type, self.ksec_text(ksec_type))
    }

    pub fn is_free_elective(&self) -> bool {
        self.category == FREE_ELECTIVE_CATEGORY
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct KsecItem {
    pub id: i64,
    pub curriculum_id: i64,
    pub semester: i64,
    pub ksec_type: String,
    pub category_type: String,
    pub description: String,
    pub sort_order: i64,
}

impl KsecItem {
    /// Display code derived from category, type and position, e.g. `GE(K)1`
    pub fn code(&self) -> Option<KsecCode> {
        let category = KsecCategory::parse(&self.category_type)?;
        let ksec_type = KsecType::from_letter(&self.ksec_type)?;
        let number = u32::try_from(self.sort_order + 1).ok()?;
        Some(KsecCode::new(category, ksec_type, number))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Clo {
    pub id: i64,
    pub course_id: i64,
    pub clo_index: i64,
    pub clo: String,
    pub bloom: String,
    pub k: String,
    pub s: String,
    pub e: String,
    pub c: String,
}

impl Clo {
    pub fn ksec_text(&self, ksec_type: KsecType) -> &str {
        match ksec_type {
            KsecType::Knowledge => &self.k,
            KsecType::Skills => &self.s,
            KsecType::Ethics => &self.e,
            KsecType::Character => &self.c,
        }
    }
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct CloSummary {
    pub id: i64,
    pub course_id: i64,
    pub bloom_score: i64,
    pub k_percent: f64,
    pub s_percent: f64,
    pub e_percent: f64,
    pub c_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct YloEntry {
    pub id: i64,
    pub curriculum_id: i64,
    pub plo: String,
    pub semester: i64,
    pub summary_text: String,
}
