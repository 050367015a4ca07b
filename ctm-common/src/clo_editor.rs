//! CLO editor saves
//!
//! CLOs, their summary and the course description are written to BOTH stores
//! so the published snapshot shows them immediately. Each store is written in
//! its own transaction; the editable revision is bumped and copied to the
//! snapshot, and snapshot rows reuse the editable ids, so the pair stays in
//! sync.

use crate::aggregate::replace_clos;
use crate::bloom::BloomLevel;
use crate::codes::{KsecCodeSet, KsecType};
use crate::db::clos::{self, NewClo, SummaryFigures};
use crate::db::{courses, curricula};
use crate::mirror::{Mirror, StoreKind};
use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

static CLO_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^CLO\s*\d+\s*:?").expect("static regex"));

/// Remove a leading `CLO<n>:` label
pub fn strip_clo_prefix(text: &str) -> String {
    CLO_PREFIX_RE.replace(text.trim(), "").trim().to_string()
}

/// Unsaved CLO lines and description posted from the editor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloDraft {
    pub lines: Vec<NewClo>,
    pub description: String,
}

/// Parallel lists posted by the editor
#[derive(Debug, Clone, Default)]
pub struct CloForm {
    pub clo: Vec<String>,
    pub bloom: Vec<String>,
    pub k: Vec<String>,
    pub s: Vec<String>,
    pub e: Vec<String>,
    pub c: Vec<String>,
    pub description: String,
}

impl CloDraft {
    /// Validate and number the posted lines
    ///
    /// Lines whose text is empty once the `CLO<n>:` label is removed are
    /// dropped. Remaining lines are renumbered `CLO1: ...`, `CLO2: ...`.
    pub fn from_form(form: &CloForm) -> Result<Self> {
        let at = |list: &[String], i: usize| list.get(i).map(|s| s.trim().to_string()).unwrap_or_default();
        let codes = |list: &[String], i: usize, t: KsecType| -> Result<String> {
            Ok(KsecCodeSet::parse(t, &at(list, i))?.to_string())
        };

        let mut lines = Vec::new();
        for (i, raw) in form.clo.iter().enumerate() {
            let text = strip_clo_prefix(raw);
            if text.is_empty() {
                continue;
            }
            let bloom = BloomLevel::parse_optional(&at(&form.bloom, i))?
                .map(|level| level.name().to_string())
                .unwrap_or_default();
            lines.push(NewClo {
                clo: format!("CLO{}: {}", lines.len() + 1, text),
                bloom,
                k: codes(&form.k, i, KsecType::Knowledge)?,
                s: codes(&form.s, i, KsecType::Skills)?,
                e: codes(&form.e, i, KsecType::Ethics)?,
                c: codes(&form.c, i, KsecType::Character)?,
            });
        }

        Ok(Self {
            lines,
            description: form.description.trim().to_string(),
        })
    }
}

/// Replace a course's CLOs, summary and description in both stores
///
/// The editable store computes the rows; the snapshot receives copies with
/// the same ids. When the snapshot commit fails after the editable one, the
/// curriculum is promoted to bring the pair back in line.
///
/// Returns the summary computed on the editable store.
pub async fn save_clos(
    mirror: &Mirror,
    curriculum_id: i64,
    course_id: i64,
    draft: &CloDraft,
) -> Result<SummaryFigures> {
    let mut editable = mirror.pool(StoreKind::Editable).begin().await?;
    let mut snapshot = mirror.pool(StoreKind::Snapshot).begin().await?;

    for tx in [&mut editable, &mut snapshot] {
        courses::require(tx, curriculum_id, course_id).await?;
    }

    let figures = replace_clos(&mut editable, curriculum_id, course_id, &draft.lines).await?;
    courses::set_description(&mut editable, course_id, &draft.description).await?;
    let revision = curricula::bump_revision(&mut editable, curriculum_id).await?;
    let saved = clos::list_for_course(&mut editable, course_id).await?;
    let summary = clos::get_summary(&mut editable, course_id).await?;

    clos::delete_summary(&mut snapshot, course_id).await?;
    clos::delete_for_course(&mut snapshot, course_id).await?;
    for clo in &saved {
        clos::insert_with_id(&mut snapshot, clo).await?;
    }
    if let Some(summary) = &summary {
        clos::insert_summary_with_id(&mut snapshot, summary).await?;
    }
    courses::set_description(&mut snapshot, course_id, &draft.description).await?;
    curricula::set_revision(&mut snapshot, curriculum_id, revision).await?;

    editable.commit().await?;
    if let Err(e) = snapshot.commit().await {
        warn!(
            "Snapshot commit of CLOs for course {} failed ({}); promoting curriculum {}",
            course_id, e, curriculum_id
        );
        mirror.promote(curriculum_id).await?;
    }

    info!(
        "Saved {} CLOs for course {} of curriculum {} (bloom {}, K {}%, S {}%, E {}%, C {}%)",
        draft.lines.len(),
        course_id,
        curriculum_id,
        figures.bloom_score,
        figures.k_percent,
        figures.s_percent,
        figures.e_percent,
        figures.c_percent
    );
    Ok(figures)
}

/// Delete a course's CLOs and summary and clear its description in both stores
///
/// A store that does not hold the course is skipped.
pub async fn reset_clos(mirror: &Mirror, curriculum_id: i64, course_id: i64) -> Result<()> {
    let mut found = false;
    let mut revision = None;

    for kind in [StoreKind::Editable, StoreKind::Snapshot] {
        let mut tx = mirror.pool(kind).begin().await?;
        if courses::get(&mut tx, curriculum_id, course_id).await?.is_none() {
            continue;
        }
        found = true;
        clos::delete_summary(&mut tx, course_id).await?;
        clos::delete_for_course(&mut tx, course_id).await?;
        courses::set_description(&mut tx, course_id, "").await?;
        match (kind, revision) {
            (StoreKind::Editable, _) => {
                revision = Some(curricula::bump_revision(&mut tx, curriculum_id).await?);
            }
            (StoreKind::Snapshot, Some(r)) => curricula::set_revision(&mut tx, curriculum_id, r).await?,
            (StoreKind::Snapshot, None) => {}
        }
        tx.commit().await?;
    }

    if !found {
        return Err(Error::not_found(format!("Course {}", course_id)));
    }
    info!("Reset CLOs of course {} in curriculum {}", course_id, curriculum_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_strip_prefix() {
        assert_eq!(strip_clo_prefix("CLO1: Explain terms"), "Explain terms");
        assert_eq!(strip_clo_prefix("clo 12 : Design"), "Design");
        assert_eq!(strip_clo_prefix("Analyze data"), "Analyze data");
    }

    #[test]
    fn test_draft_renumbers_and_normalizes() {
        let form = CloForm {
            clo: strings(&["CLO3: Explain", "", "Design a system"]),
            bloom: strings(&["understand", "", "Create"]),
            k: strings(&["ge(k)1", "", ""]),
            s: strings(&["", "", "CE(S)2"]),
            e: vec![],
            c: vec![],
            description: "  Intro course ".to_string(),
        };
        let draft = CloDraft::from_form(&form).unwrap();
        assert_eq!(draft.lines.len(), 2);
        assert_eq!(draft.lines[0].clo, "CLO1: Explain");
        assert_eq!(draft.lines[0].bloom, "Understand");
        assert_eq!(draft.lines[0].k, "GE(K)1");
        assert_eq!(draft.lines[1].clo, "CLO2: Design a system");
        assert_eq!(draft.lines[1].s, "CE(S)2");
        assert_eq!(draft.description, "Intro course");
    }

    #[test]
    fn test_draft_rejects_bad_code() {
        let form = CloForm {
            clo: strings(&["Explain"]),
            k: strings(&["GE(S)1"]),
            ..Default::default()
        };
        assert!(CloDraft::from_form(&form).is_err());
    }
}
