//! Derived aggregates
//!
//! - PLO credit totals stored on each PLO credit row
//! - YLO pruning for PLOs with no credited course in a semester
//! - CLO coverage of the K/S/E/C catalogue and the Bloom maximum

use crate::bloom::max_bloom_score;
use crate::codes::{extract_plo_tag, has_plo_prefix, KsecCode, KsecCodeSet, KsecType};
use crate::db::clos::{self, NewClo, SummaryFigures};
use crate::db::{courses, credit_rows, ksec, ylo, Course, RowKind, SEMESTERS};
use crate::Result;
use sqlx::SqliteConnection;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// Sum of course credits per semester for courses tagged with `tag`
pub fn plo_semester_totals(courses: &[Course], tag: &str) -> [i64; SEMESTERS] {
    let mut totals = [0i64; SEMESTERS];
    for course in courses {
        if !(1..=SEMESTERS as i64).contains(&course.semester) {
            continue;
        }
        if course.plo_tags().contains(tag) {
            totals[(course.semester - 1) as usize] += course.credits;
        }
    }
    totals
}

/// PLO tags carried by at least one course with positive credit in `semester`
pub fn credited_plo_tags(courses: &[Course], semester: i64) -> BTreeSet<String> {
    courses
        .iter()
        .filter(|c| c.semester == semester && c.credits > 0)
        .flat_map(|c| {
            c.plo_tags()
                .iter()
                .map(|t| t.as_str().to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Join tag of a PLO row label, warning when the label has no `PLO<n>` prefix
pub fn plo_row_tag(label: &str) -> String {
    if !has_plo_prefix(label) {
        warn!("PLO row '{}' has no PLO<n> prefix; using the label as its tag", label.trim());
    }
    extract_plo_tag(label)
}

/// Rewrite the 8 semester credits of every PLO row from the course list
///
/// Returns the number of PLO rows updated.
pub async fn recompute_plo_totals(conn: &mut SqliteConnection, curriculum_id: i64) -> Result<usize> {
    let all_courses = courses::list(conn, curriculum_id).await?;
    let plo_rows = credit_rows::list_kind(conn, curriculum_id, RowKind::Plo).await?;

    for row in &plo_rows {
        let tag = plo_row_tag(&row.name);
        let totals = plo_semester_totals(&all_courses, &tag);
        debug!("PLO row {} ({}) totals {:?}", row.id, tag, totals);
        credit_rows::set_credits(conn, row.id, &totals).await?;
    }

    Ok(plo_rows.len())
}

/// Delete YLO entries whose PLO has no credited course in their semester
///
/// Returns the number of entries deleted.
pub async fn prune_ylo(conn: &mut SqliteConnection, curriculum_id: i64) -> Result<u64> {
    let all_courses = courses::list(conn, curriculum_id).await?;
    let mut deleted = 0;

    for semester in 1..=SEMESTERS as i64 {
        let credited = credited_plo_tags(&all_courses, semester);
        for entry in ylo::list_semester(conn, curriculum_id, semester).await? {
            let tag = extract_plo_tag(&entry.plo);
            if !credited.contains(&tag) {
                debug!("Pruning YLO {} for {} in semester {}", entry.id, entry.plo, semester);
                ylo::delete(conn, entry.id).await?;
                deleted += 1;
            }
        }
    }

    Ok(deleted)
}

/// Percentage of catalogue codes selected, rounded to 2 decimals
///
/// Selected codes absent from the catalogue are ignored. An empty catalogue
/// yields 0.
pub fn coverage_percent<'a>(
    selected: impl IntoIterator<Item = &'a KsecCode>,
    catalogue: &[KsecCode],
) -> f64 {
    let distinct: BTreeSet<&KsecCode> = catalogue.iter().collect();
    if distinct.is_empty() {
        return 0.0;
    }
    let hit: BTreeSet<&KsecCode> = selected
        .into_iter()
        .filter(|code| distinct.contains(code))
        .collect();
    round2(hit.len() as f64 / distinct.len() as f64 * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Catalogue codes of every K/S/E/C type for a curriculum
pub async fn load_catalogues(
    conn: &mut SqliteConnection,
    curriculum_id: i64,
) -> Result<HashMap<KsecType, Vec<KsecCode>>> {
    let mut catalogues = HashMap::new();
    for ksec_type in KsecType::ALL {
        let codes = ksec::catalogue(conn, curriculum_id, ksec_type)
            .await?
            .into_iter()
            .map(|(code, _)| code)
            .collect();
        catalogues.insert(ksec_type, codes);
    }
    Ok(catalogues)
}

/// Bloom maximum and per-type coverage for a list of CLO lines
pub fn summarize_clos(
    clos: &[NewClo],
    catalogues: &HashMap<KsecType, Vec<KsecCode>>,
) -> SummaryFigures {
    let coverage = |ksec_type: KsecType| {
        let selected: Vec<KsecCode> = clos
            .iter()
            .flat_map(|clo| {
                KsecCodeSet::parse_lenient(ksec_type, clo_text(clo, ksec_type))
                    .iter()
                    .copied()
                    .collect::<Vec<_>>()
            })
            .collect();
        let catalogue = catalogues.get(&ksec_type).map(Vec::as_slice).unwrap_or(&[]);
        coverage_percent(selected.iter(), catalogue)
    };

    SummaryFigures {
        bloom_score: i64::from(max_bloom_score(clos.iter().map(|c| c.bloom.as_str()))),
        k_percent: coverage(KsecType::Knowledge),
        s_percent: coverage(KsecType::Skills),
        e_percent: coverage(KsecType::Ethics),
        c_percent: coverage(KsecType::Character),
    }
}

fn clo_text(clo: &NewClo, ksec_type: KsecType) -> &str {
    match ksec_type {
        KsecType::Knowledge => &clo.k,
        KsecType::Skills => &clo.s,
        KsecType::Ethics => &clo.e,
        KsecType::Character => &clo.c,
    }
}

/// Replace a course's CLOs and recompute its summary
///
/// CLO indices are assigned 1.. in submission order. Returns the new summary.
pub async fn replace_clos(
    conn: &mut SqliteConnection,
    curriculum_id: i64,
    course_id: i64,
    lines: &[NewClo],
) -> Result<SummaryFigures> {
    clos::delete_for_course(conn, course_id).await?;
    for (i, line) in lines.iter().enumerate() {
        clos::insert(conn, course_id, i as i64 + 1, line).await?;
    }
    replace_clo_summary(conn, curriculum_id, course_id).await
}

/// Recompute a course's summary from its stored CLOs
pub async fn replace_clo_summary(
    conn: &mut SqliteConnection,
    curriculum_id: i64,
    course_id: i64,
) -> Result<SummaryFigures> {
    let stored: Vec<NewClo> = clos::list_for_course(conn, course_id)
        .await?
        .iter()
        .map(NewClo::from)
        .collect();
    let catalogues = load_catalogues(conn, curriculum_id).await?;
    let figures = summarize_clos(&stored, &catalogues);
    clos::replace_summary(conn, course_id, &figures).await?;
    debug!("CLO summary for course {}: {:?}", course_id, figures);
    Ok(figures)
}
