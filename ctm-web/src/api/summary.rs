//! PLO summary: the courses, CLOs and K/S/E/C coverage behind each PLO

use axum::{
    extract::{Path, State},
    response::Html,
    routing::get,
    Router,
};
use ctm_common::aggregate::plo_row_tag;
use ctm_common::codes::{KsecCodeSet, KsecType};
use ctm_common::db::{clos, courses, credit_rows, curricula, Clo, RowKind};

use super::{described_catalogues, DescribedCatalogues, Scope};
use crate::html::{self, escape};
use crate::session::SessionHandle;
use crate::{ApiResult, AppState};

/// `"code: description"` labels per type over all CLOs of a course, first seen first
///
/// Codes absent from the catalogue are labelled with the code itself.
pub(crate) fn grouped_labels(course_clos: &[Clo], catalogues: &DescribedCatalogues) -> Vec<(KsecType, Vec<String>)> {
    KsecType::ALL
        .iter()
        .map(|t| {
            let described = catalogues.get(t).map(Vec::as_slice).unwrap_or(&[]);
            let mut labels: Vec<String> = Vec::new();
            for clo in course_clos {
                for code in KsecCodeSet::parse_lenient(*t, clo.ksec_text(*t)).iter() {
                    let description = described
                        .iter()
                        .find(|(c, _)| c == code)
                        .map(|(_, d)| d.clone())
                        .unwrap_or_else(|| code.to_string());
                    let label = format!("{}: {}", code, description);
                    if !labels.contains(&label) {
                        labels.push(label);
                    }
                }
            }
            (*t, labels)
        })
        .collect()
}

/// GET /curriculum/:id/plo-summary
pub async fn plo_summary_page(
    State(state): State<AppState>,
    session: SessionHandle,
    Path(curriculum_id): Path<i64>,
) -> ApiResult<Html<String>> {
    let scope = Scope::of(&session, curriculum_id).await;

    let mut conn = scope.conn(&state).await?;
    let curriculum = curricula::require(&mut conn, curriculum_id).await?;
    let plo_rows = credit_rows::list_kind(&mut conn, curriculum_id, RowKind::Plo).await?;
    let all_courses = courses::list(&mut conn, curriculum_id).await?;
    let catalogues = described_catalogues(&mut conn, curriculum_id).await?;

    let mut ordered: Vec<_> = plo_rows.iter().filter(|r| !r.name.trim().is_empty()).collect();
    ordered.sort_by_key(|r| r.id);

    let mut body = String::new();
    for row in ordered {
        let tag = plo_row_tag(&row.name);
        let related: Vec<_> = all_courses.iter().filter(|c| c.plo_tags().contains(&tag)).collect();

        let mut lines = String::new();
        for course in &related {
            let course_clos = clos::list_for_course(&mut conn, course.id).await?;
            let summary = clos::get_summary(&mut conn, course.id).await?;

            let mut clo_cell: String = course_clos
                .iter()
                .map(|c| format!("<div>{}</div>", escape(c.clo.trim())))
                .collect();
            if let Some(summary) = &summary {
                clo_cell.push_str(&format!(
                    r#"<div class="bloom-max">(Max Bloom: {})</div>"#,
                    summary.bloom_score
                ));
            }

            let ksec_cells: String = grouped_labels(&course_clos, &catalogues)
                .into_iter()
                .map(|(_, labels)| {
                    let items: String = labels.iter().map(|l| format!("<div>{}</div>", escape(l))).collect();
                    format!(r#"<td class="codes">{}</td>"#, items)
                })
                .collect();

            let mut name = escape(course.course_name.trim());
            if !course.description.trim().is_empty() {
                name.push_str(&format!("<br>({})", escape(course.description.trim())));
            }

            lines.push_str(&format!(
                r#"<tr><td><a href="/curriculum/{id}/clo-ksec-mapping/{course_id}?from_link=1">{code}</a></td><td class="label">{name}</td><td class="label">{clos}</td>{ksec}<td>{credits}</td></tr>"#,
                id = curriculum_id,
                course_id = course.id,
                code = escape(&course.course_code),
                name = name,
                clos = clo_cell,
                ksec = ksec_cells,
                credits = course.credits,
            ));
        }

        let total: i64 = related.iter().map(|c| c.credits).sum();
        body.push_str(&format!(
            r#"<h2>{title}</h2>
<table><tr><th>Code</th><th>Course</th><th>CLOs</th><th>Knowledge</th><th>Skills</th><th>Ethics</th><th>Character</th><th>Credits</th></tr>
{lines}
<tr class="total"><td></td><td class="label">{count} courses</td><td colspan="5"></td><td>{total}</td></tr></table>"#,
            title = escape(row.name.trim()),
            lines = lines,
            count = related.len(),
            total = total,
        ));
    }
    drop(conn);

    if body.is_empty() {
        body.push_str(r#"<p class="muted">This curriculum has no PLO rows yet.</p>"#);
    }

    let chrome = scope.chrome(&session, &curriculum.name).await;
    Ok(html::page(&format!("PLO summary: {}", curriculum.name), &chrome, &body))
}

pub fn summary_routes() -> Router<AppState> {
    Router::new().route("/curriculum/:id/plo-summary", get(plo_summary_page))
}
