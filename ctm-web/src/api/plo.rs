//! Courses carrying one PLO in one semester, with its YLO text

use axum::{
    extract::{Path, State},
    response::{Html, Redirect},
    routing::{get, post},
    Form, Router,
};
use ctm_common::aggregate::{plo_row_tag, plo_semester_totals};
use ctm_common::codes::extract_plo_tag;
use ctm_common::db::{check_semester, courses, credit_rows, curricula, semester_label, ylo, Course, CreditRow, RowKind};
use ctm_common::Error;
use sqlx::SqliteConnection;

use super::{finish, Scope};
use crate::form::FormFields;
use crate::html::{self, escape};
use crate::session::SessionHandle;
use crate::{ApiResult, AppState};

/// 1-based position of `row_id` among the PLO rows credited in `semester`
///
/// Rows are taken in id order. A row with no credit that semester gets 1.
pub(crate) fn ylo_number(plo_rows: &[CreditRow], all_courses: &[Course], row_id: i64, semester: i64) -> usize {
    let mut ordered: Vec<&CreditRow> = plo_rows.iter().collect();
    ordered.sort_by_key(|r| r.id);
    let index = (semester - 1) as usize;

    ordered
        .iter()
        .filter(|r| plo_semester_totals(all_courses, &extract_plo_tag(&r.name))[index] != 0)
        .position(|r| r.id == row_id)
        .map(|p| p + 1)
        .unwrap_or(1)
}

/// Share of `part` in `whole` as a percentage rounded to 2 decimals
pub(crate) fn share(part: i64, whole: i64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64 * 10000.0).round() / 100.0
    }
}

async fn require_plo_row(conn: &mut SqliteConnection, curriculum_id: i64, row_id: i64) -> ctm_common::Result<CreditRow> {
    let row = credit_rows::require(conn, curriculum_id, row_id).await?;
    if row.row_kind != RowKind::Plo {
        return Err(Error::not_found(format!("PLO row {}", row_id)));
    }
    Ok(row)
}

fn page_url(curriculum_id: i64, row_id: i64, semester: i64) -> String {
    format!("/curriculum/{}/plo-course-list/{}/{}", curriculum_id, row_id, semester)
}

/// GET /curriculum/:id/plo-course-list/:row_id/:semester
pub async fn plo_course_list_page(
    State(state): State<AppState>,
    session: SessionHandle,
    Path((curriculum_id, row_id, semester)): Path<(i64, i64, i64)>,
) -> ApiResult<Html<String>> {
    let semester = check_semester(semester)?;
    let scope = Scope::of(&session, curriculum_id).await;

    let (curriculum, row, tag, plo_rows, all_courses, entry) = {
        let mut conn = scope.conn(&state).await?;
        let curriculum = curricula::require(&mut conn, curriculum_id).await?;
        let row = require_plo_row(&mut conn, curriculum_id, row_id).await?;
        let plo_rows = credit_rows::list_kind(&mut conn, curriculum_id, RowKind::Plo).await?;
        let all_courses = courses::list(&mut conn, curriculum_id).await?;
        let tag = plo_row_tag(&row.name);
        let entry = ylo::get(&mut conn, curriculum_id, &tag, semester).await?;
        (curriculum, row, tag, plo_rows, all_courses, entry)
    };

    let carrying: Vec<&Course> = all_courses
        .iter()
        .filter(|c| c.semester == semester && c.plo_tags().contains(&tag))
        .collect();
    let totals = plo_semester_totals(&all_courses, &tag);
    let semester_total = totals[(semester - 1) as usize];
    let plo_total: i64 = totals.iter().sum();
    let number = ylo_number(&plo_rows, &all_courses, row_id, semester);
    let ylo_code = format!("YLO {}-{}", semester_label(semester), number);
    let ylo_text = entry.map(|e| e.summary_text).unwrap_or_default();

    let rows: String = carrying
        .iter()
        .map(|c| {
            format!(
                r#"<tr><td>{}</td><td class="label">{}</td><td>{}</td></tr>"#,
                escape(&c.course_code),
                escape(&c.course_name),
                c.credits
            )
        })
        .collect();

    let ylo_section = if scope.can_edit() {
        format!(
            r#"<form method="post" action="{}/save">
<p><label>{}<br><textarea name="summary_text" rows="4" class="wide">{}</textarea></label></p>
<button type="submit">Save YLO</button>
</form>"#,
            page_url(curriculum_id, row_id, semester),
            escape(&ylo_code),
            escape(&ylo_text)
        )
    } else if ylo_text.is_empty() {
        format!(r#"<p class="muted">{}: no summary yet.</p>"#, escape(&ylo_code))
    } else {
        format!("<p><strong>{}</strong> {}</p>", escape(&ylo_code), escape(&ylo_text))
    };

    let body = format!(
        r#"<table><tr><th>Code</th><th>Name</th><th>Credits</th></tr>{rows}
<tr class="total"><td></td><td class="label">Semester total</td><td>{semester_total}</td></tr></table>
<p>{semester_total} of {plo_total} credits of this PLO ({share:.2}%).</p>
<h2>Year learning outcome</h2>
{ylo_section}
<p><a href="/curriculum/{id}/credit-table">Back to credit table</a></p>"#,
        rows = rows,
        semester_total = semester_total,
        plo_total = plo_total,
        share = share(semester_total, plo_total),
        ylo_section = ylo_section,
        id = curriculum_id,
    );

    let chrome = scope.chrome(&session, &curriculum.name).await;
    Ok(html::page(
        &format!("{} - Year {}", row.name.trim(), semester_label(semester)),
        &chrome,
        &body,
    ))
}

/// POST /curriculum/:id/plo-course-list/:row_id/:semester/save
pub async fn plo_course_list_save(
    State(state): State<AppState>,
    session: SessionHandle,
    Path((curriculum_id, row_id, semester)): Path<(i64, i64, i64)>,
    form: Form<Vec<(String, String)>>,
) -> ApiResult<Redirect> {
    let form = FormFields::from(form);
    let scope = Scope::of(&session, curriculum_id).await;

    let result: ctm_common::Result<String> = async {
        scope.mode.require_edit(curriculum_id)?;
        let semester = check_semester(semester)?;
        let mut tx = state.mirror.pool(scope.store).begin().await?;
        let row = require_plo_row(&mut tx, curriculum_id, row_id).await?;
        let tag = plo_row_tag(&row.name);
        ylo::upsert(&mut tx, curriculum_id, &tag, semester, &form.get("summary_text")).await?;
        curricula::bump_revision(&mut tx, curriculum_id).await?;
        tx.commit().await?;
        Ok(format!("YLO summary for {} saved.", tag))
    }
    .await;

    finish(&session, page_url(curriculum_id, row_id, semester), result).await
}

pub fn plo_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/curriculum/:id/plo-course-list/:row_id/:semester",
            get(plo_course_list_page),
        )
        .route(
            "/curriculum/:id/plo-course-list/:row_id/:semester/save",
            post(plo_course_list_save),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctm_common::db::SEMESTERS;

    fn plo_row(id: i64, name: &str) -> CreditRow {
        CreditRow {
            id,
            curriculum_id: 1,
            row_kind: RowKind::Plo,
            name: name.to_string(),
            credits: [0; SEMESTERS],
            sort_order: 0,
        }
    }

    fn course(semester: i64, credits: i64, plo: &str) -> Course {
        Course {
            id: 0,
            curriculum_id: 1,
            credit_row_id: None,
            course_code: "X".to_string(),
            course_name: String::new(),
            credits,
            semester,
            plo: plo.to_string(),
            category: String::new(),
            knowledge: String::new(),
            skills: String::new(),
            ethics: String::new(),
            character: String::new(),
            description: String::new(),
        }
    }

    #[test]
    fn test_ylo_number_skips_uncredited_rows() {
        let rows = vec![plo_row(3, "PLO3: c"), plo_row(1, "PLO1: a"), plo_row(2, "PLO2: b")];
        let courses = vec![course(2, 3, "PLO1"), course(2, 3, "PLO3"), course(1, 2, "PLO2")];
        assert_eq!(ylo_number(&rows, &courses, 1, 2), 1);
        assert_eq!(ylo_number(&rows, &courses, 3, 2), 2);
        assert_eq!(ylo_number(&rows, &courses, 2, 2), 1);
        assert_eq!(ylo_number(&rows, &courses, 2, 1), 1);
    }

    #[test]
    fn test_share() {
        assert_eq!(share(3, 9), 33.33);
        assert_eq!(share(0, 0), 0.0);
    }
}
