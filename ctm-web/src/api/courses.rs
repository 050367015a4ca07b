//! Course list of one credit row (or the free electives) in one semester

use axum::{
    extract::{Path, State},
    response::{Html, Redirect},
    routing::{get, post},
    Form, Router,
};
use ctm_common::codes::extract_plo_tag;
use ctm_common::course_list::{self, CourseScope};
use ctm_common::db::{check_semester, credit_rows, curricula, semester_label, RowKind, FREE_ELECTIVES_NAME};

use super::{finish, Scope};
use crate::form::FormFields;
use crate::html::{self, escape, post_button};
use crate::session::SessionHandle;
use crate::{ApiResult, AppState};

/// Blank lines offered under the stored courses in edit mode
const BLANK_LINES: usize = 3;

fn list_url(curriculum_id: i64, scope: CourseScope, semester: i64) -> String {
    format!("/curriculum/{}/course-list/{}/{}", curriculum_id, scope, semester)
}

fn course_line(code: &str, name: &str, credits: &str, plo: &str) -> String {
    format!(
        r#"<tr>
<td><input type="text" name="course_code[]" value="{}"></td>
<td class="label"><input type="text" class="wide" name="course_name[]" value="{}"></td>
<td><input type="number" name="credits[]" value="{}"></td>
<td><input type="text" name="plo[]" value="{}" placeholder="PLO1, PLO2"></td>
</tr>"#,
        escape(code),
        escape(name),
        escape(credits),
        escape(plo)
    )
}

/// GET /curriculum/:id/course-list/:row/:semester
pub async fn course_list_page(
    State(state): State<AppState>,
    session: SessionHandle,
    Path((curriculum_id, row, semester)): Path<(i64, String, i64)>,
) -> ApiResult<Html<String>> {
    let course_scope: CourseScope = row.parse()?;
    let semester = check_semester(semester)?;
    let scope = Scope::of(&session, curriculum_id).await;

    let (curriculum, title, listed, plo_rows) = {
        let mut conn = scope.conn(&state).await?;
        let curriculum = curricula::require(&mut conn, curriculum_id).await?;
        let title = match course_scope {
            CourseScope::Row(row_id) => credit_rows::require(&mut conn, curriculum_id, row_id).await?.name,
            CourseScope::FreeElective => FREE_ELECTIVES_NAME.to_string(),
        };
        let listed = course_list::list_scope(&mut conn, curriculum_id, course_scope, semester).await?;
        let plo_rows = credit_rows::list_kind(&mut conn, curriculum_id, RowKind::Plo).await?;
        (curriculum, title, listed, plo_rows)
    };

    let plo_choices: String = plo_rows
        .iter()
        .filter(|r| !r.name.trim().is_empty())
        .map(|r| format!("<li><code>{}</code> {}</li>", escape(&extract_plo_tag(&r.name)), escape(&r.name)))
        .collect();
    let total: i64 = listed.iter().map(|c| c.credits).sum();
    let back = format!(
        r#"<p><a href="/curriculum/{}/credit-table">Back to credit table</a></p>"#,
        curriculum_id
    );

    let mut body = String::new();
    if scope.can_edit() {
        let mut lines: String = listed
            .iter()
            .map(|c| course_line(&c.course_code, &c.course_name, &c.credits.to_string(), &c.plo))
            .collect();
        for _ in 0..BLANK_LINES {
            lines.push_str(&course_line("", "", "", ""));
        }
        let url = list_url(curriculum_id, course_scope, semester);
        body.push_str(&format!(
            r#"<form method="post" action="{url}/save">
<table><tr><th>Code</th><th>Name</th><th>Credits</th><th>PLO</th></tr>{lines}</table>
<p class="muted">Leave a code empty to skip the line. Courses whose code is no longer listed are deleted.</p>
<button type="submit">Save course list</button>
</form>
<div class="actions">{reset}</div>"#,
            url = url,
            lines = lines,
            reset = post_button(&format!("{}/reset", url), "Delete all courses", "danger"),
        ));
    } else {
        let rows: String = listed
            .iter()
            .map(|c| {
                format!(
                    r#"<tr><td>{}</td><td class="label">{}</td><td>{}</td><td>{}</td></tr>"#,
                    escape(&c.course_code),
                    escape(&c.course_name),
                    c.credits,
                    escape(&c.plo)
                )
            })
            .collect();
        body.push_str(&format!(
            "<table><tr><th>Code</th><th>Name</th><th>Credits</th><th>PLO</th></tr>{}</table>",
            rows
        ));
    }
    body.push_str(&format!(r#"<p class="total">Total credits: {}</p>"#, total));
    if !plo_choices.is_empty() {
        body.push_str(&format!("<h2>PLO choices</h2><ul>{}</ul>", plo_choices));
    }
    body.push_str(&back);

    let chrome = scope.chrome(&session, &curriculum.name).await;
    Ok(html::page(
        &format!("{} - Year {}", title, semester_label(semester)),
        &chrome,
        &body,
    ))
}

/// POST /curriculum/:id/course-list/:row/:semester/save
pub async fn course_list_save(
    State(state): State<AppState>,
    session: SessionHandle,
    Path((curriculum_id, row, semester)): Path<(i64, String, i64)>,
    form: Form<Vec<(String, String)>>,
) -> ApiResult<Redirect> {
    let form = FormFields::from(form);
    let course_scope: CourseScope = row.parse()?;
    let scope = Scope::of(&session, curriculum_id).await;

    let result: ctm_common::Result<String> = async {
        scope.mode.require_edit(curriculum_id)?;
        let lines = course_list::parse_lines(
            &form.get_all("course_code[]"),
            &form.get_all("course_name[]"),
            &form.get_all("credits[]"),
            &form.get_all("plo[]"),
        )?;
        let outcome = course_list::save_course_list(
            state.mirror.pool(scope.store),
            curriculum_id,
            course_scope,
            semester,
            &lines,
        )
        .await?;
        Ok(format!(
            "Course list saved ({} updated, {} added, {} removed).",
            outcome.updated, outcome.created, outcome.deleted
        ))
    }
    .await;

    finish(&session, list_url(curriculum_id, course_scope, semester), result).await
}

/// POST /curriculum/:id/course-list/:row/:semester/reset
pub async fn course_list_reset(
    State(state): State<AppState>,
    session: SessionHandle,
    Path((curriculum_id, row, semester)): Path<(i64, String, i64)>,
) -> ApiResult<Redirect> {
    let course_scope: CourseScope = row.parse()?;
    let scope = Scope::of(&session, curriculum_id).await;

    let result: ctm_common::Result<String> = async {
        scope.mode.require_edit(curriculum_id)?;
        let deleted =
            course_list::reset_course_list(state.mirror.pool(scope.store), curriculum_id, course_scope, semester)
                .await?;
        Ok(format!("Deleted {} courses.", deleted))
    }
    .await;

    finish(&session, list_url(curriculum_id, course_scope, semester), result).await
}

pub fn course_routes() -> Router<AppState> {
    Router::new()
        .route("/curriculum/:id/course-list/:row/:semester", get(course_list_page))
        .route("/curriculum/:id/course-list/:row/:semester/save", post(course_list_save))
        .route("/curriculum/:id/course-list/:row/:semester/reset", post(course_list_reset))
}
