//! Credit table page, bulk save and reset

use axum::{
    extract::{Path, State},
    response::{Html, Redirect},
    routing::{get, post},
    Form, Router,
};
use ctm_common::aggregate::plo_semester_totals;
use ctm_common::codes::extract_plo_tag;
use ctm_common::credit_table::{self, CreditTableSubmission};
use ctm_common::db::{courses, credit_rows, curricula, CreditRow, RowKind, SEMESTERS};
use ctm_common::codes::KsecType;

use super::{finish, Scope};
use crate::form::FormFields;
use crate::html::{self, escape, post_button, semester_headers};
use crate::session::SessionHandle;
use crate::{ApiResult, AppState};

/// Figures shown under the PLO section
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PloFigures {
    /// Course credits per PLO row and semester, in row order
    pub course_totals: Vec<[i64; SEMESTERS]>,
    /// Column sums of `course_totals`
    pub semester_totals: [i64; SEMESTERS],
    /// Each PLO row's share of all credits in the table, rounded to 2 decimals
    pub shares: Vec<f64>,
}

pub(crate) fn plo_figures(
    plo_rows: &[&CreditRow],
    all_rows: &[CreditRow],
    all_courses: &[ctm_common::db::Course],
) -> PloFigures {
    let course_totals: Vec<[i64; SEMESTERS]> = plo_rows
        .iter()
        .map(|row| plo_semester_totals(all_courses, &extract_plo_tag(&row.name)))
        .collect();

    let mut semester_totals = [0i64; SEMESTERS];
    for totals in &course_totals {
        for (sum, value) in semester_totals.iter_mut().zip(totals) {
            *sum += value;
        }
    }

    let grand_total: i64 = all_rows.iter().map(CreditRow::total_credits).sum();
    let shares = plo_rows
        .iter()
        .map(|row| {
            if grand_total == 0 {
                0.0
            } else {
                (row.total_credits() as f64 / grand_total as f64 * 10000.0).round() / 100.0
            }
        })
        .collect();

    PloFigures {
        course_totals,
        semester_totals,
        shares,
    }
}

fn rows_of(rows: &[CreditRow], kind: RowKind) -> Vec<&CreditRow> {
    let mut picked: Vec<&CreditRow> = rows.iter().filter(|r| r.row_kind == kind).collect();
    match kind {
        RowKind::Plo => picked.sort_by_key(|r| r.id),
        _ => picked.sort_by_key(|r| (r.sort_order, r.id)),
    }
    picked
}

fn course_list_link(curriculum_id: i64, target: &str, semester: usize, text: &str) -> String {
    format!(
        r#"<a href="/curriculum/{}/{}/{}">{}</a>"#,
        curriculum_id,
        target,
        semester,
        escape(text)
    )
}

/// General or core section
fn group_section(curriculum_id: i64, kind: RowKind, title: &str, rows: &[&CreditRow], editing: bool) -> String {
    let prefix = kind.as_str();
    let mut out = format!(
        r#"<h2>{}</h2><table><tr>{}<th>Name</th>{}<th>Total</th></tr>"#,
        title,
        if editing { "<th>Order</th>" } else { "" },
        semester_headers()
    );

    for (i, row) in rows.iter().enumerate() {
        out.push_str("<tr>");
        if editing {
            out.push_str(&format!(
                r#"<td><input type="number" name="{p}_order_{id}" value="{order}"></td>
<td class="label"><input type="hidden" name="{p}_id_{i}" value="{id}"><input type="text" name="{p}_name_{i}" value="{name}"> <label class="muted"><input type="checkbox" name="{p}_remove_{i}" value="1"> remove</label></td>"#,
                p = prefix,
                id = row.id,
                i = i,
                order = row.sort_order,
                name = escape(&row.name),
            ));
        } else {
            out.push_str(&format!(r#"<td class="label">{}</td>"#, escape(&row.name)));
        }
        for (j, credits) in row.credits.iter().enumerate() {
            let target = format!("course-list/{}", row.id);
            let link = course_list_link(curriculum_id, &target, j + 1, if editing { "courses" } else { "" });
            if editing {
                out.push_str(&format!(
                    r#"<td><input type="number" name="{}_credit_{}_{}" value="{}"><br>{}</td>"#,
                    prefix, i, j, credits, link
                ));
            } else {
                out.push_str(&format!(
                    "<td>{}</td>",
                    course_list_link(curriculum_id, &target, j + 1, &credits.to_string())
                ));
            }
        }
        out.push_str(&format!(r#"<td class="total">{}</td></tr>"#, row.total_credits()));
    }

    if editing {
        out.push_str(&format!(
            r#"<tr><td class="muted">new</td><td class="label"><input type="text" name="{p}_name_new_0" placeholder="Add a row"></td>"#,
            p = prefix
        ));
        for j in 0..SEMESTERS {
            out.push_str(&format!(
                r#"<td><input type="number" name="{}_credit_new_0_{}" value="0"></td>"#,
                prefix, j
            ));
        }
        out.push_str("<td></td></tr>");
    }
    out.push_str("</table>");
    out
}

fn plo_section(curriculum_id: i64, rows: &[&CreditRow], figures: &PloFigures, editing: bool) -> String {
    let mut out = format!(
        r#"<h2>Program Learning Outcomes</h2><table><tr><th>PLO</th>{}<th>Total</th><th>Share</th></tr>"#,
        semester_headers()
    );

    for (i, row) in rows.iter().enumerate() {
        if editing {
            out.push_str(&format!(
                r#"<tr><td class="label"><input type="hidden" name="plo_id_{i}" value="{id}"><input type="text" class="wide" name="plo_name_{i}" value="{name}"> <label class="muted"><input type="checkbox" name="plo_remove_{i}" value="1"> remove</label></td>"#,
                i = i,
                id = row.id,
                name = escape(&row.name),
            ));
        } else {
            out.push_str(&format!(r#"<tr><td class="label">{}</td>"#, escape(&row.name)));
        }
        for (j, credits) in figures.course_totals[i].iter().enumerate() {
            out.push_str(&format!(
                "<td>{}</td>",
                course_list_link(
                    curriculum_id,
                    &format!("plo-course-list/{}", row.id),
                    j + 1,
                    &credits.to_string()
                )
            ));
        }
        out.push_str(&format!(
            r#"<td class="total">{}</td><td>{:.2}%</td></tr>"#,
            row.total_credits(),
            figures.shares[i]
        ));
    }

    if editing {
        out.push_str(&format!(
            r#"<tr><td class="label"><input type="text" class="wide" name="plo_name_new_0" placeholder="PLO{}: description"></td><td colspan="{}"></td></tr>"#,
            rows.len() + 1,
            SEMESTERS + 2
        ));
    }

    out.push_str(r#"<tr class="total"><td class="label">All PLOs</td>"#);
    for total in figures.semester_totals {
        out.push_str(&format!("<td>{}</td>", total));
    }
    out.push_str(&format!(
        "<td>{}</td><td></td></tr></table>",
        figures.semester_totals.iter().sum::<i64>()
    ));
    out
}

fn free_section(curriculum_id: i64, free: Option<&CreditRow>, editing: bool) -> String {
    let credits = free.map(|r| r.credits).unwrap_or([0; SEMESTERS]);
    let mut out = format!(
        r#"<h2>Free Electives</h2><table><tr><th>Name</th>{}<th>Total</th></tr><tr><td class="label">Free Electives</td>"#,
        semester_headers()
    );
    for (j, value) in credits.iter().enumerate() {
        if editing {
            out.push_str(&format!(
                r#"<td><input type="number" name="free_credit_{}" value="{}"><br>{}</td>"#,
                j,
                value,
                course_list_link(curriculum_id, "course-list/free_elective", j + 1, "courses")
            ));
        } else {
            out.push_str(&format!(
                "<td>{}</td>",
                course_list_link(curriculum_id, "course-list/free_elective", j + 1, &value.to_string())
            ));
        }
    }
    out.push_str(&format!(
        r#"<td class="total">{}</td></tr></table>"#,
        credits.iter().sum::<i64>()
    ));
    out
}

fn study_plan_links(curriculum_id: i64) -> String {
    let mut out = String::from(r#"<h2>Study plan and catalogue</h2><table><tr><th>YLO study plan</th>"#);
    for semester in 1..=SEMESTERS {
        out.push_str(&format!(
            r#"<td><a href="/curriculum/{}/ylo-studyplan/{}">{}</a></td>"#,
            curriculum_id,
            semester,
            ctm_common::db::semester_label(semester as i64)
        ));
    }
    out.push_str("</tr><tr><th>K/S/E/C catalogue</th>");
    for ksec_type in KsecType::ALL {
        out.push_str(&format!(
            r#"<td colspan="2"><a href="/curriculum/{}/ksec/1/{}">{}</a></td>"#,
            curriculum_id,
            ksec_type.letter(),
            ksec_type.name()
        ));
    }
    out.push_str("</tr></table>");
    out
}

/// GET /curriculum/:id/credit-table
pub async fn credit_table_page(
    State(state): State<AppState>,
    session: SessionHandle,
    Path(curriculum_id): Path<i64>,
) -> ApiResult<Html<String>> {
    let scope = Scope::of(&session, curriculum_id).await;
    let (curriculum, rows, all_courses) = {
        let mut conn = scope.conn(&state).await?;
        let curriculum = curricula::require(&mut conn, curriculum_id).await?;
        let rows = credit_rows::list(&mut conn, curriculum_id).await?;
        let all_courses = courses::list(&mut conn, curriculum_id).await?;
        (curriculum, rows, all_courses)
    };
    let editing = scope.can_edit();

    let general = rows_of(&rows, RowKind::General);
    let core = rows_of(&rows, RowKind::Core);
    let plo = rows_of(&rows, RowKind::Plo);
    let free = rows_of(&rows, RowKind::Free).first().copied();
    let figures = plo_figures(&plo, &rows, &all_courses);

    let tables = format!(
        "{}{}{}{}",
        group_section(curriculum_id, RowKind::General, "General Education", &general, editing),
        group_section(curriculum_id, RowKind::Core, "Core Courses", &core, editing),
        free_section(curriculum_id, free, editing),
        plo_section(curriculum_id, &plo, &figures, editing),
    );

    let mut body = String::new();
    if editing {
        body.push_str(&format!(
            r#"<form method="post" action="/curriculum/{id}/credit-table">
<p>Curriculum name: <input type="text" name="curriculum_name" value="{name}"></p>
{tables}
<p class="muted">Tick remove to delete a row; a row left without a name keeps its stored values. PLO credits are recomputed from the course lists.</p>
<button type="submit">Save credit table</button>
</form>"#,
            id = curriculum_id,
            name = escape(&curriculum.name),
            tables = tables,
        ));
    } else {
        body.push_str(&tables);
    }

    body.push_str(&study_plan_links(curriculum_id));
    body.push_str(&format!(
        r#"<h2>PLO credits by year</h2><p><img src="/curriculum/{}/plo-graph" alt="PLO credit distribution by year"></p>"#,
        curriculum_id
    ));

    body.push_str(r#"<div class="actions">"#);
    if editing {
        body.push_str(&post_button(
            &format!("/curriculum/{}/backup", curriculum_id),
            "Publish (real → example)",
            "",
        ));
        body.push_str(&post_button(
            &format!("/curriculum/{}/restore", curriculum_id),
            "Restore (example → real)",
            "danger",
        ));
        body.push_str(&post_button(
            &format!("/curriculum/{}/reset", curriculum_id),
            "Reset curriculum",
            "danger",
        ));
    }
    body.push_str(r#"<a class="button" href="/download-db/all">Download databases</a></div>"#);

    let chrome = scope.chrome(&session, &curriculum.name).await;
    Ok(html::page(&format!("Credit table: {}", curriculum.name), &chrome, &body))
}

/// POST /curriculum/:id/credit-table
pub async fn credit_table_save(
    State(state): State<AppState>,
    session: SessionHandle,
    Path(curriculum_id): Path<i64>,
    form: Form<Vec<(String, String)>>,
) -> ApiResult<Redirect> {
    let form = FormFields::from(form);
    let scope = Scope::of(&session, curriculum_id).await;

    let result: ctm_common::Result<String> = async {
        scope.mode.require_edit(curriculum_id)?;
        let submission = CreditTableSubmission::from_fields(form.pairs())?;
        let outcome = credit_table::apply(state.mirror.pool(scope.store), curriculum_id, &submission).await?;
        Ok(format!(
            "Credit table saved ({} updated, {} added, {} removed).",
            outcome.updated_rows, outcome.created_rows, outcome.deleted_rows
        ))
    }
    .await;

    finish(&session, format!("/curriculum/{}/credit-table", curriculum_id), result).await
}

/// POST /curriculum/:id/reset
pub async fn credit_table_reset(
    State(state): State<AppState>,
    session: SessionHandle,
    Path(curriculum_id): Path<i64>,
) -> ApiResult<Redirect> {
    let scope = Scope::of(&session, curriculum_id).await;

    let result: ctm_common::Result<String> = async {
        scope.mode.require_edit(curriculum_id)?;
        credit_table::reset_curriculum(state.mirror.pool(scope.store), curriculum_id).await?;
        Ok("Curriculum reset to the default credit table.".to_string())
    }
    .await;

    finish(&session, format!("/curriculum/{}/credit-table", curriculum_id), result).await
}

pub fn credit_table_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/curriculum/:id/credit-table",
            get(credit_table_page).post(credit_table_save),
        )
        .route("/curriculum/:id/reset", post(credit_table_reset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctm_common::db::Course;

    fn row(id: i64, kind: RowKind, name: &str, credits: [i64; SEMESTERS]) -> CreditRow {
        CreditRow {
            id,
            curriculum_id: 1,
            row_kind: kind,
            name: name.to_string(),
            credits,
            sort_order: id,
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
    fn test_plo_figures() {
        let rows = vec![
            row(1, RowKind::General, "Language", [3, 3, 0, 0, 0, 0, 0, 0]),
            row(2, RowKind::Plo, "PLO1: Apply", [3, 0, 0, 0, 0, 0, 0, 0]),
            row(3, RowKind::Plo, "PLO2: Design", [0, 3, 0, 0, 0, 0, 0, 0]),
        ];
        let courses = vec![course(1, 3, "PLO1"), course(2, 3, "PLO1, PLO2")];
        let plo: Vec<&CreditRow> = rows_of(&rows, RowKind::Plo);

        let figures = plo_figures(&plo, &rows, &courses);
        assert_eq!(figures.course_totals[0][..2], [3, 3]);
        assert_eq!(figures.course_totals[1][..2], [0, 3]);
        assert_eq!(figures.semester_totals[..2], [3, 6]);
        assert_eq!(figures.shares, vec![25.0, 25.0]);
    }

    #[test]
    fn test_shares_are_zero_for_empty_table() {
        let rows = vec![row(2, RowKind::Plo, "PLO1", [0; SEMESTERS])];
        let plo = rows_of(&rows, RowKind::Plo);
        assert_eq!(plo_figures(&plo, &rows, &[]).shares, vec![0.0]);
    }
}
