//! CLO editor for one course
//!
//! Editors in edit mode save straight to both stores. Viewers keep a draft in
//! their session and may unlock saving for the course with the curriculum's
//! CLO password.

use axum::{
    extract::{Path, Query, State},
    response::{Html, Redirect},
    routing::{get, post},
    Form, Router,
};
use ctm_common::access;
use ctm_common::aggregate::summarize_clos;
use ctm_common::bloom::BloomDomain;
use ctm_common::clo_editor::{self, CloDraft, CloForm};
use ctm_common::codes::{KsecCode, KsecType};
use ctm_common::db::clos::NewClo;
use ctm_common::db::{clos, courses, curricula, Course};
use ctm_common::Error;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::info;

use super::{described_catalogues, finish, DescribedCatalogues, Scope};
use crate::form::FormFields;
use crate::html::{self, escape};
use crate::session::{CourseKey, SessionHandle};
use crate::{ApiResult, AppState};

/// Blank CLO lines offered under the current ones
const BLANK_LINES: usize = 2;

#[derive(Debug, Deserialize)]
pub struct EditorQuery {
    pub from_link: Option<u8>,
}

fn editor_url(curriculum_id: i64, course_id: i64) -> String {
    format!("/curriculum/{}/clo-ksec-mapping/{}", curriculum_id, course_id)
}

fn clo_form(form: &FormFields) -> CloForm {
    CloForm {
        clo: form.get_all("clo[]"),
        bloom: form.get_all("bloom[]"),
        k: form.get_all("k[]"),
        s: form.get_all("s[]"),
        e: form.get_all("e[]"),
        c: form.get_all("c[]"),
        description: form.get("course_description"),
    }
}

/// The course's own K/S/E/C codes with their catalogue descriptions
///
/// Codes missing from the catalogue are listed with an empty description.
pub(crate) fn candidates(course: &Course, catalogues: &DescribedCatalogues) -> Vec<(KsecType, Vec<(KsecCode, String)>)> {
    KsecType::ALL
        .iter()
        .map(|t| {
            let described = catalogues.get(t).map(Vec::as_slice).unwrap_or(&[]);
            let codes = course
                .ksec_codes(*t)
                .iter()
                .map(|code| {
                    let description = described
                        .iter()
                        .find(|(c, _)| c == code)
                        .map(|(_, d)| d.clone())
                        .unwrap_or_default();
                    (*code, description)
                })
                .collect();
            (*t, codes)
        })
        .collect()
}

fn bloom_choices(selected: &str) -> String {
    let mut out = format!(
        r#"<option value=""{}>-</option>"#,
        if selected.is_empty() { " selected" } else { "" }
    );
    for domain in BloomDomain::ALL {
        out.push_str(&format!(r#"<optgroup label="{}">"#, domain.name()));
        for level in domain.levels() {
            out.push_str(&format!(
                r#"<option value="{name}"{sel}>{name}</option>"#,
                name = level.name(),
                sel = if level.name().eq_ignore_ascii_case(selected) { " selected" } else { "" }
            ));
        }
        out.push_str("</optgroup>");
    }
    out
}

fn bloom_reference() -> String {
    let mut out = String::from("<table><tr><th>Domain</th><th>Level</th><th>Score</th><th>Verbs</th></tr>");
    for domain in BloomDomain::ALL {
        for level in domain.levels() {
            out.push_str(&format!(
                r#"<tr><td>{}</td><td>{}</td><td>{}</td><td class="label">{}</td></tr>"#,
                domain.name(),
                level.name(),
                level.score(),
                level.verbs()
            ));
        }
    }
    out.push_str("</table>");
    out
}

fn clo_line(line: &NewClo) -> String {
    format!(
        r#"<tr>
<td class="label"><input type="text" class="wide" name="clo[]" value="{}"></td>
<td><select name="bloom[]">{}</select></td>
<td><input type="text" name="k[]" value="{}"></td>
<td><input type="text" name="s[]" value="{}"></td>
<td><input type="text" name="e[]" value="{}"></td>
<td><input type="text" name="c[]" value="{}"></td>
</tr>"#,
        escape(&line.clo),
        bloom_choices(&line.bloom),
        escape(&line.k),
        escape(&line.s),
        escape(&line.e),
        escape(&line.c)
    )
}

/// GET /curriculum/:id/clo-ksec-mapping/:course_id
pub async fn clo_page(
    State(state): State<AppState>,
    session: SessionHandle,
    Path((curriculum_id, course_id)): Path<(i64, i64)>,
    Query(query): Query<EditorQuery>,
) -> ApiResult<Html<String>> {
    let scope = Scope::of(&session, curriculum_id).await;
    let key: CourseKey = (curriculum_id, course_id);
    let editing = scope.can_edit();
    if !editing && query.from_link == Some(1) {
        session.forget_clo_state(key).await;
    }

    let (curriculum, course, stored, catalogues) = {
        let mut conn = scope.conn(&state).await?;
        let curriculum = curricula::require(&mut conn, curriculum_id).await?;
        let course = courses::require(&mut conn, curriculum_id, course_id).await?;
        let stored = clos::list_for_course(&mut conn, course_id).await?;
        let catalogues = described_catalogues(&mut conn, curriculum_id).await?;
        (curriculum, course, stored, catalogues)
    };

    let draft = session.draft(key).await;
    let unlocked = session.clos_unlocked(key).await;
    let (lines, description) = match &draft {
        Some(d) => (d.lines.clone(), d.description.clone()),
        None => (stored.iter().map(NewClo::from).collect::<Vec<_>>(), course.description.clone()),
    };

    let codes: HashMap<KsecType, Vec<KsecCode>> = catalogues
        .iter()
        .map(|(t, entries)| (*t, entries.iter().map(|(c, _)| *c).collect()))
        .collect();
    let figures = summarize_clos(&lines, &codes);

    let candidate_list: String = candidates(&course, &catalogues)
        .into_iter()
        .map(|(t, entries)| {
            let items: String = if entries.is_empty() {
                r#"<span class="muted">none</span>"#.to_string()
            } else {
                entries
                    .iter()
                    .map(|(code, d)| format!(r#"<div><span class="codes">{}</span> {}</div>"#, code, escape(d)))
                    .collect()
            };
            format!(r#"<tr><th>{}</th><td class="label">{}</td></tr>"#, t.name(), items)
        })
        .collect();

    let mut rows: String = lines.iter().map(clo_line).collect();
    for _ in 0..BLANK_LINES {
        rows.push_str(&clo_line(&NewClo::default()));
    }

    let url = editor_url(curriculum_id, course_id);
    let can_save = editing || unlocked;
    let status = match (editing, unlocked, draft.is_some()) {
        (true, _, _) => "Edit mode: saving writes both databases.",
        (false, true, _) => "Saving is unlocked for this course in this session.",
        (false, false, true) => "Draft kept in this session. Enter the CLO password to save it.",
        (false, false, false) => "View mode. Keep a draft in this session or enter the CLO password to save.",
    };
    let password_field = if can_save {
        String::new()
    } else {
        r#"<p><label>CLO password <input type="password" name="session_password"></label></p>"#.to_string()
    };
    let save_buttons = if can_save {
        format!(
            r#"<button type="submit" formaction="{}/save">Save CLOs</button>"#,
            url
        )
    } else {
        String::new()
    };
    let reset = if can_save {
        html::post_button(&format!("{}/reset", url), "Delete all CLOs", "danger")
    } else {
        String::new()
    };

    let body = format!(
        r#"<p>{code} {name} ({credits} credits)</p>
<p class="muted">{status}</p>
<h2>Course K/S/E/C codes</h2>
<table>{candidates}</table>
<h2>Current figures</h2>
<table><tr><th>Bloom max</th><th>K %</th><th>S %</th><th>E %</th><th>C %</th></tr>
<tr><td class="bloom-max">{bloom}</td><td>{k:.2}</td><td>{s:.2}</td><td>{e:.2}</td><td>{c:.2}</td></tr></table>
<h2>Course learning outcomes</h2>
<form method="post" action="{url}/save-session">
<table><tr><th>CLO</th><th>Bloom</th><th>K</th><th>S</th><th>E</th><th>C</th></tr>{rows}</table>
<p><label>Course description<br><textarea name="course_description" rows="4" class="wide">{description}</textarea></label></p>
{password_field}
<div class="actions"><button type="submit">Keep draft</button>{save_buttons}</div>
</form>
<div class="actions">{reset}</div>
<h2>Bloom levels</h2>
{bloom_reference}
<p><a href="/curriculum/{id}/ylo-studyplan/{semester}">Back to study plan</a></p>"#,
        code = escape(&course.course_code),
        name = escape(&course.course_name),
        credits = course.credits,
        status = status,
        candidates = candidate_list,
        bloom = figures.bloom_score,
        k = figures.k_percent,
        s = figures.s_percent,
        e = figures.e_percent,
        c = figures.c_percent,
        url = url,
        rows = rows,
        description = escape(&description),
        password_field = password_field,
        save_buttons = save_buttons,
        reset = reset,
        bloom_reference = bloom_reference(),
        id = curriculum_id,
        semester = course.semester,
    );

    let chrome = scope.chrome(&session, &curriculum.name).await;
    Ok(html::page(&format!("CLO mapping: {}", course.course_code), &chrome, &body))
}

/// POST /curriculum/:id/clo-ksec-mapping/:course_id/save-session
pub async fn clo_save_session(
    State(state): State<AppState>,
    session: SessionHandle,
    Path((curriculum_id, course_id)): Path<(i64, i64)>,
    form: Form<Vec<(String, String)>>,
) -> ApiResult<Redirect> {
    let form = FormFields::from(form);
    let scope = Scope::of(&session, curriculum_id).await;
    let key: CourseKey = (curriculum_id, course_id);
    {
        let mut conn = scope.conn(&state).await?;
        courses::require(&mut conn, curriculum_id, course_id).await?;
    }

    let result: ctm_common::Result<String> = async {
        let draft = CloDraft::from_form(&clo_form(&form))?;
        let count = draft.lines.len();
        session.store_draft(key, draft).await;

        let password = form.get("session_password");
        if password.is_empty() {
            return Ok(format!("Draft with {} CLOs kept in this session.", count));
        }
        if access::verify_clo_password(&state.mirror, curriculum_id, &password).await? {
            session.unlock_clos(key).await;
            info!("Session {} unlocked CLO saving for course {}", session.id(), course_id);
            Ok(format!("Draft with {} CLOs kept. Saving is unlocked for this course.", count))
        } else {
            Err(Error::Forbidden("Incorrect CLO password. The draft is kept in this session.".to_string()))
        }
    }
    .await;

    finish(&session, editor_url(curriculum_id, course_id), result).await
}

async fn require_clo_access(session: &SessionHandle, scope: &Scope, key: CourseKey) -> ctm_common::Result<()> {
    if scope.can_edit() || session.clos_unlocked(key).await {
        Ok(())
    } else {
        Err(Error::Forbidden(
            "Edit mode or the CLO password is required to change CLOs.".to_string(),
        ))
    }
}

/// POST /curriculum/:id/clo-ksec-mapping/:course_id/save
///
/// Both stores must hold the same revision first. An editor publishes
/// pending edits implicitly; a viewer is refused.
pub async fn clo_save(
    State(state): State<AppState>,
    session: SessionHandle,
    Path((curriculum_id, course_id)): Path<(i64, i64)>,
    form: Form<Vec<(String, String)>>,
) -> ApiResult<Redirect> {
    let form = FormFields::from(form);
    let scope = Scope::of(&session, curriculum_id).await;
    let key: CourseKey = (curriculum_id, course_id);

    let result: ctm_common::Result<String> = async {
        require_clo_access(&session, &scope, key).await?;
        let draft = CloDraft::from_form(&clo_form(&form))?;

        if state.mirror.needs_promote(curriculum_id).await? {
            if !scope.can_edit() {
                return Err(Error::Forbidden(
                    "The published copy is out of date. Ask an editor to publish before saving CLOs.".to_string(),
                ));
            }
            let report = state.mirror.promote(curriculum_id).await?;
            info!("Published before CLO save: {}", report);
        }

        let figures = clo_editor::save_clos(&state.mirror, curriculum_id, course_id, &draft).await?;
        session.clear_draft(key).await;
        Ok(format!(
            "Saved {} CLOs (Bloom {}, K {:.2}%, S {:.2}%, E {:.2}%, C {:.2}%).",
            draft.lines.len(),
            figures.bloom_score,
            figures.k_percent,
            figures.s_percent,
            figures.e_percent,
            figures.c_percent
        ))
    }
    .await;

    finish(&session, editor_url(curriculum_id, course_id), result).await
}

/// POST /curriculum/:id/clo-ksec-mapping/:course_id/reset
pub async fn clo_reset(
    State(state): State<AppState>,
    session: SessionHandle,
    Path((curriculum_id, course_id)): Path<(i64, i64)>,
) -> ApiResult<Redirect> {
    let scope = Scope::of(&session, curriculum_id).await;
    let key: CourseKey = (curriculum_id, course_id);

    let result: ctm_common::Result<String> = async {
        require_clo_access(&session, &scope, key).await?;
        clo_editor::reset_clos(&state.mirror, curriculum_id, course_id).await?;
        session.clear_draft(key).await;
        Ok("CLOs and course description cleared.".to_string())
    }
    .await;

    finish(&session, editor_url(curriculum_id, course_id), result).await
}

pub fn clo_routes() -> Router<AppState> {
    Router::new()
        .route("/curriculum/:id/clo-ksec-mapping/:course_id", get(clo_page))
        .route(
            "/curriculum/:id/clo-ksec-mapping/:course_id/save-session",
            post(clo_save_session),
        )
        .route("/curriculum/:id/clo-ksec-mapping/:course_id/save", post(clo_save))
        .route("/curriculum/:id/clo-ksec-mapping/:course_id/reset", post(clo_reset))
}
