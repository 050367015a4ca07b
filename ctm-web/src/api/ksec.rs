//! K/S/E/C catalogue editor and the code picker used by the study plan

use axum::{
    extract::{Path, Query, State},
    response::{Html, Redirect},
    routing::get,
    Form, Router,
};
use ctm_common::catalogue;
use ctm_common::codes::{KsecCategory, KsecType};
use ctm_common::db::{check_semester, courses, curricula, ksec};
use ctm_common::Error;
use serde::Deserialize;

use super::{finish, Scope};
use crate::form::FormFields;
use crate::html::{self, escape, options};
use crate::session::SessionHandle;
use crate::{ApiError, ApiResult, AppState};

/// Blank rows offered under the stored items in edit mode
const BLANK_ROWS: usize = 3;

fn parse_type(letter: &str) -> ApiResult<KsecType> {
    KsecType::from_letter(letter).ok_or_else(|| ApiError::NotFound(format!("K/S/E/C type '{}'", letter)))
}

fn editor_url(curriculum_id: i64, semester: i64, ksec_type: KsecType) -> String {
    format!("/curriculum/{}/ksec/{}/{}", curriculum_id, semester, ksec_type.letter())
}

/// `"Year 2 / Term 1"` for semester 3
fn year_term(semester: i64) -> String {
    format!("Year {} / Term {}", (semester - 1) / 2 + 1, if semester % 2 == 1 { 1 } else { 2 })
}

fn type_tabs(curriculum_id: i64, semester: i64, current: KsecType) -> String {
    let links: Vec<String> = KsecType::ALL
        .iter()
        .map(|t| {
            if *t == current {
                format!("<strong>{}</strong>", t.name())
            } else {
                format!(r#"<a href="{}">{}</a>"#, editor_url(curriculum_id, semester, *t), t.name())
            }
        })
        .collect();
    format!("<p>{}</p>", links.join(" | "))
}

fn item_row(index: usize, id: Option<i64>, code: &str, category: &str, description: &str) -> String {
    format!(
        r#"<tr><td class="codes">{code}</td>
<td><input type="hidden" name="item_id_{i}" value="{id}"><select name="item_type_{i}">{choices}</select></td>
<td class="label"><input type="text" class="wide" name="item_{i}" value="{description}"></td></tr>"#,
        code = escape(code),
        i = index,
        id = id.map(|v| v.to_string()).unwrap_or_default(),
        choices = options(
            [KsecCategory::General, KsecCategory::Core]
                .iter()
                .map(|c| (c.as_str(), c.as_str())),
            category
        ),
        description = escape(description),
    )
}

/// GET /curriculum/:id/ksec/:semester/:type
pub async fn catalogue_page(
    State(state): State<AppState>,
    session: SessionHandle,
    Path((curriculum_id, semester, letter)): Path<(i64, i64, String)>,
) -> ApiResult<Html<String>> {
    let ksec_type = parse_type(&letter)?;
    let scope = Scope::of(&session, curriculum_id).await;

    let (curriculum, items) = {
        let mut conn = scope.conn(&state).await?;
        let curriculum = curricula::require(&mut conn, curriculum_id).await?;
        let items = ksec::list_type(&mut conn, curriculum_id, ksec_type).await?;
        (curriculum, items)
    };

    let mut body = type_tabs(curriculum_id, semester, ksec_type);
    if scope.can_edit() {
        let mut rows: String = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let code = item.code().map(|c| c.to_string()).unwrap_or_default();
                item_row(i, Some(item.id), &code, &item.category_type, &item.description)
            })
            .collect();
        for i in items.len()..items.len() + BLANK_ROWS {
            rows.push_str(&item_row(i, None, "new", KsecCategory::General.as_str(), ""));
        }
        body.push_str(&format!(
            r#"<form method="post" action="{url}">
<table><tr><th>Code</th><th>Category</th><th>Description</th></tr>{rows}</table>
<p class="muted">Clear a description to delete the item. Codes are renumbered per category on save.</p>
<button type="submit">Save {name} catalogue</button>
</form>"#,
            url = editor_url(curriculum_id, semester, ksec_type),
            rows = rows,
            name = ksec_type.name(),
        ));
    } else {
        let rows: String = items
            .iter()
            .map(|item| {
                format!(
                    r#"<tr><td class="codes">{}</td><td class="label">{}</td></tr>"#,
                    item.code().map(|c| c.to_string()).unwrap_or_default(),
                    escape(&item.description)
                )
            })
            .collect();
        body.push_str(&format!("<table><tr><th>Code</th><th>Description</th></tr>{}</table>", rows));
    }

    if check_semester(semester).is_ok() {
        body.push_str(&format!(
            r#"<p><a href="/curriculum/{}/ylo-studyplan/{}">Back to study plan</a></p>"#,
            curriculum_id, semester
        ));
    }
    body.push_str(&format!(
        r#"<p><a href="/curriculum/{}/credit-table">Back to credit table</a></p>"#,
        curriculum_id
    ));

    let chrome = scope.chrome(&session, &curriculum.name).await;
    Ok(html::page(&format!("{} catalogue", ksec_type.name()), &chrome, &body))
}

/// POST /curriculum/:id/ksec/:semester/:type
pub async fn catalogue_save(
    State(state): State<AppState>,
    session: SessionHandle,
    Path((curriculum_id, semester, letter)): Path<(i64, i64, String)>,
    form: Form<Vec<(String, String)>>,
) -> ApiResult<Redirect> {
    let form = FormFields::from(form);
    let ksec_type = parse_type(&letter)?;
    let scope = Scope::of(&session, curriculum_id).await;

    let result: ctm_common::Result<String> = async {
        scope.mode.require_edit(curriculum_id)?;
        let items = catalogue::parse_items(form.pairs())?;
        let outcome =
            catalogue::save_catalogue(state.mirror.pool(scope.store), curriculum_id, ksec_type, &items).await?;
        Ok(format!(
            "{} catalogue saved ({} updated, {} added, {} removed).",
            ksec_type.name(),
            outcome.updated,
            outcome.created,
            outcome.deleted
        ))
    }
    .await;

    finish(&session, editor_url(curriculum_id, semester, ksec_type), result).await
}

#[derive(Debug, Deserialize)]
pub struct PickerQuery {
    pub semester: Option<String>,
    #[serde(rename = "type")]
    pub ksec_type: Option<String>,
    pub course_id: Option<i64>,
}

/// GET /curriculum/:id/select-ksec?semester=&type=&course_id=
///
/// With a course in edit mode the picker posts the chosen codes to the
/// study-plan save, carrying the course's other three selections unchanged.
pub async fn picker_page(
    State(state): State<AppState>,
    session: SessionHandle,
    Path(curriculum_id): Path<i64>,
    Query(query): Query<PickerQuery>,
) -> ApiResult<Html<String>> {
    let semester = query.semester.as_deref().map(str::trim).unwrap_or_default();
    let letter = query.ksec_type.as_deref().map(str::trim).unwrap_or_default();
    if semester.is_empty() || letter.is_empty() {
        return Err(ApiError::BadRequest(
            "Please specify both the semester and the K/S/E/C type.".to_string(),
        ));
    }
    let semester: i64 = semester
        .parse()
        .map_err(|_| Error::invalid(format!("Bad semester '{}'", semester)))?;
    let semester = check_semester(semester)?;
    let ksec_type = KsecType::from_letter(letter)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown K/S/E/C type '{}'", letter)))?;
    let scope = Scope::of(&session, curriculum_id).await;

    let (curriculum, entries, course) = {
        let mut conn = scope.conn(&state).await?;
        let curriculum = curricula::require(&mut conn, curriculum_id).await?;
        let entries = ksec::catalogue(&mut conn, curriculum_id, ksec_type).await?;
        let course = match query.course_id {
            Some(id) => Some(courses::require(&mut conn, curriculum_id, id).await?),
            None => None,
        };
        (curriculum, entries, course)
    };

    let selected = course.as_ref().map(|c| c.ksec_codes(ksec_type)).unwrap_or_default();
    let field = course
        .as_ref()
        .map(|c| format!("{}_{}", ksec_type.letter().to_ascii_lowercase(), c.id));
    let picking = scope.can_edit() && field.is_some();

    let rows: String = entries
        .iter()
        .map(|(code, description)| {
            let mark = match (&field, picking) {
                (Some(name), true) => format!(
                    r#"<input type="checkbox" name="{}" value="{}"{}>"#,
                    name,
                    code,
                    if selected.contains(code) { " checked" } else { "" }
                ),
                _ if selected.contains(code) => "&#10003;".to_string(),
                _ => String::new(),
            };
            format!(
                r#"<tr><td>{}</td><td class="codes">{}</td><td class="label">{}</td></tr>"#,
                mark,
                code,
                escape(description)
            )
        })
        .collect();
    let table = format!(
        "<table><tr><th></th><th>Code</th><th>Description</th></tr>{}</table>",
        rows
    );

    let mut body = format!(
        r#"<p>{} - {}</p>"#,
        year_term(semester),
        ksec_type.name()
    );
    if let Some(course) = &course {
        body.push_str(&format!(
            r#"<p>Course: {} {}</p>"#,
            escape(&course.course_code),
            escape(&course.course_name)
        ));
    }

    match (&course, picking) {
        (Some(course), true) => {
            let carried: String = KsecType::ALL
                .iter()
                .filter(|t| **t != ksec_type)
                .map(|t| {
                    format!(
                        r#"<input type="hidden" name="{}_{}" value="{}">"#,
                        t.letter().to_ascii_lowercase(),
                        course.id,
                        escape(course.ksec_text(*t))
                    )
                })
                .collect();
            body.push_str(&format!(
                r#"<form method="post" action="/curriculum/{}/ylo-studyplan/{}/save">{}{}<button type="submit">Use selected codes</button></form>"#,
                curriculum_id, semester, carried, table
            ));
        }
        _ => body.push_str(&table),
    }
    if entries.is_empty() {
        body.push_str(&format!(
            r#"<p class="muted">The {} catalogue is empty. <a href="{}">Edit the catalogue</a></p>"#,
            ksec_type.name(),
            editor_url(curriculum_id, semester, ksec_type)
        ));
    }
    body.push_str(&format!(
        r#"<p><a href="/curriculum/{}/ylo-studyplan/{}">Back to study plan</a></p>"#,
        curriculum_id, semester
    ));

    let chrome = scope.chrome(&session, &curriculum.name).await;
    Ok(html::page(&format!("Select {} codes", ksec_type.name()), &chrome, &body))
}

pub fn ksec_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/curriculum/:id/ksec/:semester/:type",
            get(catalogue_page).post(catalogue_save),
        )
        .route("/curriculum/:id/select-ksec", get(picker_page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_term() {
        assert_eq!(year_term(1), "Year 1 / Term 1");
        assert_eq!(year_term(4), "Year 2 / Term 2");
        assert_eq!(year_term(7), "Year 4 / Term 1");
    }

    #[test]
    fn test_parse_type() {
        assert_eq!(parse_type("s").unwrap(), KsecType::Skills);
        assert!(matches!(parse_type("X"), Err(ApiError::NotFound(_))));
    }
}
