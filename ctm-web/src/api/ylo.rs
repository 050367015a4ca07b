//! Semester study plan: YLO entries and the K/S/E/C codes of each course

use axum::{
    extract::{Path, State},
    response::{Html, Redirect},
    routing::{get, post},
    Form, Router,
};
use ctm_common::codes::KsecType;
use ctm_common::course_list::{self, CourseKsec};
use ctm_common::db::{check_semester, courses, curricula, semester_label, ylo, YloEntry};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use super::{finish, Scope};
use crate::form::FormFields;
use crate::html::{self, escape};
use crate::session::SessionHandle;
use crate::{ApiResult, AppState};

static KSEC_FIELD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([kesc])_(\d+)$").expect("static regex"));

/// `(code, text)` for entries with text, numbered over every entry of the semester
pub(crate) fn coded_entries(entries: &[YloEntry], semester: i64) -> Vec<(String, String)> {
    entries
        .iter()
        .enumerate()
        .filter(|(_, e)| !e.summary_text.trim().is_empty())
        .map(|(i, e)| {
            (
                format!("YLO {}-{}", semester_label(semester), i + 1),
                e.summary_text.trim().to_string(),
            )
        })
        .collect()
}

/// Group `k_<id>`, `s_<id>`, `e_<id>`, `c_<id>` fields per course id
///
/// Repeated fields (checkbox lists) are joined with commas.
pub(crate) fn parse_study_plan<'a>(
    fields: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> ctm_common::Result<Vec<CourseKsec>> {
    let mut grouped: BTreeMap<i64, [String; 4]> = BTreeMap::new();
    for (key, value) in fields {
        let Some(caps) = KSEC_FIELD_RE.captures(key) else {
            continue;
        };
        let Ok(course_id) = caps[2].parse::<i64>() else {
            continue;
        };
        let slot = match &caps[1] {
            "k" => 0,
            "s" => 1,
            "e" => 2,
            _ => 3,
        };
        let text = &mut grouped.entry(course_id).or_default()[slot];
        let value = value.trim();
        if !value.is_empty() {
            if !text.is_empty() {
                text.push_str(", ");
            }
            text.push_str(value);
        }
    }

    grouped
        .into_iter()
        .map(|(course_id, [k, s, e, c])| CourseKsec::parse(course_id, &k, &s, &e, &c))
        .collect()
}

fn page_url(curriculum_id: i64, semester: i64) -> String {
    format!("/curriculum/{}/ylo-studyplan/{}", curriculum_id, semester)
}

/// GET /curriculum/:id/ylo-studyplan/:semester
pub async fn study_plan_page(
    State(state): State<AppState>,
    session: SessionHandle,
    Path((curriculum_id, semester)): Path<(i64, i64)>,
) -> ApiResult<Html<String>> {
    let semester = check_semester(semester)?;
    let scope = Scope::of(&session, curriculum_id).await;

    let (curriculum, listed, entries) = {
        let mut conn = scope.conn(&state).await?;
        let curriculum = curricula::require(&mut conn, curriculum_id).await?;
        let listed = courses::list_semester(&mut conn, curriculum_id, semester).await?;
        let entries = ylo::list_semester(&mut conn, curriculum_id, semester).await?;
        (curriculum, listed, entries)
    };
    let editing = scope.can_edit();

    let coded = coded_entries(&entries, semester);
    let ylo_list: String = if coded.is_empty() {
        r#"<p class="muted">No YLO text for this semester.</p>"#.to_string()
    } else {
        let items: String = coded
            .iter()
            .map(|(code, text)| format!("<li><strong>{}</strong> {}</li>", escape(code), escape(text)))
            .collect();
        format!("<ul>{}</ul>", items)
    };

    let mut rows = String::new();
    for course in &listed {
        rows.push_str(&format!(
            r#"<tr><td>{}</td><td class="label">{}<br><a href="/curriculum/{}/clo-ksec-mapping/{}?from_link=1">CLO mapping</a></td><td>{}</td>"#,
            escape(&course.course_code),
            escape(&course.course_name),
            curriculum_id,
            course.id,
            course.credits
        ));
        for ksec_type in KsecType::ALL {
            let text = course.ksec_text(ksec_type);
            if editing {
                rows.push_str(&format!(
                    r#"<td><input type="text" name="{}_{}" value="{}"><br><a href="/curriculum/{}/select-ksec?semester={}&amp;type={}&amp;course_id={}">choose</a></td>"#,
                    ksec_type.letter().to_ascii_lowercase(),
                    course.id,
                    escape(text),
                    curriculum_id,
                    semester,
                    ksec_type.letter(),
                    course.id
                ));
            } else {
                rows.push_str(&format!(r#"<td class="codes">{}</td>"#, escape(text)));
            }
        }
        rows.push_str("</tr>");
    }

    let table = format!(
        "<table><tr><th>Code</th><th>Course</th><th>Credits</th><th>Knowledge</th><th>Skills</th><th>Ethics</th><th>Character</th></tr>{}</table>",
        rows
    );
    let plan = if editing && !listed.is_empty() {
        format!(
            r#"<form method="post" action="{}/save">{}<button type="submit">Save study plan</button></form>"#,
            page_url(curriculum_id, semester),
            table
        )
    } else {
        table
    };

    let body = format!(
        r#"<h2>Year learning outcomes</h2>{}<h2>Courses</h2>{}<p><a href="/curriculum/{}/credit-table">Back to credit table</a></p>"#,
        ylo_list, plan, curriculum_id
    );

    let chrome = scope.chrome(&session, &curriculum.name).await;
    Ok(html::page(
        &format!("Study plan - Year {}", semester_label(semester)),
        &chrome,
        &body,
    ))
}

/// POST /curriculum/:id/ylo-studyplan/:semester/save
pub async fn study_plan_save(
    State(state): State<AppState>,
    session: SessionHandle,
    Path((curriculum_id, semester)): Path<(i64, i64)>,
    form: Form<Vec<(String, String)>>,
) -> ApiResult<Redirect> {
    let form = FormFields::from(form);
    let scope = Scope::of(&session, curriculum_id).await;

    let result: ctm_common::Result<String> = async {
        scope.mode.require_edit(curriculum_id)?;
        let updates = parse_study_plan(form.pairs())?;
        let saved =
            course_list::save_study_plan(state.mirror.pool(scope.store), curriculum_id, semester, &updates).await?;
        Ok(format!("Study plan saved for {} courses.", saved))
    }
    .await;

    finish(&session, page_url(curriculum_id, semester), result).await
}

pub fn ylo_routes() -> Router<AppState> {
    Router::new()
        .route("/curriculum/:id/ylo-studyplan/:semester", get(study_plan_page))
        .route("/curriculum/:id/ylo-studyplan/:semester/save", post(study_plan_save))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(plo: &str, text: &str) -> YloEntry {
        YloEntry {
            id: 0,
            curriculum_id: 1,
            plo: plo.to_string(),
            semester: 3,
            summary_text: text.to_string(),
        }
    }

    #[test]
    fn test_coded_entries_keep_numbering() {
        let entries = vec![entry("PLO1", "Apply"), entry("PLO2", " "), entry("PLO3", "Design")];
        let coded = coded_entries(&entries, 3);
        assert_eq!(
            coded,
            vec![
                ("YLO 2/1-1".to_string(), "Apply".to_string()),
                ("YLO 2/1-3".to_string(), "Design".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_study_plan_groups_by_course() {
        let fields = vec![
            ("k_4", "ge(k)1"),
            ("s_4", ""),
            ("c_9", "CE(C)2"),
            ("other", "x"),
        ];
        let plan = parse_study_plan(fields).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].course_id, 4);
        assert_eq!(plan[0].knowledge.to_string(), "GE(K)1");
        assert_eq!(plan[1].character.to_string(), "CE(C)2");
    }

    #[test]
    fn test_parse_study_plan_joins_repeated_fields() {
        let fields = vec![("k_4", "GE(K)1"), ("k_4", ""), ("k_4", "CE(K)2")];
        let plan = parse_study_plan(fields).unwrap();
        assert_eq!(plan[0].knowledge.to_string(), "GE(K)1, CE(K)2");
    }

    #[test]
    fn test_parse_study_plan_rejects_wrong_type() {
        assert!(parse_study_plan(vec![("k_4", "GE(S)1")]).is_err());
    }
}
