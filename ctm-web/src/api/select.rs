//! Curriculum selection and access-mode switch

use axum::{
    extract::State,
    response::{Html, Redirect},
    routing::get,
    Form, Router,
};
use ctm_common::access::{self, RequestedMode};
use ctm_common::db::curricula;
use ctm_common::{AccessMode, Error, StoreKind};
use tracing::info;

use super::finish;
use crate::form::FormFields;
use crate::html::{self, escape, Chrome};
use crate::session::{FlashLevel, SessionHandle};
use crate::{ApiResult, AppState};

/// GET /
///
/// Lists the curricula of the published snapshot.
pub async fn select_page(State(state): State<AppState>, session: SessionHandle) -> ApiResult<Html<String>> {
    let listed = {
        let mut conn = state.mirror.pool(StoreKind::Snapshot).acquire().await?;
        curricula::list(&mut conn).await?
    };
    let mode = session.mode().await;

    let choices: String = listed
        .iter()
        .map(|c| format!(r#"<option value="{}">{}</option>"#, c.id, escape(&c.name)))
        .collect();
    let empty_note = if listed.is_empty() {
        r#"<p class="muted">No curriculum has been published yet.</p>"#
    } else {
        ""
    };

    let body = format!(
        r#"{empty_note}
<form method="post" action="/">
  <table>
    <tr><th>Curriculum</th><td class="label"><select name="curriculum"><option value="">Select...</option>{choices}</select></td></tr>
    <tr><th>Mode</th><td class="label">
      <label><input type="radio" name="mode" value="view" checked> View</label>
      <label><input type="radio" name="mode" value="edit"> Edit</label>
    </td></tr>
    <tr><th>Password</th><td class="label"><input type="password" name="password"> <span class="muted">(edit mode only)</span></td></tr>
  </table>
  <button type="submit">Open</button>
</form>
<p class="muted">Current mode: {mode}</p>
<div class="actions">
  <a class="button" href="/download-db/real">Download real.sqlite3</a>
  <a class="button" href="/download-db/example">Download example.sqlite3</a>
  <a class="button" href="/download-db/all">Download both (zip)</a>
</div>"#,
        empty_note = empty_note,
        choices = choices,
        mode = mode,
    );

    let chrome = Chrome {
        mode_label: if matches!(mode, AccessMode::Edit { .. }) { "edit" } else { "view" },
        curriculum: None,
        flashes: session.take_flashes().await,
    };
    Ok(html::page("Select curriculum", &chrome, &body))
}

/// POST /
///
/// `curriculum`, `mode`, `password`. A rejected password keeps the prior mode.
pub async fn select_submit(
    State(state): State<AppState>,
    session: SessionHandle,
    form: Form<Vec<(String, String)>>,
) -> ApiResult<Redirect> {
    let form = FormFields::from(form);
    let selected = form.get("curriculum");
    if selected.is_empty() {
        session.flash(FlashLevel::Warning, "Please select a curriculum.").await;
        return Ok(Redirect::to("/"));
    }
    let curriculum_id: i64 = selected
        .parse()
        .map_err(|_| Error::invalid(format!("Bad curriculum id '{}'", selected)))?;

    let requested: ctm_common::Result<RequestedMode> = form.get("mode").parse();
    let outcome = match requested {
        Ok(requested) => access::transition(&state.mirror, curriculum_id, requested, &form.get("password")).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(mode) => {
            info!("Session {} switched to {}", session.id(), mode);
            session.set_mode(mode).await;
            Ok(Redirect::to(&format!("/curriculum/{}/credit-table", curriculum_id)))
        }
        Err(e) => finish(&session, "/".to_string(), Err(e)).await,
    }
}

pub fn select_routes() -> Router<AppState> {
    Router::new().route("/", get(select_page).post(select_submit))
}
