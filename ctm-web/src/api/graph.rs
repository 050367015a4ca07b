//! PLO credit chart

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use ctm_common::db::{credit_rows, curricula, RowKind};
use tracing::debug;

use super::Scope;
use crate::chart;
use crate::session::SessionHandle;
use crate::{ApiError, ApiResult, AppState};

/// GET /curriculum/:id/plo-graph
///
/// One bar per PLO row stacked by year; a placeholder image when there are
/// no PLO rows.
pub async fn plo_graph(
    State(state): State<AppState>,
    session: SessionHandle,
    Path(curriculum_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let scope = Scope::of(&session, curriculum_id).await;
    let rows = {
        let mut conn = scope.conn(&state).await?;
        curricula::require(&mut conn, curriculum_id).await?;
        credit_rows::list_kind(&mut conn, curriculum_id, RowKind::Plo).await?
    };

    let stacks = chart::stacks_for_rows(&rows);
    debug!("Rendering PLO chart of curriculum {} with {} bars", curriculum_id, stacks.len());
    let png = tokio::task::spawn_blocking(move || chart::render_stacked_bars(&stacks))
        .await
        .map_err(|e| ApiError::Internal(format!("Chart task failed: {}", e)))??;

    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
        ],
        png,
    ))
}

pub fn graph_routes() -> Router<AppState> {
    Router::new().route("/curriculum/:id/plo-graph", get(plo_graph))
}
