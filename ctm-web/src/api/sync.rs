//! Publish (promote) and restore actions

use axum::{
    extract::{Path, State},
    response::Redirect,
    routing::post,
    Router,
};
use ctm_common::mirror::SyncReport;
use ctm_common::Error;
use tracing::{error, info, warn};

use super::Scope;
use crate::session::{FlashLevel, SessionHandle};
use crate::{ApiResult, AppState};

/// Flash the outcome of a sync job and go back to the credit table
///
/// Store failures are reported on the page rather than as an error page.
async fn report(session: &SessionHandle, curriculum_id: i64, outcome: ctm_common::Result<SyncReport>) -> Redirect {
    match outcome {
        Ok(report) => {
            info!("Session {}: {}", session.id(), report);
            session
                .flash(
                    FlashLevel::Success,
                    format!(
                        "Copied {} credit rows, {} courses, {} K/S/E/C items, {} YLO entries and {} CLOs from {} to {}.",
                        report.credit_rows,
                        report.courses,
                        report.ksec_items,
                        report.ylo_entries,
                        report.clos,
                        report.direction.source(),
                        report.direction.target()
                    ),
                )
                .await
        }
        Err(Error::Forbidden(message)) => {
            warn!("Refused sync for curriculum {}: {}", curriculum_id, message);
            session.flash(FlashLevel::Error, message).await
        }
        Err(e) => {
            error!("Sync of curriculum {} failed: {}", curriculum_id, e);
            session.flash(FlashLevel::Error, format!("Sync failed: {}", e)).await
        }
    }
    Redirect::to(&format!("/curriculum/{}/credit-table", curriculum_id))
}

/// POST /curriculum/:id/backup
pub async fn backup(
    State(state): State<AppState>,
    session: SessionHandle,
    Path(curriculum_id): Path<i64>,
) -> ApiResult<Redirect> {
    let scope = Scope::of(&session, curriculum_id).await;
    let outcome = if scope.can_edit() {
        state.mirror.promote(curriculum_id).await
    } else {
        Err(Error::Forbidden("You must be in Edit mode to back up data.".to_string()))
    };
    Ok(report(&session, curriculum_id, outcome).await)
}

/// POST /curriculum/:id/restore
pub async fn restore(
    State(state): State<AppState>,
    session: SessionHandle,
    Path(curriculum_id): Path<i64>,
) -> ApiResult<Redirect> {
    let scope = Scope::of(&session, curriculum_id).await;
    let outcome = if scope.can_edit() {
        state.mirror.restore(curriculum_id).await
    } else {
        Err(Error::Forbidden("You must be in Edit mode to restore data.".to_string()))
    };
    Ok(report(&session, curriculum_id, outcome).await)
}

pub fn sync_routes() -> Router<AppState> {
    Router::new()
        .route("/curriculum/:id/backup", post(backup))
        .route("/curriculum/:id/restore", post(restore))
}
