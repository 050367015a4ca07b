//! HTTP handlers for ctm-web

mod clo;
mod courses;
mod credit_table;
mod download;
mod graph;
mod health;
mod ksec;
mod plo;
mod select;
mod static_assets;
mod summary;
mod sync;
mod ylo;

pub use clo::clo_routes;
pub use courses::course_routes;
pub use credit_table::credit_table_routes;
pub use download::download_routes;
pub use graph::graph_routes;
pub use health::{health_routes, HealthResponse};
pub use ksec::ksec_routes;
pub use plo::plo_routes;
pub use select::select_routes;
pub use static_assets::static_routes;
pub use summary::summary_routes;
pub use sync::sync_routes;
pub use ylo::ylo_routes;

use axum::response::Redirect;
use ctm_common::codes::{KsecCode, KsecType};
use ctm_common::db::ksec as ksec_db;
use ctm_common::{AccessMode, Error, StoreKind};
use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection};
use std::collections::HashMap;
use tracing::warn;

use crate::html::Chrome;
use crate::session::{FlashLevel, SessionHandle};
use crate::{ApiResult, AppState};

/// Access mode and store a request resolves to for one curriculum
#[derive(Debug, Clone, Copy)]
pub(crate) struct Scope {
    pub curriculum_id: i64,
    pub mode: AccessMode,
    pub store: StoreKind,
}

impl Scope {
    pub async fn of(session: &SessionHandle, curriculum_id: i64) -> Self {
        let mode = session.mode().await;
        Self {
            curriculum_id,
            mode,
            store: mode.store_for(curriculum_id),
        }
    }

    pub fn can_edit(&self) -> bool {
        self.mode.can_edit(self.curriculum_id)
    }

    pub async fn conn(&self, state: &AppState) -> ApiResult<PoolConnection<Sqlite>> {
        Ok(state.mirror.pool(self.store).acquire().await?)
    }

    /// Page chrome for this curriculum; takes the pending flashes
    pub async fn chrome(&self, session: &SessionHandle, curriculum_name: &str) -> Chrome {
        Chrome {
            mode_label: self.mode.label_for(self.curriculum_id),
            curriculum: Some((self.curriculum_id, curriculum_name.to_string())),
            flashes: session.take_flashes().await,
        }
    }
}

/// Catalogue codes of every type with their descriptions
pub(crate) type DescribedCatalogues = HashMap<KsecType, Vec<(KsecCode, String)>>;

pub(crate) async fn described_catalogues(
    conn: &mut SqliteConnection,
    curriculum_id: i64,
) -> ctm_common::Result<DescribedCatalogues> {
    let mut catalogues = DescribedCatalogues::new();
    for ksec_type in KsecType::ALL {
        catalogues.insert(ksec_type, ksec_db::catalogue(conn, curriculum_id, ksec_type).await?);
    }
    Ok(catalogues)
}

/// Report the outcome of a state-changing request and redirect to `back`
///
/// Success, authorization and validation outcomes become flash messages.
/// Missing records and store failures propagate as error pages.
pub(crate) async fn finish(
    session: &SessionHandle,
    back: String,
    result: ctm_common::Result<String>,
) -> ApiResult<Redirect> {
    match result {
        Ok(message) => session.flash(FlashLevel::Success, message).await,
        Err(Error::Forbidden(message)) => {
            warn!("Refused request: {}", message);
            session.flash(FlashLevel::Error, message).await
        }
        Err(Error::InvalidInput(message)) => session.flash(FlashLevel::Warning, message).await,
        Err(other) => return Err(other.into()),
    }
    Ok(Redirect::to(&back))
}
