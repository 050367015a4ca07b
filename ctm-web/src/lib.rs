//! ctm-web library - curriculum table manager web service
//!
//! Server-rendered pages over the editable and published stores, a PNG
//! chart, database downloads and a health endpoint.

use axum::Router;
use ctm_common::Mirror;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod chart;
pub mod error;
pub mod form;
pub mod html;
pub mod session;

pub use error::{ApiError, ApiResult};
pub use session::{SessionHandle, SessionStore};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Editable and snapshot stores
    pub mirror: Arc<Mirror>,
    /// In-process session map
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(mirror: Mirror) -> Self {
        Self {
            mirror: Arc::new(mirror),
            sessions: SessionStore::new(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;

    let pages = Router::new()
        .merge(api::select_routes())
        .merge(api::credit_table_routes())
        .merge(api::course_routes())
        .merge(api::plo_routes())
        .merge(api::ylo_routes())
        .merge(api::ksec_routes())
        .merge(api::clo_routes())
        .merge(api::summary_routes())
        .merge(api::graph_routes())
        .merge(api::sync_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::session_middleware,
        ));

    Router::new()
        .merge(pages)
        .merge(api::download_routes())
        .merge(api::health_routes())
        .merge(api::static_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
