//! Embedded stylesheet

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::AppState;

const CTM_CSS: &str = include_str!("../../static/ctm.css");

/// GET /static/ctm.css
pub async fn serve_ctm_css() -> Response {
    (
        StatusCode::OK,
        [
            ("content-type", "text/css"),
            ("cache-control", "no-cache, no-store, must-revalidate"),
        ],
        CTM_CSS,
    )
        .into_response()
}

pub fn static_routes() -> Router<AppState> {
    Router::new().route("/static/ctm.css", get(serve_ctm_css))
}
