//! Ad-block bait asset
//!
//! `GET /ads/bait.js` is fetched by `BaitDetector`; a blocker that drops the
//! request marks the visitor as blocking.

use axum::{
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};

use crate::api::middleware::AppState;
use crate::services::adblock::BAIT_SCRIPT;

pub fn router() -> Router<AppState> {
    Router::new().route("/ads/bait.js", get(bait_script))
}

async fn bait_script() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        BAIT_SCRIPT,
    )
}
