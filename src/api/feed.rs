//! RSS feed endpoints
//!
//! - GET /feed.xml - Public feed
//! - GET /api/v1/admin/feed/download - Same document as a file download

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::services::feed::RSS_CONTENT_TYPE;

pub fn public_router() -> Router<AppState> {
    Router::new().route("/feed.xml", get(get_feed))
}

pub fn admin_router() -> Router<AppState> {
    Router::new().route("/download", get(download_feed))
}

/// GET /feed.xml
async fn get_feed(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let xml = state.feed_service.rss().await?;
    Ok(([(header::CONTENT_TYPE, RSS_CONTENT_TYPE)], xml))
}

/// GET /api/v1/admin/feed/download
async fn download_feed(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let xml = state.feed_service.rss().await?;
    Ok((
        [
            (header::CONTENT_TYPE, RSS_CONTENT_TYPE),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"feed.xml\""),
        ],
        xml,
    ))
}
