//! Visitor tracking endpoints
//!
//! - POST /track - Page view beacon; always 204
//! - GET /api/v1/admin/stats/visits?since= - Visit aggregates

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::VisitStats;
use crate::services::TrackEvent;

pub fn public_router() -> Router<AppState> {
    Router::new().route("/track", post(track))
}

pub fn admin_router() -> Router<AppState> {
    Router::new().route("/visits", get(visit_stats))
}

/// POST /track
///
/// The body is parsed by hand so malformed beacons still get a 204.
async fn track(State(state): State<AppState>, body: Bytes) -> StatusCode {
    let event = match serde_json::from_slice::<TrackEvent>(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring malformed tracking beacon");
            return StatusCode::NO_CONTENT;
        }
    };

    if let Err(e) = state.tracking_service.record(event).await {
        tracing::debug!(error = %e, "Tracking beacon not recorded");
    }
    StatusCode::NO_CONTENT
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub since: Option<DateTime<Utc>>,
}

/// GET /api/v1/admin/stats/visits
async fn visit_stats(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<VisitStats>, ApiError> {
    Ok(Json(state.tracking_service.stats(query.since).await?))
}
