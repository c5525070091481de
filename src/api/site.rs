//! Site information and settings API
//!
//! - GET /api/v1/site - Public site settings, home page SEO and JSON-LD
//! - GET/PUT /api/v1/admin/settings - Site settings (admin only)

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{PostSummary, StructuredData};
use crate::services::schema;
use crate::services::seo::SeoMeta;
use crate::services::settings::UpdateSettingsInput;
use crate::services::SiteSettings;

/// Home page view model
#[derive(Debug, Serialize)]
pub struct SiteResponse {
    pub settings: SiteSettings,
    pub seo: SeoMeta,
    pub structured_data: StructuredData,
    pub latest_posts: Vec<PostSummary>,
    pub published_count: i64,
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/", get(get_site))
}

pub fn settings_router() -> Router<AppState> {
    Router::new().route("/", get(get_settings).put(update_settings))
}

/// GET /api/v1/site
async fn get_site(State(state): State<AppState>) -> Result<Json<SiteResponse>, ApiError> {
    let settings = state.settings_service.get_site_settings().await?;
    let latest = state
        .post_service
        .latest_published(i64::from(settings.posts_per_page))
        .await?;
    let published_count = state.post_service.count_published().await?;

    Ok(Json(SiteResponse {
        seo: SeoMeta::for_home(&settings),
        structured_data: StructuredData::new(vec![
            schema::website(&settings),
            schema::organization(&settings),
        ]),
        latest_posts: latest.iter().map(PostSummary::from).collect(),
        published_count,
        settings,
    }))
}

/// GET /api/v1/admin/settings
async fn get_settings(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<SiteSettings>, ApiError> {
    Ok(Json(state.settings_service.get_site_settings().await?))
}

/// PUT /api/v1/admin/settings
async fn update_settings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(input): Json<UpdateSettingsInput>,
) -> Result<Json<SiteSettings>, ApiError> {
    let settings = state.settings_service.update(input).await?;
    tracing::info!(user_id = user.0.id, "Settings updated via API");
    Ok(Json(settings))
}
