//! Topic hub API endpoints
//!
//! Public:
//! - GET /api/v1/hubs
//! - GET /api/v1/hubs/{slug} - Hub landing page
//!
//! Admin:
//! - GET/POST /api/v1/admin/hubs
//! - PUT/DELETE /api/v1/admin/hubs/{id}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::CollectionPageResponse;
use crate::db::repositories::PostFilter;
use crate::models::{CreateHubInput, Hub, UpdateHubInput};
use crate::services::seo::{hub_breadcrumbs, hub_path};

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_hubs))
        .route("/{slug}", get(get_hub_page))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_hubs_admin).post(create_hub))
        .route("/{id}", put(update_hub).delete(delete_hub))
}

/// GET /api/v1/hubs
async fn list_hubs(State(state): State<AppState>) -> Result<Json<Vec<Hub>>, ApiError> {
    Ok(Json(state.hub_service.list().await?))
}

/// GET /api/v1/hubs/{slug}?page=
async fn get_hub_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<CollectionPageResponse<Hub>>, ApiError> {
    let hub = state.hub_service.get_by_slug(&slug).await?;
    let settings = state.settings_service.get_site_settings().await?;

    let posts = state
        .post_service
        .list_published(
            &query.params(settings.posts_per_page),
            PostFilter::published().with_hub(hub.id),
        )
        .await?;

    let name = hub.name.clone();
    let description = hub.description.clone();
    let path = hub_path(&hub.slug);
    let breadcrumbs = hub_breadcrumbs(&hub);
    Ok(Json(CollectionPageResponse::build(
        hub,
        &name,
        description.as_deref(),
        &path,
        breadcrumbs,
        posts,
        &settings,
    )))
}

/// GET /api/v1/admin/hubs
async fn list_hubs_admin(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<Hub>>, ApiError> {
    Ok(Json(state.hub_service.list().await?))
}

/// POST /api/v1/admin/hubs
async fn create_hub(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(input): Json<CreateHubInput>,
) -> Result<(StatusCode, Json<Hub>), ApiError> {
    let hub = state.hub_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(hub)))
}

/// PUT /api/v1/admin/hubs/{id}
async fn update_hub(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(input): Json<UpdateHubInput>,
) -> Result<Json<Hub>, ApiError> {
    Ok(Json(state.hub_service.update(id, input).await?))
}

/// DELETE /api/v1/admin/hubs/{id}
///
/// Posts in the hub are kept and detached.
async fn delete_hub(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.hub_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
