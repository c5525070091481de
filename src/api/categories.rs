//! Category API endpoints
//!
//! Public:
//! - GET /api/v1/categories - Categories with published post counts
//! - GET /api/v1/categories/{slug} - Category landing page
//!
//! Admin:
//! - POST /api/v1/admin/categories
//! - PUT/DELETE /api/v1/admin/categories/{id}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::CollectionPageResponse;
use crate::db::repositories::PostFilter;
use crate::models::{Category, CategoryWithCount, CreateCategoryInput, UpdateCategoryInput};
use crate::services::seo::{category_breadcrumbs, category_path};

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories))
        .route("/{slug}", get(get_category_page))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_category).get(admin_list_categories))
        .route("/{id}", put(update_category).delete(delete_category))
}

/// GET /api/v1/categories
async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryWithCount>>, ApiError> {
    Ok(Json(state.category_service.list_with_counts().await?))
}

/// GET /api/v1/categories/{slug}?page=
async fn get_category_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<CollectionPageResponse<Category>>, ApiError> {
    let category = state.category_service.get_by_slug(&slug).await?;
    let settings = state.settings_service.get_site_settings().await?;

    let posts = state
        .post_service
        .list_published(
            &query.params(settings.posts_per_page),
            PostFilter::published().with_category(category.id),
        )
        .await?;

    let name = category.name.clone();
    let description = category.description.clone();
    let path = category_path(&category.slug);
    let breadcrumbs = category_breadcrumbs(&category);
    Ok(Json(CollectionPageResponse::build(
        category,
        &name,
        description.as_deref(),
        &path,
        breadcrumbs,
        posts,
        &settings,
    )))
}

/// GET /api/v1/admin/categories
async fn admin_list_categories(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<CategoryWithCount>>, ApiError> {
    Ok(Json(state.category_service.list_with_counts().await?))
}

/// POST /api/v1/admin/categories
async fn create_category(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(input): Json<CreateCategoryInput>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let category = state.category_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /api/v1/admin/categories/{id}
async fn update_category(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(input): Json<UpdateCategoryInput>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.category_service.update(id, input).await?))
}

/// DELETE /api/v1/admin/categories/{id}
///
/// Posts in the category move to the default category.
async fn delete_category(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.category_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
