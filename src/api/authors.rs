//! Author API endpoints
//!
//! Public:
//! - GET /api/v1/authors
//! - GET /api/v1/authors/{slug} - Profile page with the author's posts
//!
//! Admin:
//! - GET/POST /api/v1/admin/authors
//! - PUT/DELETE /api/v1/admin/authors/{id}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{AuthorPageResponse, ListResponse, PostSummary, StructuredData};
use crate::db::repositories::PostFilter;
use crate::models::{Author, CreateAuthorInput, UpdateAuthorInput};
use crate::services::schema;
use crate::services::seo::{author_path, SeoMeta};

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_authors))
        .route("/{slug}", get(get_author_page))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(admin_list_authors).post(create_author))
        .route("/{id}", put(update_author).delete(delete_author))
}

/// GET /api/v1/authors
async fn list_authors(State(state): State<AppState>) -> Result<Json<Vec<Author>>, ApiError> {
    Ok(Json(state.author_service.list().await?))
}

/// GET /api/v1/authors/{slug}?page=
async fn get_author_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<AuthorPageResponse>, ApiError> {
    let author = state.author_service.get_by_slug(&slug).await?;
    let settings = state.settings_service.get_site_settings().await?;

    let posts = state
        .post_service
        .list_published(
            &query.params(settings.posts_per_page),
            PostFilter::published().with_author(author.id),
        )
        .await?;

    Ok(Json(AuthorPageResponse {
        seo: SeoMeta::for_page(
            &author.name,
            author.bio.as_deref(),
            &author_path(&author.slug),
            &settings,
        ),
        structured_data: StructuredData::new(vec![schema::person(&author, &settings)]),
        posts: ListResponse::from_paged(posts, |p| PostSummary::from(&p)),
        author,
    }))
}

/// GET /api/v1/admin/authors
async fn admin_list_authors(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<Author>>, ApiError> {
    Ok(Json(state.author_service.list().await?))
}

/// POST /api/v1/admin/authors
async fn create_author(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(input): Json<CreateAuthorInput>,
) -> Result<(StatusCode, Json<Author>), ApiError> {
    let author = state.author_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(author)))
}

/// PUT /api/v1/admin/authors/{id}
async fn update_author(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(input): Json<UpdateAuthorInput>,
) -> Result<Json<Author>, ApiError> {
    Ok(Json(state.author_service.update(id, input).await?))
}

/// DELETE /api/v1/admin/authors/{id}
async fn delete_author(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.author_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
