//! Post API endpoints
//!
//! Public:
//! - GET /api/v1/posts - Published posts (filters: category, hub, author, q)
//! - GET /api/v1/posts/{slug} - Post page with SEO, breadcrumbs and JSON-LD
//! - GET /api/v1/posts/{slug}/comparison - Comparison table, sortable
//!
//! Admin:
//! - GET/POST /api/v1/admin/posts
//! - GET /api/v1/admin/posts/table - Sortable post table
//! - GET/PUT/DELETE /api/v1/admin/posts/{id}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{default_page, default_per_page, PaginationQuery, SortQuery};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{
    CategoryInfo, ListResponse, PostPageResponse, PostSummary, StructuredData,
};
use crate::db::repositories::PostFilter;
use crate::models::{
    ComparisonTable, CreatePostInput, ListParams, Post, PostStatus, UpdatePostInput,
};
use crate::services::schema;
use crate::services::seo::{post_breadcrumbs, SeoMeta};

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts))
        .route("/{slug}", get(get_post_page))
        .route("/{slug}/comparison", get(get_comparison))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(admin_list_posts).post(create_post))
        .route("/table", get(admin_post_table))
        .route("/{id}", get(admin_get_post).put(update_post).delete(delete_post))
}

/// Public listing filters, by slug
#[derive(Debug, Default, Deserialize)]
pub struct PostListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    pub per_page: Option<u32>,
    pub category: Option<String>,
    pub hub: Option<String>,
    pub author: Option<String>,
    pub q: Option<String>,
}

/// GET /api/v1/posts
async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PostListQuery>,
) -> Result<Json<ListResponse<PostSummary>>, ApiError> {
    let settings = state.settings_service.get_site_settings().await?;
    let params = PaginationQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .params(settings.posts_per_page);

    let mut filter = PostFilter::published();
    if let Some(slug) = query.category.as_deref() {
        filter = filter.with_category(state.category_service.get_by_slug(slug).await?.id);
    }
    if let Some(slug) = query.hub.as_deref() {
        filter = filter.with_hub(state.hub_service.get_by_slug(slug).await?.id);
    }
    if let Some(slug) = query.author.as_deref() {
        filter = filter.with_author(state.author_service.get_by_slug(slug).await?.id);
    }
    if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        filter = filter.with_search(q);
    }

    let result = state.post_service.list_published(&params, filter).await?;
    Ok(Json(ListResponse::from_paged(result, |p| PostSummary::from(&p))))
}

/// GET /api/v1/posts/{slug}
async fn get_post_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PostPageResponse>, ApiError> {
    let post = state.post_service.get_published_by_slug(&slug).await?;
    let settings = state.settings_service.get_site_settings().await?;

    // Related entities are optional decorations of the page
    let category = state.category_service.get_by_id(post.category_id).await.ok();
    let author = match post.author_id {
        Some(id) => state.author_service.get_by_id(id).await.ok(),
        None => None,
    };
    let hub = match post.hub_id {
        Some(id) => state.hub_service.get_by_id(id).await.ok(),
        None => None,
    };

    let breadcrumbs = post_breadcrumbs(&post, category.as_ref());
    let mut json_ld = vec![
        schema::blog_posting(&post, author.as_ref(), category.as_ref(), &settings),
        schema::breadcrumb_list(&breadcrumbs, &settings),
    ];
    json_ld.extend(schema::faq_page(&post.faqs));

    Ok(Json(PostPageResponse {
        seo: SeoMeta::for_post(&post, &settings),
        category: category.as_ref().map(CategoryInfo::from),
        author,
        hub,
        breadcrumbs,
        structured_data: StructuredData::new(json_ld),
        post,
    }))
}

/// GET /api/v1/posts/{slug}/comparison?sort=&dir=
async fn get_comparison(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(sort): Query<SortQuery>,
) -> Result<Json<ComparisonTable>, ApiError> {
    state
        .post_service
        .sorted_comparison(&slug, sort.column(), sort.direction())
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Post has no comparison table"))
}

#[derive(Debug, Deserialize)]
pub struct AdminPostListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    pub status: Option<String>,
    pub q: Option<String>,
}

/// GET /api/v1/admin/posts
async fn admin_list_posts(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<AdminPostListQuery>,
) -> Result<Json<ListResponse<Post>>, ApiError> {
    let mut filter = PostFilter::default();
    if let Some(status) = query.status.as_deref().filter(|s| !s.is_empty()) {
        filter.status = Some(
            PostStatus::parse(status)
                .ok_or_else(|| ApiError::validation_error(format!("Unknown status: {}", status)))?,
        );
    }
    if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        filter = filter.with_search(q);
    }

    let result = state
        .post_service
        .list(&ListParams::new(query.page, query.per_page), &filter)
        .await?;
    Ok(Json(ListResponse::from_paged(result, |p| p)))
}

/// GET /api/v1/admin/posts/table?sort=&dir=
async fn admin_post_table(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(sort): Query<SortQuery>,
) -> Result<Json<Vec<serde_json::Value>>, ApiError> {
    let rows = state
        .post_service
        .admin_table(sort.column().unwrap_or_default(), sort.direction())
        .await?;
    Ok(Json(rows))
}

/// POST /api/v1/admin/posts
async fn create_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(input): Json<CreatePostInput>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    let post = state.post_service.create(input).await?;
    tracing::debug!(user_id = user.0.id, post_id = post.id, "Post created via API");
    Ok((StatusCode::CREATED, Json(post)))
}

/// GET /api/v1/admin/posts/{id}
async fn admin_get_post(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<Post>, ApiError> {
    Ok(Json(state.post_service.get_by_id(id).await?))
}

/// PUT /api/v1/admin/posts/{id}
async fn update_post(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(input): Json<UpdatePostInput>,
) -> Result<Json<Post>, ApiError> {
    if !input.has_changes() {
        return Err(ApiError::validation_error("No changes provided"));
    }
    Ok(Json(state.post_service.update(id, input).await?))
}

/// DELETE /api/v1/admin/posts/{id}
async fn delete_post(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.post_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
