//! Media library API endpoints
//!
//! - POST /api/v1/admin/media - Upload one file (multipart field `file`)
//! - GET /api/v1/admin/media - Paginated media library
//! - GET/DELETE /api/v1/admin/media/{id}
//!
//! Stored files are served from `/uploads` unless the object store took them.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::api::common::AdminPaginationQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::ListResponse;
use crate::models::Media;

/// Multipart field carrying the upload
const FILE_FIELD: &str = "file";

/// Build the media router. `max_upload_bytes` caps the request body.
pub fn admin_router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(list_media).post(upload_media))
        .route("/{id}", get(get_media).delete(delete_media))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// POST /api/v1/admin/media
async fn upload_media(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Media>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation_error(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let original_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation_error(format!("Failed to read file: {}", e)))?;

        let media = state
            .media_service
            .upload(&original_name, &content_type, data)
            .await?;
        tracing::debug!(user_id = user.0.id, media_id = media.id, "Media uploaded via API");
        return Ok((StatusCode::CREATED, Json(media)));
    }

    Err(ApiError::validation_error("No file provided"))
}

/// GET /api/v1/admin/media
async fn list_media(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<AdminPaginationQuery>,
) -> Result<Json<ListResponse<Media>>, ApiError> {
    let result = state.media_service.list(&query.params()).await?;
    Ok(Json(ListResponse::from_paged(result, |m| m)))
}

/// GET /api/v1/admin/media/{id}
async fn get_media(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<Media>, ApiError> {
    Ok(Json(state.media_service.get_by_id(id).await?))
}

/// DELETE /api/v1/admin/media/{id}
async fn delete_media(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.media_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
