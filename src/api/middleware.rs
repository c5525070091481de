//! API middleware
//!
//! Contains:
//! - `AppState` shared by every handler
//! - `ApiError`, the JSON error envelope, and its mapping from service errors
//! - Authentication (session token from `Authorization: Bearer` or the
//!   `session` cookie) and the admin role check

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::User;
use crate::services::{
    AuthorService, AuthorServiceError, CategoryService, CategoryServiceError, FeedError,
    FeedService, HubService, HubServiceError, MediaService, MediaServiceError, PostService,
    PostServiceError, SettingsService, SettingsServiceError, TrackingError, TrackingService,
    UserService, UserServiceError,
};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub post_service: Arc<PostService>,
    pub category_service: Arc<CategoryService>,
    pub author_service: Arc<AuthorService>,
    pub hub_service: Arc<HubService>,
    pub settings_service: Arc<SettingsService>,
    pub media_service: Arc<MediaService>,
    pub tracking_service: Arc<TrackingService>,
    pub feed_service: Arc<FeedService>,
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    /// Logs the cause; clients only see a generic message
    pub fn internal_error(cause: impl std::fmt::Display) -> Self {
        tracing::error!(error = %cause, "Internal error");
        Self::new("INTERNAL_ERROR", "Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<PostServiceError> for ApiError {
    fn from(err: PostServiceError) -> Self {
        match err {
            PostServiceError::NotFound(_) => Self::not_found(err.to_string()),
            PostServiceError::ValidationError(msg) => Self::validation_error(msg),
            PostServiceError::DuplicateSlug(_) => Self::conflict(err.to_string()),
            PostServiceError::InternalError(e) => Self::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<CategoryServiceError> for ApiError {
    fn from(err: CategoryServiceError) -> Self {
        match err {
            CategoryServiceError::NotFound(_) => Self::not_found(err.to_string()),
            CategoryServiceError::ValidationError(msg) => Self::validation_error(msg),
            CategoryServiceError::CannotDeleteDefault => Self::validation_error(err.to_string()),
            CategoryServiceError::DuplicateName(_) | CategoryServiceError::DuplicateSlug(_) => {
                Self::conflict(err.to_string())
            }
            CategoryServiceError::InternalError(e) => Self::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<AuthorServiceError> for ApiError {
    fn from(err: AuthorServiceError) -> Self {
        match err {
            AuthorServiceError::NotFound(_) => Self::not_found(err.to_string()),
            AuthorServiceError::ValidationError(msg) => Self::validation_error(msg),
            AuthorServiceError::DuplicateSlug(_) => Self::conflict(err.to_string()),
            AuthorServiceError::InternalError(e) => Self::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<HubServiceError> for ApiError {
    fn from(err: HubServiceError) -> Self {
        match err {
            HubServiceError::NotFound(_) => Self::not_found(err.to_string()),
            HubServiceError::ValidationError(msg) => Self::validation_error(msg),
            HubServiceError::DuplicateSlug(_) => Self::conflict(err.to_string()),
            HubServiceError::InternalError(e) => Self::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<SettingsServiceError> for ApiError {
    fn from(err: SettingsServiceError) -> Self {
        match err {
            SettingsServiceError::ValidationError(msg) => Self::validation_error(msg),
            SettingsServiceError::InternalError(e) => Self::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<MediaServiceError> for ApiError {
    fn from(err: MediaServiceError) -> Self {
        match err {
            MediaServiceError::NotFound(_) => Self::not_found(err.to_string()),
            MediaServiceError::ValidationError(msg) => Self::validation_error(msg),
            MediaServiceError::InternalError(e) => Self::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::AuthenticationError(msg) => Self::unauthorized(msg),
            UserServiceError::SessionExpired | UserServiceError::SessionNotFound => {
                Self::unauthorized("Invalid or expired session")
            }
            UserServiceError::ValidationError(msg) => Self::validation_error(msg),
            UserServiceError::UserExists(msg) => Self::conflict(msg),
            UserServiceError::NotFound(_) => Self::not_found(err.to_string()),
            UserServiceError::InternalError(e) => Self::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<TrackingError> for ApiError {
    fn from(err: TrackingError) -> Self {
        match err {
            TrackingError::ValidationError(msg) => Self::validation_error(msg),
            TrackingError::InternalError(e) => Self::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<FeedError> for ApiError {
    fn from(err: FeedError) -> Self {
        tracing::error!(error = ?err, "Feed error");
        Self::new("INTERNAL_ERROR", err.to_string())
    }
}

/// Session token from the `Authorization: Bearer` header or the session cookie
pub fn extract_session_token(headers: &axum::http::HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|cookie| {
                let (name, value) = cookie.trim().split_once('=')?;
                (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
            })
        })
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user = state.user_service.validate_session(&token).await?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Admin authorization middleware; runs after `require_auth`
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !user.0.is_admin() {
        return Err(ApiError::forbidden("Admin privileges required"));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue};

    #[test]
    fn test_extract_token_prefers_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; session=from-cookie"));
        assert_eq!(extract_session_token(&headers).as_deref(), Some("from-cookie"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(extract_session_token(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_extract_token_ignores_lookalike_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("old_session=x; session="));
        assert_eq!(extract_session_token(&headers), None);
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            ApiError::from(PostServiceError::ValidationError("Title cannot be empty".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(CategoryServiceError::DuplicateName("News".into())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(HubServiceError::NotFound("x".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(UserServiceError::SessionExpired).status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_validation_message_reaches_client() {
        let err = ApiError::from(PostServiceError::ValidationError("Title cannot be empty".into()));
        assert_eq!(err.error.code, "VALIDATION_ERROR");
        assert_eq!(err.error.message, "Title cannot be empty");
    }
}
