//! Dashboard account management (admin only)
//!
//! - GET /api/v1/admin/users
//! - POST /api/v1/admin/users

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{CreateUserInput, User};

pub fn admin_router() -> Router<AppState> {
    Router::new().route("/", get(list_users).post(create_user))
}

async fn list_users(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.user_service.list().await?))
}

async fn create_user(
    State(state): State<AppState>,
    admin: AuthenticatedUser,
    Json(input): Json<CreateUserInput>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state.user_service.create_user(input).await?;
    tracing::info!(admin_id = admin.0.id, user_id = user.id, "User created via API");
    Ok((StatusCode::CREATED, Json(user)))
}
