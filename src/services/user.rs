//! User service
//!
//! Admin accounts and their sessions:
//! - Bootstrapping the first administrator from configuration
//! - Login/logout with opaque session tokens
//! - Session validation for the auth middleware
//! - Password changes (which revoke every other session)

use crate::config::AdminConfig;
use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{CreateUserInput, Session, User, UserRole};
use crate::services::password::{hash_password, verify_password, MIN_PASSWORD_LENGTH};
use anyhow::Context;
use chrono::{Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Session expired")]
    SessionExpired,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Input for logging in
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    /// Username or email address
    pub username_or_email: String,
    pub password: String,
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>, session_repo: Arc<dyn SessionRepository>) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days: DEFAULT_SESSION_EXPIRATION_DAYS,
        }
    }

    /// Create a new user service with custom session expiration
    pub fn with_session_expiration(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days,
        }
    }

    /// Create the configured administrator when the user table is empty.
    ///
    /// Returns the created user, or `None` when users already exist or no
    /// bootstrap password is configured.
    pub async fn bootstrap_admin(&self, config: &AdminConfig) -> Result<Option<User>, UserServiceError> {
        let Some(password) = config.password.as_deref().filter(|p| !p.is_empty()) else {
            return Ok(None);
        };
        if self.user_repo.count().await.context("Failed to count users")? > 0 {
            return Ok(None);
        }

        let admin = self
            .create_user(CreateUserInput {
                username: config.username.clone(),
                email: config.email.clone(),
                password: password.to_string(),
                role: Some(UserRole::Admin),
            })
            .await?;
        tracing::info!(username = %admin.username, "Bootstrap administrator created");
        Ok(Some(admin))
    }

    /// Create a user account
    ///
    /// # Errors
    ///
    /// - `ValidationError` for a malformed username or email, or a short password
    /// - `UserExists` if the username or email is already taken
    pub async fn create_user(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        let username = input.username.trim().to_string();
        let email = input.email.trim().to_lowercase();
        validate_username(&username)?;
        validate_email(&email)?;
        validate_password(&input.password)?;

        if self
            .user_repo
            .get_by_username(&username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Username '{}' is already taken",
                username
            )));
        }
        if self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                email
            )));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = User::new(username, email, password_hash, input.role.unwrap_or_default());
        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;
        Ok(created)
    }

    /// Login with credentials
    ///
    /// Unknown users and wrong passwords produce the same error message.
    pub async fn login(&self, input: LoginInput) -> Result<(User, Session), UserServiceError> {
        let user = self
            .find_user_by_username_or_email(input.username_or_email.trim())
            .await?
            .ok_or_else(|| UserServiceError::AuthenticationError(INVALID_CREDENTIALS.to_string()))?;

        let password_valid =
            verify_password(&input.password, &user.password_hash).context("Failed to verify password")?;
        if !password_valid {
            tracing::warn!(user_id = user.id, "Login failed: wrong password");
            return Err(UserServiceError::AuthenticationError(
                INVALID_CREDENTIALS.to_string(),
            ));
        }

        let session = self.create_session(user.id).await?;
        tracing::info!(user_id = user.id, "User logged in");
        Ok((user, session))
    }

    /// Logout (invalidate session)
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Validate a session token and return its user.
    ///
    /// Expired sessions are deleted on sight.
    pub async fn validate_session(&self, token: &str) -> Result<User, UserServiceError> {
        let session = self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
            .ok_or(UserServiceError::SessionNotFound)?;

        if session.is_expired() {
            let _ = self.session_repo.delete(&session.id).await;
            return Err(UserServiceError::SessionExpired);
        }

        self.user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get session user")?
            .ok_or(UserServiceError::SessionNotFound)
    }

    /// Change a password after checking the current one.
    ///
    /// Every session of the user is revoked.
    pub async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), UserServiceError> {
        let user = self.get_by_id(user_id).await?;

        let valid = verify_password(current_password, &user.password_hash)
            .context("Failed to verify password")?;
        if !valid {
            return Err(UserServiceError::AuthenticationError(
                "Current password is incorrect".to_string(),
            ));
        }
        validate_password(new_password)?;

        let password_hash = hash_password(new_password).context("Failed to hash password")?;
        self.user_repo
            .update_password(user_id, &password_hash)
            .await
            .context("Failed to update password")?;
        self.session_repo
            .delete_by_user(user_id)
            .await
            .context("Failed to revoke sessions")?;

        tracing::info!(user_id, "Password changed");
        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?
            .ok_or_else(|| UserServiceError::NotFound(format!("id {}", id)))
    }

    pub async fn list(&self) -> Result<Vec<User>, UserServiceError> {
        Ok(self.user_repo.list().await.context("Failed to list users")?)
    }

    /// Remove expired sessions, returning how many were deleted
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        Ok(self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?)
    }

    async fn create_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + Duration::days(self.session_expiration_days),
            created_at: now,
        };
        Ok(self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?)
    }

    async fn find_user_by_username_or_email(&self, value: &str) -> Result<Option<User>, UserServiceError> {
        let user = if value.contains('@') {
            self.user_repo.get_by_email(&value.to_lowercase()).await
        } else {
            self.user_repo.get_by_username(value).await
        };
        Ok(user.context("Failed to look up user")?)
    }
}

fn validate_username(username: &str) -> Result<(), UserServiceError> {
    let len = username.chars().count();
    if !(3..=50).contains(&len) {
        return Err(UserServiceError::ValidationError(
            "Username must be between 3 and 50 characters".to_string(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(UserServiceError::ValidationError(
            "Username can only contain letters, digits, '_' and '-'".to_string(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), UserServiceError> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.'));
    if !valid {
        return Err(UserServiceError::ValidationError(format!(
            "Invalid email address: {}",
            email
        )));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), UserServiceError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(UserServiceError::ValidationError(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}
