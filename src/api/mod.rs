//! API layer - HTTP handlers and routing
//!
//! - `/api/v1` public endpoints: posts, categories, authors, hubs, site, login
//! - `/api/v1` session endpoints: logout, current user, password change
//! - `/api/v1/admin` dashboard endpoints (any signed-in user)
//! - `/api/v1/admin/settings`, `/api/v1/admin/users` (admin role)
//! - `/feed.xml`, `/track`, `/ads/bait.js` and `/uploads/*` at the root

pub mod ads;
pub mod auth;
pub mod authors;
pub mod categories;
pub mod common;
pub mod feed;
pub mod hubs;
pub mod media;
pub mod middleware;
pub mod posts;
pub mod responses;
pub mod site;
pub mod track;
pub mod users;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Headroom for multipart framing on top of the file size limit
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the `/api/v1` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    let upload_limit = usize::try_from(state.media_service.max_file_size())
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    // Site configuration and accounts (admin role)
    let admin_only_routes = Router::new()
        .nest("/admin/settings", site::settings_router())
        .nest("/admin/users", users::admin_router())
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Content management (any signed-in user)
    let admin_routes = Router::new()
        .nest("/admin/posts", posts::admin_router())
        .nest("/admin/categories", categories::admin_router())
        .nest("/admin/authors", authors::admin_router())
        .nest("/admin/hubs", hubs::admin_router())
        .nest("/admin/media", media::admin_router(upload_limit))
        .nest("/admin/feed", feed::admin_router())
        .nest("/admin/stats", track::admin_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .nest("/posts", posts::public_router())
        .nest("/categories", categories::public_router())
        .nest("/authors", authors::public_router())
        .nest("/hubs", hubs::public_router())
        .nest("/site", site::public_router())
        .nest("/auth", auth::public_router())
        .merge(admin_only_routes)
        .merge(admin_routes)
        .merge(protected_routes)
}

fn cors_layer(cors_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE]);

    if cors_origin.trim() == "*" {
        // Credentials cannot be combined with a wildcard origin
        return cors.allow_origin(AllowOrigin::any());
    }

    match cors_origin.trim().parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin).allow_credentials(true),
        Err(e) => {
            tracing::warn!(origin = cors_origin, error = %e, "Invalid CORS origin, cross-origin requests disabled");
            cors
        }
    }
}

/// Build the complete application router
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let upload_dir = state.media_service.upload_dir().to_path_buf();

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .merge(feed::public_router())
        .merge(track::public_router())
        .merge(ads::router())
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .layer(cors_layer(cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::{CacheConfig, StorageConfig, TrackingConfig, UploadConfig};
    use crate::db::repositories::{
        SqlxAuthorRepository, SqlxCategoryRepository, SqlxHubRepository, SqlxMediaRepository,
        SqlxPostRepository, SqlxSessionRepository, SqlxSettingsRepository, SqlxUserRepository,
        SqlxVisitRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{CreateUserInput, UserRole};
    use crate::services::{
        AuthorService, CategoryService, FeedService, HubService, MediaService, PostService,
        SettingsService, TrackingService, UploadHelper, UserService,
    };
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn test_state(dir: &TempDir) -> AppState {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let cache = create_cache(&CacheConfig::default());

        let post_repo = SqlxPostRepository::boxed(pool.clone());
        let category_repo = SqlxCategoryRepository::boxed(pool.clone());
        let author_repo = SqlxAuthorRepository::boxed(pool.clone());
        let hub_repo = SqlxHubRepository::boxed(pool.clone());

        let post_service = Arc::new(PostService::new(
            post_repo.clone(),
            category_repo.clone(),
            author_repo.clone(),
            hub_repo.clone(),
            cache.clone(),
        ));
        let category_service = Arc::new(CategoryService::new(
            category_repo,
            post_repo.clone(),
            cache.clone(),
        ));
        let settings_service = Arc::new(SettingsService::new(
            SqlxSettingsRepository::boxed(pool.clone()),
            cache.clone(),
        ));
        let uploader = UploadHelper::from_config(&StorageConfig::default(), reqwest::Client::new());
        let upload_config = UploadConfig {
            path: dir.path().join("uploads"),
            ..Default::default()
        };

        AppState {
            user_service: Arc::new(UserService::new(
                SqlxUserRepository::boxed(pool.clone()),
                SqlxSessionRepository::boxed(pool.clone()),
            )),
            author_service: Arc::new(AuthorService::new(author_repo, cache.clone())),
            hub_service: Arc::new(HubService::new(hub_repo, post_repo, cache.clone())),
            media_service: Arc::new(MediaService::new(
                SqlxMediaRepository::boxed(pool.clone()),
                upload_config,
                Arc::new(uploader),
            )),
            tracking_service: Arc::new(TrackingService::new(
                SqlxVisitRepository::boxed(pool),
                TrackingConfig::default(),
            )),
            feed_service: Arc::new(FeedService::new(
                post_service.clone(),
                category_service.clone(),
                settings_service.clone(),
                cache,
            )),
            post_service,
            category_service,
            settings_service,
        }
    }

    async fn app() -> (Router, AppState, TempDir) {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir).await;
        let router = build_router(state.clone(), "http://localhost:3000");
        (router, state, dir)
    }

    async fn login(router: &Router, state: &AppState, username: &str, role: UserRole) -> String {
        state
            .user_service
            .create_user(CreateUserInput {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password: "correct-horse-battery".to_string(),
                role: Some(role),
            })
            .await
            .unwrap();

        let response = router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/login",
                None,
                json!({"username_or_email": username, "password": "correct-horse-battery"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(header::SET_COOKIE));
        body_json(response).await["token"].as_str().unwrap().to_string()
    }

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_track_accepts_invalid_payloads() {
        let (router, _state, _dir) = app().await;

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/track")
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = router
            .oneshot(json_request(
                "POST",
                "/track",
                None,
                json!({"session_id": "", "page_url": "/"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_track_records_visit() {
        let (router, state, _dir) = app().await;

        let response = router
            .oneshot(json_request(
                "POST",
                "/track",
                None,
                json!({"session_id": "abc", "page_url": "/posts/hello", "timestamp": 1700000000000i64}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let since = chrono::DateTime::from_timestamp(1_600_000_000, 0).unwrap();
        let stats = state.tracking_service.stats(Some(since)).await.unwrap();
        assert_eq!(stats.total_visits, 1);
    }

    #[tokio::test]
    async fn test_public_post_listing() {
        let (router, _state, _dir) = app().await;

        let response = router.oneshot(get("/api/v1/posts")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["total"], 0);
        assert!(body["items"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_admin_requires_session() {
        let (router, _state, _dir) = app().await;

        let response = router.oneshot(get("/api/v1/admin/posts")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_empty_title_is_a_validation_error() {
        let (router, state, _dir) = app().await;
        let token = login(&router, &state, "editor", UserRole::Editor).await;

        let response = router
            .oneshot(json_request(
                "POST",
                "/api/v1/admin/posts",
                Some(&token),
                json!({"title": "   ", "content": "Body"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_published_post_page() {
        let (router, state, _dir) = app().await;
        let token = login(&router, &state, "editor", UserRole::Editor).await;

        let response = router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/admin/posts",
                Some(&token),
                json!({
                    "title": "Hello World",
                    "content": "# Hi\n\nFirst post.",
                    "status": "published",
                    "faqs": [{"question": "Why?", "answer": "Because."}]
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = router
            .oneshot(get("/api/v1/posts/hello-world"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["post"]["title"], "Hello World");
        assert_eq!(body["category"]["slug"], "uncategorized");
        let types: Vec<&str> = body["structured_data"]["json_ld"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v["@type"].as_str())
            .collect();
        assert_eq!(types, vec!["BlogPosting", "BreadcrumbList", "FAQPage"]);
    }

    #[tokio::test]
    async fn test_out_of_range_page_has_no_pagination() {
        let (router, state, _dir) = app().await;
        let token = login(&router, &state, "editor", UserRole::Editor).await;

        for title in ["First", "Second", "Third"] {
            let response = router
                .clone()
                .oneshot(json_request(
                    "POST",
                    "/api/v1/admin/posts",
                    Some(&token),
                    json!({"title": title, "content": "Body", "status": "published"}),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = router
            .clone()
            .oneshot(get("/api/v1/posts?page=2&per_page=1"))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["total_pages"], 3);
        assert_eq!(body["pagination"]["current"], 2);

        let response = router
            .oneshot(get("/api/v1/posts?page=50&per_page=1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["total_pages"], 3);
        assert!(body["items"].as_array().unwrap().is_empty());
        assert!(body["pagination"].is_null());
    }

    #[tokio::test]
    async fn test_settings_require_admin_role() {
        let (router, state, _dir) = app().await;
        let token = login(&router, &state, "editor", UserRole::Editor).await;

        let response = router
            .clone()
            .oneshot(json_request(
                "PUT",
                "/api/v1/admin/settings",
                Some(&token),
                json!({"site_name": "Mine"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let admin_token = login(&router, &state, "root", UserRole::Admin).await;
        let response = router
            .oneshot(json_request(
                "PUT",
                "/api/v1/admin/settings",
                Some(&admin_token),
                json!({"site_name": "Mine"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["site_name"], "Mine");
    }

    #[tokio::test]
    async fn test_logout_revokes_session() {
        let (router, state, _dir) = app().await;
        let token = login(&router, &state, "editor", UserRole::Editor).await;

        let response = router
            .clone()
            .oneshot(json_request("POST", "/api/v1/auth/logout", Some(&token), json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/v1/auth/me")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_feed_and_bait_content_types() {
        let (router, _state, _dir) = app().await;

        let response = router.clone().oneshot(get("/feed.xml")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            crate::services::feed::RSS_CONTENT_TYPE
        );

        let response = router.oneshot(get("/ads/bait.js")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/javascript");
    }

    #[tokio::test]
    async fn test_unknown_category_page_is_not_found() {
        let (router, _state, _dir) = app().await;

        let response = router.oneshot(get("/api/v1/categories/missing")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_invalid_cors_origin_does_not_panic() {
        let _ = cors_layer("bad\norigin");
        let _ = cors_layer("*");
        let _ = cors_layer("https://example.com");
    }
}
