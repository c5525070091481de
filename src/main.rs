//! Quillpost server

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quillpost::{
    api::{self, AppState},
    cache::create_cache,
    config::Config,
    db::{
        self,
        repositories::{
            SqlxAuthorRepository, SqlxCategoryRepository, SqlxHubRepository,
            SqlxMediaRepository, SqlxPostRepository, SqlxSessionRepository,
            SqlxSettingsRepository, SqlxUserRepository, SqlxVisitRepository,
        },
    },
    services::{
        AuthorService, CategoryService, FeedService, HubService, MediaService, PostService,
        SettingsService, TrackingService, UploadHelper, UserService,
    },
};

/// Period of the session and visit cleanup task
const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quillpost=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Quillpost...");

    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database).await?;
    tracing::info!(url = %config.database.url, "Database connected");

    let applied = db::migrations::run_migrations(&pool).await?;
    tracing::info!(applied, "Database migrations completed");

    let cache = create_cache(&config.cache);
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    // Repositories
    let post_repo = SqlxPostRepository::boxed(pool.clone());
    let category_repo = SqlxCategoryRepository::boxed(pool.clone());
    let author_repo = SqlxAuthorRepository::boxed(pool.clone());
    let hub_repo = SqlxHubRepository::boxed(pool.clone());

    // Services
    let user_service = Arc::new(UserService::new(
        SqlxUserRepository::boxed(pool.clone()),
        SqlxSessionRepository::boxed(pool.clone()),
    ));
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
    let author_service = Arc::new(AuthorService::new(author_repo, cache.clone()));
    let hub_service = Arc::new(HubService::new(hub_repo, post_repo, cache.clone()));
    let settings_service = Arc::new(SettingsService::new(
        SqlxSettingsRepository::boxed(pool.clone()),
        cache.clone(),
    ));

    let uploader = UploadHelper::from_config(&config.storage, http_client);
    if !uploader.is_configured() {
        tracing::info!("Object storage not configured, media stays local");
    }
    let media_service = Arc::new(MediaService::new(
        SqlxMediaRepository::boxed(pool.clone()),
        config.upload.clone(),
        Arc::new(uploader),
    ));
    let tracking_service = Arc::new(TrackingService::new(
        SqlxVisitRepository::boxed(pool.clone()),
        config.tracking.clone(),
    ));
    let feed_service = Arc::new(FeedService::new(
        post_service.clone(),
        category_service.clone(),
        settings_service.clone(),
        cache,
    ));

    if let Some(admin) = user_service.bootstrap_admin(&config.admin).await? {
        tracing::info!(username = %admin.username, "Bootstrap administrator created");
    }

    // Session and visit cleanup
    {
        let users = user_service.clone();
        let tracking = tracking_service.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(MAINTENANCE_INTERVAL);
            loop {
                interval.tick().await;
                if let Err(e) = users.cleanup_expired_sessions().await {
                    tracing::warn!(error = %e, "Session cleanup failed");
                }
                if let Err(e) = tracking.purge_expired().await {
                    tracing::warn!(error = %e, "Visit purge failed");
                }
            }
        });
    }

    let state = AppState {
        user_service,
        post_service,
        category_service,
        author_service,
        hub_service,
        settings_service,
        media_service,
        tracking_service,
        feed_service,
    };

    let app = api::build_router(state, &config.server.cors_origin);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
