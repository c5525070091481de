//! Hub service
//!
//! Topic hubs are landing pages that group related posts. Deleting a hub
//! only detaches its posts.

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::{HubRepository, PostRepository};
use crate::models::{CreateHubInput, Hub, UpdateHubInput};
use crate::services::slug::resolve_slug;

const HUB_CACHE_TTL_SECS: u64 = 3600;
const CACHE_KEY_HUB_BY_SLUG: &str = "hub:slug:";
const CACHE_KEY_HUB_LIST: &str = "hub:list";

#[derive(Debug, thiserror::Error)]
pub enum HubServiceError {
    #[error("Hub slug already exists: {0}")]
    DuplicateSlug(String),

    #[error("Hub not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct HubService {
    repo: Arc<dyn HubRepository>,
    posts: Arc<dyn PostRepository>,
    cache: Arc<Cache>,
}

impl HubService {
    pub fn new(repo: Arc<dyn HubRepository>, posts: Arc<dyn PostRepository>, cache: Arc<Cache>) -> Self {
        Self { repo, posts, cache }
    }

    pub async fn create(&self, input: CreateHubInput) -> Result<Hub, HubServiceError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(HubServiceError::ValidationError(
                "Hub name cannot be empty".to_string(),
            ));
        }

        let slug = resolve_slug(input.slug.as_deref(), &name).map_err(HubServiceError::ValidationError)?;
        if self.repo.exists_by_slug(&slug, None).await? {
            return Err(HubServiceError::DuplicateSlug(slug));
        }

        let hub = Hub {
            id: 0,
            slug,
            name,
            description: input.description.filter(|d| !d.trim().is_empty()),
            created_at: chrono::Utc::now(),
        };
        let created = self.repo.create(&hub).await.context("Failed to create hub")?;

        let _ = self.cache.delete_pattern("hub:*").await;
        tracing::info!(id = created.id, slug = %created.slug, "Hub created");
        Ok(created)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Hub, HubServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| HubServiceError::NotFound(format!("id {}", id)))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Hub, HubServiceError> {
        let cache_key = format!("{}{}", CACHE_KEY_HUB_BY_SLUG, slug);
        if let Ok(Some(hub)) = self.cache.get::<Hub>(&cache_key).await {
            return Ok(hub);
        }

        let hub = self
            .repo
            .get_by_slug(slug)
            .await?
            .ok_or_else(|| HubServiceError::NotFound(slug.to_string()))?;
        let _ = self
            .cache
            .set(&cache_key, &hub, Duration::from_secs(HUB_CACHE_TTL_SECS))
            .await;
        Ok(hub)
    }

    pub async fn list(&self) -> Result<Vec<Hub>, HubServiceError> {
        if let Ok(Some(hubs)) = self.cache.get::<Vec<Hub>>(CACHE_KEY_HUB_LIST).await {
            return Ok(hubs);
        }

        let hubs = self.repo.list().await?;
        let _ = self
            .cache
            .set(CACHE_KEY_HUB_LIST, &hubs, Duration::from_secs(HUB_CACHE_TTL_SECS))
            .await;
        Ok(hubs)
    }

    pub async fn update(&self, id: i64, input: UpdateHubInput) -> Result<Hub, HubServiceError> {
        let mut hub = self.get_by_id(id).await?;

        if let Some(name) = input.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(HubServiceError::ValidationError(
                    "Hub name cannot be empty".to_string(),
                ));
            }
            hub.name = name;
        }
        if let Some(slug) = input.slug {
            let slug = resolve_slug(Some(&slug), &hub.name).map_err(HubServiceError::ValidationError)?;
            if slug != hub.slug && self.repo.exists_by_slug(&slug, Some(id)).await? {
                return Err(HubServiceError::DuplicateSlug(slug));
            }
            hub.slug = slug;
        }
        if let Some(description) = input.description {
            hub.description = Some(description).filter(|d| !d.trim().is_empty());
        }

        let updated = self.repo.update(&hub).await.context("Failed to update hub")?;
        let _ = self.cache.delete_pattern("hub:*").await;
        Ok(updated)
    }

    /// Delete a hub, detaching its posts first
    pub async fn delete(&self, id: i64) -> Result<(), HubServiceError> {
        self.get_by_id(id).await?;

        let detached = self
            .posts
            .detach_hub(id)
            .await
            .context("Failed to detach posts from hub")?;
        self.repo.delete(id).await.context("Failed to delete hub")?;

        let _ = self.cache.delete_pattern("hub:*").await;
        let _ = self.cache.delete_pattern("post:*").await;
        tracing::info!(id, detached, "Hub deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxHubRepository, SqlxPostRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Post, PostStatus};

    async fn setup_test_service() -> (HubService, Arc<dyn PostRepository>) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let posts = SqlxPostRepository::boxed(pool.clone());
        let service = HubService::new(SqlxHubRepository::boxed(pool), posts.clone(), Arc::new(Cache::new()));
        (service, posts)
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let (service, _) = setup_test_service().await;
        let hub = service
            .create(CreateHubInput::new("Smart Home").with_description("Everything connected"))
            .await
            .unwrap();
        assert_eq!(hub.slug, "smart-home");
        assert_eq!(service.get_by_slug("smart-home").await.unwrap().id, hub.id);
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_name_rejected() {
        let (service, _) = setup_test_service().await;
        let result = service.create(CreateHubInput::new("")).await;
        assert!(matches!(result, Err(HubServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_delete_detaches_posts() {
        let (service, posts) = setup_test_service().await;
        let hub = service.create(CreateHubInput::new("Travel")).await.unwrap();

        let mut post = Post::new(
            "packing-list".to_string(),
            "Packing List".to_string(),
            "Body".to_string(),
            "<p>Body</p>".to_string(),
            1,
            PostStatus::Published,
        );
        post.hub_id = Some(hub.id);
        let post = posts.create(&post).await.unwrap();

        service.delete(hub.id).await.unwrap();

        let detached = posts.get_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(detached.hub_id, None);
        assert!(matches!(
            service.get_by_slug("travel").await,
            Err(HubServiceError::NotFound(_))
        ));
    }
}
