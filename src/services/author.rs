//! Author service
//!
//! Public author profiles used for post bylines and `Person` markup.

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::AuthorRepository;
use crate::models::{Author, CreateAuthorInput, UpdateAuthorInput};
use crate::services::slug::resolve_slug;

const AUTHOR_CACHE_TTL_SECS: u64 = 3600;
const CACHE_KEY_AUTHOR_BY_ID: &str = "author:id:";
const CACHE_KEY_AUTHOR_LIST: &str = "author:list";

#[derive(Debug, thiserror::Error)]
pub enum AuthorServiceError {
    #[error("Author slug already exists: {0}")]
    DuplicateSlug(String),

    #[error("Author not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct AuthorService {
    repo: Arc<dyn AuthorRepository>,
    cache: Arc<Cache>,
}

impl AuthorService {
    pub fn new(repo: Arc<dyn AuthorRepository>, cache: Arc<Cache>) -> Self {
        Self { repo, cache }
    }

    pub async fn create(&self, input: CreateAuthorInput) -> Result<Author, AuthorServiceError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(AuthorServiceError::ValidationError(
                "Author name cannot be empty".to_string(),
            ));
        }
        validate_urls(input.website.as_deref(), &input.same_as)?;

        let slug =
            resolve_slug(input.slug.as_deref(), &name).map_err(AuthorServiceError::ValidationError)?;
        if self.repo.exists_by_slug(&slug, None).await? {
            return Err(AuthorServiceError::DuplicateSlug(slug));
        }

        let author = Author {
            id: 0,
            slug,
            name,
            bio: blank_to_none(input.bio),
            avatar: blank_to_none(input.avatar),
            job_title: blank_to_none(input.job_title),
            website: blank_to_none(input.website),
            same_as: clean_urls(input.same_as),
            created_at: chrono::Utc::now(),
        };
        let created = self.repo.create(&author).await.context("Failed to create author")?;

        self.invalidate_cache().await;
        tracing::info!(id = created.id, slug = %created.slug, "Author created");
        Ok(created)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Author, AuthorServiceError> {
        let cache_key = format!("{}{}", CACHE_KEY_AUTHOR_BY_ID, id);
        if let Ok(Some(author)) = self.cache.get::<Author>(&cache_key).await {
            return Ok(author);
        }

        let author = self
            .repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| AuthorServiceError::NotFound(format!("id {}", id)))?;
        let _ = self
            .cache
            .set(&cache_key, &author, Duration::from_secs(AUTHOR_CACHE_TTL_SECS))
            .await;
        Ok(author)
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Author, AuthorServiceError> {
        self.repo
            .get_by_slug(slug)
            .await?
            .ok_or_else(|| AuthorServiceError::NotFound(slug.to_string()))
    }

    pub async fn list(&self) -> Result<Vec<Author>, AuthorServiceError> {
        if let Ok(Some(authors)) = self.cache.get::<Vec<Author>>(CACHE_KEY_AUTHOR_LIST).await {
            return Ok(authors);
        }

        let authors = self.repo.list().await?;
        let _ = self
            .cache
            .set(CACHE_KEY_AUTHOR_LIST, &authors, Duration::from_secs(AUTHOR_CACHE_TTL_SECS))
            .await;
        Ok(authors)
    }

    pub async fn update(&self, id: i64, input: UpdateAuthorInput) -> Result<Author, AuthorServiceError> {
        let mut author = self
            .repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| AuthorServiceError::NotFound(format!("id {}", id)))?;

        if let Some(name) = input.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(AuthorServiceError::ValidationError(
                    "Author name cannot be empty".to_string(),
                ));
            }
            author.name = name;
        }
        if let Some(slug) = input.slug {
            let slug =
                resolve_slug(Some(&slug), &author.name).map_err(AuthorServiceError::ValidationError)?;
            if slug != author.slug && self.repo.exists_by_slug(&slug, Some(id)).await? {
                return Err(AuthorServiceError::DuplicateSlug(slug));
            }
            author.slug = slug;
        }

        validate_urls(
            input.website.as_deref(),
            input.same_as.as_deref().unwrap_or_default(),
        )?;
        if input.bio.is_some() {
            author.bio = blank_to_none(input.bio);
        }
        if input.avatar.is_some() {
            author.avatar = blank_to_none(input.avatar);
        }
        if input.job_title.is_some() {
            author.job_title = blank_to_none(input.job_title);
        }
        if input.website.is_some() {
            author.website = blank_to_none(input.website);
        }
        if let Some(same_as) = input.same_as {
            author.same_as = clean_urls(same_as);
        }

        let updated = self.repo.update(&author).await.context("Failed to update author")?;
        self.invalidate_cache().await;
        Ok(updated)
    }

    /// Delete an author; their posts keep existing without a byline
    pub async fn delete(&self, id: i64) -> Result<(), AuthorServiceError> {
        if self.repo.get_by_id(id).await?.is_none() {
            return Err(AuthorServiceError::NotFound(format!("id {}", id)));
        }
        self.repo.delete(id).await.context("Failed to delete author")?;

        self.invalidate_cache().await;
        let _ = self.cache.delete_pattern("post:*").await;
        tracing::info!(id, "Author deleted");
        Ok(())
    }

    async fn invalidate_cache(&self) {
        let _ = self.cache.delete_pattern("author:*").await;
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn clean_urls(urls: Vec<String>) -> Vec<String> {
    urls.into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect()
}

fn is_http_url(url: &str) -> bool {
    let url = url.trim();
    url.starts_with("http://") || url.starts_with("https://")
}

fn validate_urls(website: Option<&str>, same_as: &[String]) -> Result<(), AuthorServiceError> {
    let bad = website
        .into_iter()
        .chain(same_as.iter().map(String::as_str))
        .filter(|u| !u.trim().is_empty())
        .find(|u| !is_http_url(u));

    match bad {
        Some(url) => Err(AuthorServiceError::ValidationError(format!(
            "Not an http(s) URL: {}",
            url
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxAuthorRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> AuthorService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        AuthorService::new(SqlxAuthorRepository::boxed(pool), Arc::new(Cache::new()))
    }

    #[tokio::test]
    async fn test_create_and_fetch() {
        let service = setup_test_service().await;
        let author = service
            .create(
                CreateAuthorInput::new("Grace Hopper")
                    .with_job_title("Rear Admiral")
                    .with_same_as(vec!["https://example.com/grace".to_string(), "".to_string()]),
            )
            .await
            .unwrap();

        assert_eq!(author.slug, "grace-hopper");
        assert_eq!(author.same_as, vec!["https://example.com/grace"]);

        let fetched = service.get_by_id(author.id).await.unwrap();
        assert_eq!(fetched.job_title.as_deref(), Some("Rear Admiral"));
        assert_eq!(service.get_by_slug("grace-hopper").await.unwrap().id, author.id);
    }

    #[tokio::test]
    async fn test_invalid_profile_url_rejected() {
        let service = setup_test_service().await;
        let result = service
            .create(CreateAuthorInput::new("Ada").with_same_as(vec!["javascript:alert(1)".to_string()]))
            .await;
        assert!(matches!(result, Err(AuthorServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let service = setup_test_service().await;
        service.create(CreateAuthorInput::new("Ada")).await.unwrap();
        let result = service.create(CreateAuthorInput::new("ADA")).await;
        assert!(matches!(result, Err(AuthorServiceError::DuplicateSlug(_))));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let service = setup_test_service().await;
        let author = service.create(CreateAuthorInput::new("Linus")).await.unwrap();
        service.get_by_id(author.id).await.unwrap();

        let updated = service
            .update(
                author.id,
                UpdateAuthorInput {
                    bio: Some("Kernel hacker".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.bio.as_deref(), Some("Kernel hacker"));
        assert_eq!(
            service.get_by_id(author.id).await.unwrap().bio.as_deref(),
            Some("Kernel hacker")
        );

        service.delete(author.id).await.unwrap();
        assert!(matches!(
            service.get_by_id(author.id).await,
            Err(AuthorServiceError::NotFound(_))
        ));
    }
}
