//! Category service
//!
//! Category CRUD with name/slug uniqueness. The default `uncategorized`
//! category cannot be deleted; deleting any other category moves its posts
//! to the default one first.

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::{CategoryRepository, PostRepository};
use crate::models::{Category, CategoryWithCount, CreateCategoryInput, UpdateCategoryInput};
use crate::services::slug::resolve_slug;

const CATEGORY_CACHE_TTL_SECS: u64 = 3600;

const CACHE_KEY_CATEGORY_BY_SLUG: &str = "category:slug:";
const CACHE_KEY_CATEGORY_LIST: &str = "category:list";
const CACHE_KEY_CATEGORY_COUNTS: &str = "category:counts";

const MAX_NAME_LEN: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    #[error("Category name already exists: {0}")]
    DuplicateName(String),

    #[error("Category slug already exists: {0}")]
    DuplicateSlug(String),

    #[error("Category not found: {0}")]
    NotFound(String),

    #[error("Cannot delete the default category")]
    CannotDeleteDefault,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
    posts: Arc<dyn PostRepository>,
    cache: Arc<Cache>,
    cache_ttl: Duration,
}

impl CategoryService {
    pub fn new(
        repo: Arc<dyn CategoryRepository>,
        posts: Arc<dyn PostRepository>,
        cache: Arc<Cache>,
    ) -> Self {
        Self {
            repo,
            posts,
            cache,
            cache_ttl: Duration::from_secs(CATEGORY_CACHE_TTL_SECS),
        }
    }

    pub async fn create(&self, input: CreateCategoryInput) -> Result<Category, CategoryServiceError> {
        let name = validate_name(&input.name)?;

        if self.repo.exists_by_name(&name, None).await? {
            return Err(CategoryServiceError::DuplicateName(name));
        }

        let slug = resolve_slug(input.slug.as_deref(), &name)
            .map_err(CategoryServiceError::ValidationError)?;
        if self.repo.exists_by_slug(&slug, None).await? {
            return Err(CategoryServiceError::DuplicateSlug(slug));
        }

        let category = Category::new(
            slug,
            name,
            input.description.filter(|d| !d.trim().is_empty()),
            input.sort_order.unwrap_or(0),
        );
        let created = self
            .repo
            .create(&category)
            .await
            .context("Failed to create category")?;

        self.invalidate_cache().await;
        tracing::info!(id = created.id, slug = %created.slug, "Category created");
        Ok(created)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Category, CategoryServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| CategoryServiceError::NotFound(format!("id {}", id)))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Category, CategoryServiceError> {
        let cache_key = format!("{}{}", CACHE_KEY_CATEGORY_BY_SLUG, slug);
        if let Ok(Some(category)) = self.cache.get::<Category>(&cache_key).await {
            return Ok(category);
        }

        let category = self
            .repo
            .get_by_slug(slug)
            .await?
            .ok_or_else(|| CategoryServiceError::NotFound(slug.to_string()))?;

        let _ = self.cache.set(&cache_key, &category, self.cache_ttl).await;
        Ok(category)
    }

    /// All categories by sort order
    pub async fn list(&self) -> Result<Vec<Category>, CategoryServiceError> {
        if let Ok(Some(categories)) = self.cache.get::<Vec<Category>>(CACHE_KEY_CATEGORY_LIST).await {
            return Ok(categories);
        }

        let categories = self.repo.list().await?;
        let _ = self
            .cache
            .set(CACHE_KEY_CATEGORY_LIST, &categories, self.cache_ttl)
            .await;
        Ok(categories)
    }

    /// All categories with their published post counts
    pub async fn list_with_counts(&self) -> Result<Vec<CategoryWithCount>, CategoryServiceError> {
        if let Ok(Some(categories)) = self
            .cache
            .get::<Vec<CategoryWithCount>>(CACHE_KEY_CATEGORY_COUNTS)
            .await
        {
            return Ok(categories);
        }

        let categories = self.repo.list_with_counts().await?;
        let _ = self
            .cache
            .set(CACHE_KEY_CATEGORY_COUNTS, &categories, self.cache_ttl)
            .await;
        Ok(categories)
    }

    pub async fn update(&self, id: i64, input: UpdateCategoryInput) -> Result<Category, CategoryServiceError> {
        let mut category = self.get_by_id(id).await?;

        if let Some(name) = input.name {
            let name = validate_name(&name)?;
            if name != category.name && self.repo.exists_by_name(&name, Some(id)).await? {
                return Err(CategoryServiceError::DuplicateName(name));
            }
            category.name = name;
        }

        if let Some(slug) = input.slug {
            if category.is_default() && slug != category.slug {
                return Err(CategoryServiceError::ValidationError(
                    "The default category slug cannot be changed".to_string(),
                ));
            }
            let slug = resolve_slug(Some(&slug), &category.name)
                .map_err(CategoryServiceError::ValidationError)?;
            if slug != category.slug && self.repo.exists_by_slug(&slug, Some(id)).await? {
                return Err(CategoryServiceError::DuplicateSlug(slug));
            }
            category.slug = slug;
        }

        if let Some(description) = input.description {
            category.description = Some(description).filter(|d| !d.trim().is_empty());
        }
        if let Some(sort_order) = input.sort_order {
            category.sort_order = sort_order;
        }

        let updated = self
            .repo
            .update(&category)
            .await
            .context("Failed to update category")?;
        self.invalidate_cache().await;
        Ok(updated)
    }

    /// Delete a category, moving its posts to the default category
    pub async fn delete(&self, id: i64) -> Result<(), CategoryServiceError> {
        let category = self.get_by_id(id).await?;
        if category.is_default() {
            return Err(CategoryServiceError::CannotDeleteDefault);
        }

        let default = self
            .repo
            .get_default()
            .await?
            .ok_or_else(|| CategoryServiceError::NotFound("default category".to_string()))?;

        let moved = self
            .posts
            .reassign_category(id, default.id)
            .await
            .context("Failed to move posts to the default category")?;
        self.repo.delete(id).await.context("Failed to delete category")?;

        self.invalidate_cache().await;
        // Moved posts embed their category in cached views
        let _ = self.cache.delete_pattern("post:*").await;

        tracing::info!(id, moved, "Category deleted");
        Ok(())
    }

    async fn invalidate_cache(&self) {
        let _ = self.cache.delete_pattern("category:*").await;
    }
}

fn validate_name(name: &str) -> Result<String, CategoryServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CategoryServiceError::ValidationError(
            "Category name cannot be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(CategoryServiceError::ValidationError(format!(
            "Category name cannot exceed {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name.to_string())
}
