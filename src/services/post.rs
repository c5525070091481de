//! Post service
//!
//! Implements business logic for posts:
//! - Create, read, update, delete with Markdown rendering
//! - Slug generation and uniqueness
//! - Category, author and hub references
//! - Cache invalidation for public read paths
//! - Sortable views for the admin table and comparison blocks

use anyhow::Context;
use chrono::Utc;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::{
    AuthorRepository, CategoryRepository, HubRepository, PostFilter, PostRepository,
};
use crate::models::{
    ComparisonTable, CreatePostInput, Faq, ListParams, PagedResult, Post, PostStatus,
    UpdatePostInput,
};
use crate::services::markdown::MarkdownRenderer;
use crate::services::slug::resolve_slug;
use crate::services::table::{sort_rows, SortDirection};

/// Cache TTL for a single published post
const POST_CACHE_TTL_SECS: u64 = 3600;

/// Cache TTL for listing pages
const POST_LIST_CACHE_TTL_SECS: u64 = 600;

const CACHE_KEY_POST_BY_SLUG: &str = "post:slug:";
const CACHE_KEY_POST_LIST: &str = "post:list:";

const MAX_TITLE_LEN: usize = 200;

/// Length of excerpts derived from the body
pub const AUTO_EXCERPT_CHARS: usize = 160;

/// Highest numeric suffix tried when a generated slug collides
const MAX_SLUG_SUFFIX: u32 = 50;

/// Rows loaded for the admin post table
const MAX_TABLE_ROWS: i64 = 1000;

#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    #[error("Post not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Post slug already exists: {0}")]
    DuplicateSlug(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct PostService {
    repo: Arc<dyn PostRepository>,
    categories: Arc<dyn CategoryRepository>,
    authors: Arc<dyn AuthorRepository>,
    hubs: Arc<dyn HubRepository>,
    cache: Arc<Cache>,
    renderer: MarkdownRenderer,
}

impl PostService {
    pub fn new(
        repo: Arc<dyn PostRepository>,
        categories: Arc<dyn CategoryRepository>,
        authors: Arc<dyn AuthorRepository>,
        hubs: Arc<dyn HubRepository>,
        cache: Arc<Cache>,
    ) -> Self {
        Self {
            repo,
            categories,
            authors,
            hubs,
            cache,
            renderer: MarkdownRenderer::new(),
        }
    }

    /// Create a post.
    ///
    /// An explicit slug must be free; a slug derived from the title gets a
    /// numeric suffix (`-2`, `-3`, ...) until it is. Posts without a category
    /// land in the default one.
    pub async fn create(&self, input: CreatePostInput) -> Result<Post, PostServiceError> {
        let title = validate_title(&input.title)?;
        validate_content(&input.content)?;
        let faqs = validate_faqs(input.faqs)?;
        let comparison = input.comparison.map(validate_comparison).transpose()?;

        let explicit_slug = input.slug.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let slug = resolve_slug(explicit_slug, &title).map_err(PostServiceError::ValidationError)?;
        let slug = if explicit_slug.is_some() {
            if self.repo.exists_by_slug(&slug, None).await? {
                return Err(PostServiceError::DuplicateSlug(slug));
            }
            slug
        } else {
            self.unique_slug(&slug, None).await?
        };

        let category_id = match input.category_id {
            Some(id) => self.ensure_category(id).await?,
            None => self
                .categories
                .get_default()
                .await?
                .map(|c| c.id)
                .ok_or_else(|| PostServiceError::NotFound("default category".to_string()))?,
        };
        if let Some(author_id) = input.author_id {
            self.ensure_author(author_id).await?;
        }
        if let Some(hub_id) = input.hub_id {
            self.ensure_hub(hub_id).await?;
        }

        let status = input.status.unwrap_or_default();
        let content_html = self.renderer.render(&input.content);
        let mut post = Post::new(slug, title, input.content, content_html, category_id, status);
        post.excerpt = blank_to_none(input.excerpt)
            .or_else(|| self.auto_excerpt(&post.content));
        post.cover_image = blank_to_none(input.cover_image);
        post.author_id = input.author_id;
        post.hub_id = input.hub_id;
        post.seo = input.seo;
        post.faqs = faqs;
        post.comparison = comparison;
        post.reading_minutes = self.renderer.reading_minutes(&post.content);

        let created = self.repo.create(&post).await.context("Failed to create post")?;

        self.invalidate_cache().await;
        tracing::info!(id = created.id, slug = %created.slug, status = %created.status, "Post created");
        Ok(created)
    }

    /// Get any post by id (admin)
    pub async fn get_by_id(&self, id: i64) -> Result<Post, PostServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| PostServiceError::NotFound(format!("id {}", id)))
    }

    /// Get a published post by slug. Drafts and archived posts are not found.
    pub async fn get_published_by_slug(&self, slug: &str) -> Result<Post, PostServiceError> {
        let cache_key = format!("{}{}", CACHE_KEY_POST_BY_SLUG, slug);
        if let Ok(Some(post)) = self.cache.get::<Post>(&cache_key).await {
            return Ok(post);
        }

        let post = self
            .repo
            .get_by_slug(slug)
            .await?
            .filter(Post::is_published)
            .ok_or_else(|| PostServiceError::NotFound(slug.to_string()))?;

        let _ = self
            .cache
            .set(&cache_key, &post, Duration::from_secs(POST_CACHE_TTL_SECS))
            .await;
        Ok(post)
    }

    /// Published posts, newest first. The filter's status is forced to published.
    pub async fn list_published(
        &self,
        params: &ListParams,
        filter: PostFilter,
    ) -> Result<PagedResult<Post>, PostServiceError> {
        let filter = PostFilter {
            status: Some(PostStatus::Published),
            ..filter
        };

        // Search results are not cached
        let cache_key = filter
            .search
            .is_none()
            .then(|| list_cache_key(&filter, params));
        if let Some(key) = &cache_key {
            if let Ok(Some(result)) = self.cache.get::<PagedResult<Post>>(key).await {
                return Ok(result);
            }
        }

        let result = self.list(params, &filter).await?;

        if let Some(key) = &cache_key {
            let _ = self
                .cache
                .set(key, &result, Duration::from_secs(POST_LIST_CACHE_TTL_SECS))
                .await;
        }
        Ok(result)
    }

    /// Posts matching `filter` in any status (admin)
    pub async fn list(&self, params: &ListParams, filter: &PostFilter) -> Result<PagedResult<Post>, PostServiceError> {
        let items = self
            .repo
            .list(filter, params.offset(), params.limit())
            .await
            .context("Failed to list posts")?;
        let total = self.repo.count(filter).await.context("Failed to count posts")?;
        Ok(PagedResult::new(items, total, params))
    }

    /// Latest published posts for feeds and sitemaps
    pub async fn latest_published(&self, limit: i64) -> Result<Vec<Post>, PostServiceError> {
        Ok(self
            .repo
            .list(&PostFilter::published(), 0, limit)
            .await
            .context("Failed to list latest posts")?)
    }

    pub async fn count_published(&self) -> Result<i64, PostServiceError> {
        Ok(self.repo.count(&PostFilter::published()).await?)
    }

    pub async fn update(&self, id: i64, input: UpdatePostInput) -> Result<Post, PostServiceError> {
        let mut post = self.get_by_id(id).await?;
        let previous_slug = post.slug.clone();

        if let Some(title) = input.title {
            post.title = validate_title(&title)?;
        }

        if let Some(slug) = input.slug {
            let slug = resolve_slug(Some(&slug), &post.title).map_err(PostServiceError::ValidationError)?;
            if slug != post.slug && self.repo.exists_by_slug(&slug, Some(id)).await? {
                return Err(PostServiceError::DuplicateSlug(slug));
            }
            post.slug = slug;
        }

        let previous_auto_excerpt = self.auto_excerpt(&post.content);
        if let Some(content) = input.content {
            validate_content(&content)?;
            post.content_html = self.renderer.render(&content);
            post.reading_minutes = self.renderer.reading_minutes(&content);
            post.content = content;
        }

        // A derived excerpt follows the body; an authored one stays as written
        match input.excerpt {
            Some(excerpt) => {
                post.excerpt = blank_to_none(excerpt).or_else(|| self.auto_excerpt(&post.content));
            }
            None if post.excerpt == previous_auto_excerpt => {
                post.excerpt = self.auto_excerpt(&post.content);
            }
            None => {}
        }

        if let Some(cover_image) = input.cover_image {
            post.cover_image = blank_to_none(cover_image);
        }
        if let Some(category_id) = input.category_id {
            post.category_id = self.ensure_category(category_id).await?;
        }
        if let Some(author_id) = input.author_id {
            if let Some(author_id) = author_id {
                self.ensure_author(author_id).await?;
            }
            post.author_id = author_id;
        }
        if let Some(hub_id) = input.hub_id {
            if let Some(hub_id) = hub_id {
                self.ensure_hub(hub_id).await?;
            }
            post.hub_id = hub_id;
        }
        if let Some(seo) = input.seo {
            post.seo = seo;
        }
        if let Some(faqs) = input.faqs {
            post.faqs = validate_faqs(faqs)?;
        }
        if let Some(comparison) = input.comparison {
            post.comparison = comparison.map(validate_comparison).transpose()?;
        }

        if let Some(status) = input.status {
            // First publication stamps the date; later re-publishing keeps it
            if status == PostStatus::Published && post.published_at.is_none() {
                post.published_at = Some(Utc::now());
            }
            post.status = status;
        }

        let updated = self.repo.update(&post).await.context("Failed to update post")?;

        self.invalidate_cache().await;
        tracing::info!(id, slug = %updated.slug, previous_slug = %previous_slug, "Post updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), PostServiceError> {
        let post = self.get_by_id(id).await?;
        self.repo.delete(id).await.context("Failed to delete post")?;

        self.invalidate_cache().await;
        tracing::info!(id, slug = %post.slug, "Post deleted");
        Ok(())
    }

    /// Rows of the admin post table, sorted by `column`.
    ///
    /// Each row is a flat JSON object whose cells are compared by the table
    /// engine (numeric cells numerically, text cells by collation).
    pub async fn admin_table(
        &self,
        column: &str,
        direction: SortDirection,
    ) -> Result<Vec<serde_json::Value>, PostServiceError> {
        let posts = self
            .repo
            .list(&PostFilter::default(), 0, MAX_TABLE_ROWS)
            .await
            .context("Failed to load posts for the admin table")?;

        let categories: HashMap<i64, String> = self
            .categories
            .list()
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();
        let authors: HashMap<i64, String> = self
            .authors
            .list()
            .await?
            .into_iter()
            .map(|a| (a.id, a.name))
            .collect();

        let rows: Vec<serde_json::Value> = posts
            .iter()
            .map(|post| {
                json!({
                    "id": post.id,
                    "title": post.title,
                    "slug": post.slug,
                    "status": post.status.as_str(),
                    "category": categories.get(&post.category_id),
                    "author": post.author_id.and_then(|id| authors.get(&id)),
                    "reading_minutes": post.reading_minutes,
                    "published_at": post.published_at.map(|t| t.to_rfc3339()),
                    "updated_at": post.updated_at.to_rfc3339(),
                })
            })
            .collect();

        Ok(sort_rows(&rows, column, direction))
    }

    /// The comparison table of a published post with its rows sorted.
    ///
    /// `None` when the post has no comparison block.
    pub async fn sorted_comparison(
        &self,
        slug: &str,
        column: Option<&str>,
        direction: SortDirection,
    ) -> Result<Option<ComparisonTable>, PostServiceError> {
        let post = self.get_published_by_slug(slug).await?;
        let Some(mut table) = post.comparison else {
            return Ok(None);
        };

        if let Some(column) = column {
            if !table.columns.iter().any(|c| c == column) {
                return Err(PostServiceError::ValidationError(format!(
                    "Unknown comparison column: {}",
                    column
                )));
            }
            table.rows = sort_rows(&table.rows, column, direction);
        }
        Ok(Some(table))
    }

    fn auto_excerpt(&self, content: &str) -> Option<String> {
        let excerpt = self.renderer.excerpt(content, AUTO_EXCERPT_CHARS);
        (!excerpt.is_empty()).then_some(excerpt)
    }

    async fn unique_slug(&self, base: &str, exclude_id: Option<i64>) -> Result<String, PostServiceError> {
        if !self.repo.exists_by_slug(base, exclude_id).await? {
            return Ok(base.to_string());
        }
        for n in 2..=MAX_SLUG_SUFFIX {
            let candidate = format!("{}-{}", base, n);
            if !self.repo.exists_by_slug(&candidate, exclude_id).await? {
                return Ok(candidate);
            }
        }
        Err(PostServiceError::DuplicateSlug(base.to_string()))
    }

    async fn ensure_category(&self, id: i64) -> Result<i64, PostServiceError> {
        match self.categories.get_by_id(id).await? {
            Some(category) => Ok(category.id),
            None => Err(PostServiceError::ValidationError(format!(
                "Category {} does not exist",
                id
            ))),
        }
    }

    async fn ensure_author(&self, id: i64) -> Result<(), PostServiceError> {
        match self.authors.get_by_id(id).await? {
            Some(_) => Ok(()),
            None => Err(PostServiceError::ValidationError(format!(
                "Author {} does not exist",
                id
            ))),
        }
    }

    async fn ensure_hub(&self, id: i64) -> Result<(), PostServiceError> {
        match self.hubs.get_by_id(id).await? {
            Some(_) => Ok(()),
            None => Err(PostServiceError::ValidationError(format!("Hub {} does not exist", id))),
        }
    }

    async fn invalidate_cache(&self) {
        let _ = self.cache.delete_pattern("post:*").await;
        // Published counts per category
        let _ = self.cache.delete_pattern("category:*").await;
    }
}

fn list_cache_key(filter: &PostFilter, params: &ListParams) -> String {
    fn part(value: Option<i64>) -> String {
        value.map(|v| v.to_string()).unwrap_or_default()
    }
    format!(
        "{}{}:{}:c{}:h{}:a{}",
        CACHE_KEY_POST_LIST,
        params.page,
        params.per_page,
        part(filter.category_id),
        part(filter.hub_id),
        part(filter.author_id),
    )
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn validate_title(title: &str) -> Result<String, PostServiceError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(PostServiceError::ValidationError(
            "Title cannot be empty".to_string(),
        ));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(PostServiceError::ValidationError(format!(
            "Title cannot exceed {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(title.to_string())
}

fn validate_content(content: &str) -> Result<(), PostServiceError> {
    if content.trim().is_empty() {
        return Err(PostServiceError::ValidationError(
            "Content cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_faqs(faqs: Vec<Faq>) -> Result<Vec<Faq>, PostServiceError> {
    faqs.into_iter()
        .enumerate()
        .map(|(i, faq)| {
            let question = faq.question.trim().to_string();
            let answer = faq.answer.trim().to_string();
            if question.is_empty() || answer.is_empty() {
                return Err(PostServiceError::ValidationError(format!(
                    "FAQ {} needs both a question and an answer",
                    i + 1
                )));
            }
            Ok(Faq { question, answer })
        })
        .collect()
}

fn validate_comparison(table: ComparisonTable) -> Result<ComparisonTable, PostServiceError> {
    let columns: Vec<String> = table.columns.iter().map(|c| c.trim().to_string()).collect();
    if columns.is_empty() || columns.iter().any(String::is_empty) {
        return Err(PostServiceError::ValidationError(
            "Comparison table needs named columns".to_string(),
        ));
    }
    for (i, column) in columns.iter().enumerate() {
        if columns[..i].contains(column) {
            return Err(PostServiceError::ValidationError(format!(
                "Duplicate comparison column: {}",
                column
            )));
        }
    }

    let rows: Vec<BTreeMap<String, String>> = table
        .rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|(k, v)| (k.trim().to_string(), v))
                .collect::<BTreeMap<_, _>>()
        })
        .collect();
    if let Some(unknown) = rows
        .iter()
        .flat_map(|row| row.keys())
        .find(|key| !columns.contains(key))
    {
        return Err(PostServiceError::ValidationError(format!(
            "Comparison row uses unknown column: {}",
            unknown
        )));
    }

    Ok(ComparisonTable {
        title: table.title.filter(|t| !t.trim().is_empty()),
        columns,
        rows,
    })
}
