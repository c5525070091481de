//! Post repository
//!
//! This module provides:
//! - `PostRepository` trait defining the interface for post data access
//! - `SqlxPostRepository` implementing it on SQLite
//! - `PostFilter` for the listing queries shared by the public and admin APIs

use crate::db::DbPool;
use crate::models::{ComparisonTable, Faq, Post, PostSeo, PostStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use std::sync::Arc;

/// Listing filter; `None` fields do not constrain the query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostFilter {
    pub status: Option<PostStatus>,
    pub category_id: Option<i64>,
    pub hub_id: Option<i64>,
    pub author_id: Option<i64>,
    /// Case-insensitive substring of title or content
    pub search: Option<String>,
}

impl PostFilter {
    pub fn published() -> Self {
        Self {
            status: Some(PostStatus::Published),
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_hub(mut self, hub_id: i64) -> Self {
        self.hub_id = Some(hub_id);
        self
    }

    pub fn with_author(mut self, author_id: i64) -> Self {
        self.author_id = Some(author_id);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a post; `id`, `created_at` and `updated_at` are assigned here
    async fn create(&self, post: &Post) -> Result<Post>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>>;

    /// Persist every mutable column of `post`
    async fn update(&self, post: &Post) -> Result<Post>;

    async fn delete(&self, id: i64) -> Result<()>;

    /// Newest first (publication date, then creation date)
    async fn list(&self, filter: &PostFilter, offset: i64, limit: i64) -> Result<Vec<Post>>;

    async fn count(&self, filter: &PostFilter) -> Result<i64>;

    /// Check if a slug is taken by a post other than `exclude_id`
    async fn exists_by_slug(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;

    /// Move every post of a category to another one, returning the count
    async fn reassign_category(&self, from_category_id: i64, to_category_id: i64) -> Result<u64>;

    /// Clear the hub of every post in it, returning the count
    async fn detach_hub(&self, hub_id: i64) -> Result<u64>;
}

pub struct SqlxPostRepository {
    pool: DbPool,
}

impl SqlxPostRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DbPool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

const POST_COLUMNS: &str = "id, slug, title, excerpt, content, content_html, cover_image, \
     author_id, category_id, hub_id, status, meta_title, meta_description, canonical_url, \
     focus_keyword, og_image, faqs, comparison, reading_minutes, published_at, created_at, updated_at";

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &Post) -> Result<Post> {
        let now = Utc::now();
        let faqs = serde_json::to_string(&post.faqs).context("Failed to encode FAQs")?;
        let comparison = encode_comparison(post.comparison.as_ref())?;

        let result = sqlx::query(
            r#"
            INSERT INTO posts (slug, title, excerpt, content, content_html, cover_image,
                author_id, category_id, hub_id, status, meta_title, meta_description,
                canonical_url, focus_keyword, og_image, faqs, comparison, reading_minutes,
                published_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.slug)
        .bind(&post.title)
        .bind(&post.excerpt)
        .bind(&post.content)
        .bind(&post.content_html)
        .bind(&post.cover_image)
        .bind(post.author_id)
        .bind(post.category_id)
        .bind(post.hub_id)
        .bind(post.status.as_str())
        .bind(&post.seo.meta_title)
        .bind(&post.seo.meta_description)
        .bind(&post.seo.canonical_url)
        .bind(&post.seo.focus_keyword)
        .bind(&post.seo.og_image)
        .bind(faqs)
        .bind(comparison)
        .bind(post.reading_minutes)
        .bind(post.published_at)
        .bind(now)
        .bind(now)
        .execute(self.pool.pool())
        .await
        .context("Failed to create post")?;

        Ok(Post {
            id: result.last_insert_rowid(),
            created_at: now,
            updated_at: now,
            ..post.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .context("Failed to get post by ID")?;

        row.as_ref().map(row_to_post).transpose()
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        let row = sqlx::query(&format!("SELECT {} FROM posts WHERE slug = ?", POST_COLUMNS))
            .bind(slug)
            .fetch_optional(self.pool.pool())
            .await
            .context("Failed to get post by slug")?;

        row.as_ref().map(row_to_post).transpose()
    }

    async fn update(&self, post: &Post) -> Result<Post> {
        let now = Utc::now();
        let faqs = serde_json::to_string(&post.faqs).context("Failed to encode FAQs")?;
        let comparison = encode_comparison(post.comparison.as_ref())?;

        sqlx::query(
            r#"
            UPDATE posts
            SET slug = ?, title = ?, excerpt = ?, content = ?, content_html = ?, cover_image = ?,
                author_id = ?, category_id = ?, hub_id = ?, status = ?, meta_title = ?,
                meta_description = ?, canonical_url = ?, focus_keyword = ?, og_image = ?,
                faqs = ?, comparison = ?, reading_minutes = ?, published_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&post.slug)
        .bind(&post.title)
        .bind(&post.excerpt)
        .bind(&post.content)
        .bind(&post.content_html)
        .bind(&post.cover_image)
        .bind(post.author_id)
        .bind(post.category_id)
        .bind(post.hub_id)
        .bind(post.status.as_str())
        .bind(&post.seo.meta_title)
        .bind(&post.seo.meta_description)
        .bind(&post.seo.canonical_url)
        .bind(&post.seo.focus_keyword)
        .bind(&post.seo.og_image)
        .bind(faqs)
        .bind(comparison)
        .bind(post.reading_minutes)
        .bind(post.published_at)
        .bind(now)
        .bind(post.id)
        .execute(self.pool.pool())
        .await
        .context("Failed to update post")?;

        self.get_by_id(post.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Post not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(self.pool.pool())
            .await
            .context("Failed to delete post")?;
        Ok(())
    }

    async fn list(&self, filter: &PostFilter, offset: i64, limit: i64) -> Result<Vec<Post>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM posts", POST_COLUMNS));
        push_filter(&mut query, filter);
        query.push(" ORDER BY COALESCE(published_at, created_at) DESC, id DESC LIMIT ");
        query.push_bind(limit);
        query.push(" OFFSET ");
        query.push_bind(offset);

        let rows = query
            .build()
            .fetch_all(self.pool.pool())
            .await
            .context("Failed to list posts")?;

        rows.iter().map(row_to_post).collect()
    }

    async fn count(&self, filter: &PostFilter) -> Result<i64> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) AS count FROM posts");
        push_filter(&mut query, filter);

        let row = query
            .build()
            .fetch_one(self.pool.pool())
            .await
            .context("Failed to count posts")?;

        Ok(row.get("count"))
    }

    async fn exists_by_slug(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE slug = ? AND id != ?")
            .bind(slug)
            .bind(exclude_id.unwrap_or(0))
            .fetch_one(self.pool.pool())
            .await
            .context("Failed to check post slug existence")?;
        Ok(count > 0)
    }

    async fn reassign_category(&self, from_category_id: i64, to_category_id: i64) -> Result<u64> {
        let result = sqlx::query("UPDATE posts SET category_id = ? WHERE category_id = ?")
            .bind(to_category_id)
            .bind(from_category_id)
            .execute(self.pool.pool())
            .await
            .context("Failed to reassign posts to category")?;
        Ok(result.rows_affected())
    }

    async fn detach_hub(&self, hub_id: i64) -> Result<u64> {
        let result = sqlx::query("UPDATE posts SET hub_id = NULL WHERE hub_id = ?")
            .bind(hub_id)
            .execute(self.pool.pool())
            .await
            .context("Failed to detach posts from hub")?;
        Ok(result.rows_affected())
    }
}

fn push_filter(query: &mut QueryBuilder<'_, Sqlite>, filter: &PostFilter) {
    let mut separator = " WHERE ";

    if let Some(status) = filter.status {
        query.push(separator).push("status = ").push_bind(status.as_str());
        separator = " AND ";
    }
    if let Some(category_id) = filter.category_id {
        query.push(separator).push("category_id = ").push_bind(category_id);
        separator = " AND ";
    }
    if let Some(hub_id) = filter.hub_id {
        query.push(separator).push("hub_id = ").push_bind(hub_id);
        separator = " AND ";
    }
    if let Some(author_id) = filter.author_id {
        query.push(separator).push("author_id = ").push_bind(author_id);
        separator = " AND ";
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        query
            .push(separator)
            .push("(title LIKE ")
            .push_bind(pattern.clone())
            .push(" OR content LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn encode_comparison(comparison: Option<&ComparisonTable>) -> Result<Option<String>> {
    comparison
        .map(|c| serde_json::to_string(c).context("Failed to encode comparison table"))
        .transpose()
}

fn row_to_post(row: &SqliteRow) -> Result<Post> {
    let status_str: String = row.get("status");
    let status = PostStatus::parse(&status_str)
        .ok_or_else(|| anyhow::anyhow!("Invalid post status: {}", status_str))?;

    let faqs_json: String = row.get("faqs");
    let faqs: Vec<Faq> = serde_json::from_str(&faqs_json).context("Failed to decode FAQs")?;

    let comparison_json: Option<String> = row.get("comparison");
    let comparison = comparison_json
        .as_deref()
        .map(serde_json::from_str::<ComparisonTable>)
        .transpose()
        .context("Failed to decode comparison table")?;

    Ok(Post {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        excerpt: row.get("excerpt"),
        content: row.get("content"),
        content_html: row.get("content_html"),
        cover_image: row.get("cover_image"),
        author_id: row.get("author_id"),
        category_id: row.get("category_id"),
        hub_id: row.get("hub_id"),
        status,
        seo: PostSeo {
            meta_title: row.get("meta_title"),
            meta_description: row.get("meta_description"),
            canonical_url: row.get("canonical_url"),
            focus_keyword: row.get("focus_keyword"),
            og_image: row.get("og_image"),
        },
        faqs,
        comparison,
        reading_minutes: row.get("reading_minutes"),
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use std::collections::BTreeMap;

    async fn setup_test_repo() -> (DbPool, SqlxPostRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxPostRepository::new(pool.clone());
        (pool, repo)
    }

    fn test_post(slug: &str, status: PostStatus) -> Post {
        Post::new(
            slug.to_string(),
            format!("Title {}", slug),
            "Some **markdown**".to_string(),
            "<p>Some <strong>markdown</strong></p>".to_string(),
            1,
            status,
        )
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (_pool, repo) = setup_test_repo().await;
        let mut post = test_post("first", PostStatus::Published);
        post.faqs = vec![Faq {
            question: "Why?".into(),
            answer: "Because.".into(),
        }];
        post.seo.focus_keyword = Some("rust".into());

        let created = repo.create(&post).await.expect("Failed to create post");
        assert!(created.id > 0);

        let found = repo.get_by_slug("first").await.unwrap().expect("post exists");
        assert_eq!(found.id, created.id);
        assert_eq!(found.faqs.len(), 1);
        assert_eq!(found.seo.focus_keyword.as_deref(), Some("rust"));
        assert!(found.comparison.is_none());
        assert!(found.published_at.is_some());
    }

    #[tokio::test]
    async fn test_comparison_persisted() {
        let (_pool, repo) = setup_test_repo().await;
        let mut row = BTreeMap::new();
        row.insert("Name".to_string(), "Alpha".to_string());
        row.insert("Price".to_string(), "10".to_string());

        let mut post = test_post("compare", PostStatus::Draft);
        post.comparison = Some(ComparisonTable {
            title: Some("Plans".into()),
            columns: vec!["Name".into(), "Price".into()],
            rows: vec![row],
        });

        let created = repo.create(&post).await.unwrap();
        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.comparison, post.comparison);
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&test_post("a", PostStatus::Published)).await.unwrap();
        repo.create(&test_post("b", PostStatus::Draft)).await.unwrap();
        repo.create(&test_post("c", PostStatus::Published)).await.unwrap();

        let published = repo.list(&PostFilter::published(), 0, 10).await.unwrap();
        assert_eq!(published.len(), 2);
        assert!(published.iter().all(|p| p.is_published()));
        assert_eq!(repo.count(&PostFilter::published()).await.unwrap(), 2);
        assert_eq!(repo.count(&PostFilter::default()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let (_pool, repo) = setup_test_repo().await;
        for i in 0..5 {
            repo.create(&test_post(&format!("p{}", i), PostStatus::Draft))
                .await
                .unwrap();
        }

        let page1 = repo.list(&PostFilter::default(), 0, 2).await.unwrap();
        let page3 = repo.list(&PostFilter::default(), 4, 2).await.unwrap();
        assert_eq!(page1.len(), 2);
        assert_eq!(page3.len(), 1);
        // Newest first
        assert_eq!(page1[0].slug, "p4");
    }

    #[tokio::test]
    async fn test_search_filter() {
        let (_pool, repo) = setup_test_repo().await;
        let mut post = test_post("tokio-guide", PostStatus::Published);
        post.title = "A Tokio guide".into();
        repo.create(&post).await.unwrap();
        repo.create(&test_post("other", PostStatus::Published)).await.unwrap();

        let filter = PostFilter::published().with_search("tokio");
        let found = repo.list(&filter, 0, 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].slug, "tokio-guide");
    }

    #[tokio::test]
    async fn test_exists_by_slug_excluding() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo.create(&test_post("taken", PostStatus::Draft)).await.unwrap();

        assert!(repo.exists_by_slug("taken", None).await.unwrap());
        assert!(!repo.exists_by_slug("taken", Some(created.id)).await.unwrap());
        assert!(!repo.exists_by_slug("free", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (_pool, repo) = setup_test_repo().await;
        let mut post = repo.create(&test_post("edit-me", PostStatus::Draft)).await.unwrap();

        post.title = "Edited".into();
        post.status = PostStatus::Archived;
        let updated = repo.update(&post).await.unwrap();
        assert_eq!(updated.title, "Edited");
        assert_eq!(updated.status, PostStatus::Archived);

        repo.delete(post.id).await.unwrap();
        assert!(repo.get_by_id(post.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_detach_hub() {
        let (pool, repo) = setup_test_repo().await;
        pool.execute("INSERT INTO hubs (slug, name) VALUES ('async', 'Async')")
            .await
            .unwrap();

        let mut post = test_post("in-hub", PostStatus::Published);
        post.hub_id = Some(1);
        let created = repo.create(&post).await.unwrap();

        assert_eq!(repo.detach_hub(1).await.unwrap(), 1);
        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert!(found.hub_id.is_none());
    }
}
