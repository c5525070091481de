//! Author repository

use crate::db::DbPool;
use crate::models::Author;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait AuthorRepository: Send + Sync {
    async fn create(&self, author: &Author) -> Result<Author>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Author>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Author>>;

    /// All authors ordered by name
    async fn list(&self) -> Result<Vec<Author>>;

    async fn update(&self, author: &Author) -> Result<Author>;

    async fn delete(&self, id: i64) -> Result<()>;

    /// Check if a slug is taken by an author other than `exclude_id`
    async fn exists_by_slug(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;
}

pub struct SqlxAuthorRepository {
    pool: DbPool,
}

impl SqlxAuthorRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn AuthorRepository> {
        Arc::new(Self::new(pool))
    }
}

const AUTHOR_COLUMNS: &str = "id, slug, name, bio, avatar, job_title, website, same_as, created_at";

#[async_trait]
impl AuthorRepository for SqlxAuthorRepository {
    async fn create(&self, author: &Author) -> Result<Author> {
        let now = Utc::now();
        let same_as = serde_json::to_string(&author.same_as).context("Failed to encode sameAs")?;

        let result = sqlx::query(
            r#"
            INSERT INTO authors (slug, name, bio, avatar, job_title, website, same_as, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&author.slug)
        .bind(&author.name)
        .bind(&author.bio)
        .bind(&author.avatar)
        .bind(&author.job_title)
        .bind(&author.website)
        .bind(same_as)
        .bind(now)
        .execute(self.pool.pool())
        .await
        .context("Failed to create author")?;

        Ok(Author {
            id: result.last_insert_rowid(),
            created_at: now,
            ..author.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Author>> {
        let row = sqlx::query(&format!("SELECT {} FROM authors WHERE id = ?", AUTHOR_COLUMNS))
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .context("Failed to get author by ID")?;

        row.as_ref().map(row_to_author).transpose()
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Author>> {
        let row = sqlx::query(&format!("SELECT {} FROM authors WHERE slug = ?", AUTHOR_COLUMNS))
            .bind(slug)
            .fetch_optional(self.pool.pool())
            .await
            .context("Failed to get author by slug")?;

        row.as_ref().map(row_to_author).transpose()
    }

    async fn list(&self) -> Result<Vec<Author>> {
        let rows = sqlx::query(&format!("SELECT {} FROM authors ORDER BY name", AUTHOR_COLUMNS))
            .fetch_all(self.pool.pool())
            .await
            .context("Failed to list authors")?;

        rows.iter().map(row_to_author).collect()
    }

    async fn update(&self, author: &Author) -> Result<Author> {
        let same_as = serde_json::to_string(&author.same_as).context("Failed to encode sameAs")?;

        sqlx::query(
            r#"
            UPDATE authors
            SET slug = ?, name = ?, bio = ?, avatar = ?, job_title = ?, website = ?, same_as = ?
            WHERE id = ?
            "#,
        )
        .bind(&author.slug)
        .bind(&author.name)
        .bind(&author.bio)
        .bind(&author.avatar)
        .bind(&author.job_title)
        .bind(&author.website)
        .bind(same_as)
        .bind(author.id)
        .execute(self.pool.pool())
        .await
        .context("Failed to update author")?;

        self.get_by_id(author.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Author not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM authors WHERE id = ?")
            .bind(id)
            .execute(self.pool.pool())
            .await
            .context("Failed to delete author")?;
        Ok(())
    }

    async fn exists_by_slug(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM authors WHERE slug = ? AND id != ?")
            .bind(slug)
            .bind(exclude_id.unwrap_or(0))
            .fetch_one(self.pool.pool())
            .await
            .context("Failed to check author slug existence")?;
        Ok(count > 0)
    }
}

fn row_to_author(row: &SqliteRow) -> Result<Author> {
    let same_as: String = row.get("same_as");

    Ok(Author {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
        bio: row.get("bio"),
        avatar: row.get("avatar"),
        job_title: row.get("job_title"),
        website: row.get("website"),
        same_as: serde_json::from_str(&same_as).context("Failed to decode sameAs")?,
        created_at: row.get("created_at"),
    })
}
