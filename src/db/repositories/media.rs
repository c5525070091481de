//! Media repository

use crate::db::DbPool;
use crate::models::{Media, MediaLocation, NewMedia};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait MediaRepository: Send + Sync {
    async fn create(&self, media: &NewMedia) -> Result<Media>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Media>>;

    /// Newest first
    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Media>>;

    async fn count(&self) -> Result<i64>;

    async fn delete(&self, id: i64) -> Result<()>;
}

pub struct SqlxMediaRepository {
    pool: DbPool,
}

impl SqlxMediaRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn MediaRepository> {
        Arc::new(Self::new(pool))
    }
}

const MEDIA_COLUMNS: &str =
    "id, filename, original_name, url, content_type, size, location, created_at";

#[async_trait]
impl MediaRepository for SqlxMediaRepository {
    async fn create(&self, media: &NewMedia) -> Result<Media> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO media (filename, original_name, url, content_type, size, location, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&media.filename)
        .bind(&media.original_name)
        .bind(&media.url)
        .bind(&media.content_type)
        .bind(media.size)
        .bind(media.location.as_str())
        .bind(now)
        .execute(self.pool.pool())
        .await
        .context("Failed to record media")?;

        Ok(Media {
            id: result.last_insert_rowid(),
            filename: media.filename.clone(),
            original_name: media.original_name.clone(),
            url: media.url.clone(),
            content_type: media.content_type.clone(),
            size: media.size,
            location: media.location,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Media>> {
        let row = sqlx::query(&format!("SELECT {} FROM media WHERE id = ?", MEDIA_COLUMNS))
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .context("Failed to get media by ID")?;

        Ok(row.as_ref().map(row_to_media))
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Media>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM media ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            MEDIA_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool.pool())
        .await
        .context("Failed to list media")?;

        Ok(rows.iter().map(row_to_media).collect())
    }

    async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM media")
            .fetch_one(self.pool.pool())
            .await
            .context("Failed to count media")
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM media WHERE id = ?")
            .bind(id)
            .execute(self.pool.pool())
            .await
            .context("Failed to delete media")?;
        Ok(())
    }
}

fn row_to_media(row: &SqliteRow) -> Media {
    let location: String = row.get("location");
    Media {
        id: row.get("id"),
        filename: row.get("filename"),
        original_name: row.get("original_name"),
        url: row.get("url"),
        content_type: row.get("content_type"),
        size: row.get("size"),
        location: MediaLocation::parse(&location),
        created_at: row.get("created_at"),
    }
}
