//! Topic hub repository

use crate::db::DbPool;
use crate::models::Hub;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait HubRepository: Send + Sync {
    async fn create(&self, hub: &Hub) -> Result<Hub>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Hub>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Hub>>;

    async fn list(&self) -> Result<Vec<Hub>>;

    async fn update(&self, hub: &Hub) -> Result<Hub>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn exists_by_slug(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;
}

pub struct SqlxHubRepository {
    pool: DbPool,
}

impl SqlxHubRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn HubRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl HubRepository for SqlxHubRepository {
    async fn create(&self, hub: &Hub) -> Result<Hub> {
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO hubs (slug, name, description, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&hub.slug)
        .bind(&hub.name)
        .bind(&hub.description)
        .bind(now)
        .execute(self.pool.pool())
        .await
        .context("Failed to create hub")?;

        Ok(Hub {
            id: result.last_insert_rowid(),
            created_at: now,
            ..hub.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Hub>> {
        let row = sqlx::query("SELECT id, slug, name, description, created_at FROM hubs WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .context("Failed to get hub by ID")?;

        Ok(row.as_ref().map(row_to_hub))
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Hub>> {
        let row =
            sqlx::query("SELECT id, slug, name, description, created_at FROM hubs WHERE slug = ?")
                .bind(slug)
                .fetch_optional(self.pool.pool())
                .await
                .context("Failed to get hub by slug")?;

        Ok(row.as_ref().map(row_to_hub))
    }

    async fn list(&self) -> Result<Vec<Hub>> {
        let rows = sqlx::query("SELECT id, slug, name, description, created_at FROM hubs ORDER BY name")
            .fetch_all(self.pool.pool())
            .await
            .context("Failed to list hubs")?;

        Ok(rows.iter().map(row_to_hub).collect())
    }

    async fn update(&self, hub: &Hub) -> Result<Hub> {
        sqlx::query("UPDATE hubs SET slug = ?, name = ?, description = ? WHERE id = ?")
            .bind(&hub.slug)
            .bind(&hub.name)
            .bind(&hub.description)
            .bind(hub.id)
            .execute(self.pool.pool())
            .await
            .context("Failed to update hub")?;

        self.get_by_id(hub.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Hub not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM hubs WHERE id = ?")
            .bind(id)
            .execute(self.pool.pool())
            .await
            .context("Failed to delete hub")?;
        Ok(())
    }

    async fn exists_by_slug(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM hubs WHERE slug = ? AND id != ?")
            .bind(slug)
            .bind(exclude_id.unwrap_or(0))
            .fetch_one(self.pool.pool())
            .await
            .context("Failed to check hub slug existence")?;
        Ok(count > 0)
    }
}

fn row_to_hub(row: &SqliteRow) -> Hub {
    Hub {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
        description: row.get("description"),
        created_at: row.get("created_at"),
    }
}
