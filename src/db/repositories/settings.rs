//! Settings repository
//!
//! Key/value storage for site settings.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::collections::HashMap;
use std::sync::Arc;

use crate::db::DbPool;

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn get_all(&self) -> Result<HashMap<String, String>>;

    /// Insert or replace a single setting
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Insert or replace several settings in one transaction
    async fn set_many(&self, settings: &HashMap<String, String>) -> Result<()>;
}

pub struct SqlxSettingsRepository {
    pool: DbPool,
}

impl SqlxSettingsRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn SettingsRepository> {
        Arc::new(Self::new(pool))
    }
}

const UPSERT_SQL: &str = "INSERT INTO settings (key, value) VALUES (?, ?) \
     ON CONFLICT(key) DO UPDATE SET value = excluded.value";

#[async_trait]
impl SettingsRepository for SqlxSettingsRepository {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(self.pool.pool())
            .await
            .with_context(|| format!("Failed to read setting {}", key))
    }

    async fn get_all(&self) -> Result<HashMap<String, String>> {
        let rows = sqlx::query("SELECT key, value FROM settings")
            .fetch_all(self.pool.pool())
            .await
            .context("Failed to read settings")?;

        Ok(rows
            .iter()
            .map(|r| (r.get("key"), r.get("value")))
            .collect())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(UPSERT_SQL)
            .bind(key)
            .bind(value)
            .execute(self.pool.pool())
            .await
            .with_context(|| format!("Failed to write setting {}", key))?;
        Ok(())
    }

    async fn set_many(&self, settings: &HashMap<String, String>) -> Result<()> {
        let mut tx = self.pool.pool().begin().await?;
        for (key, value) in settings {
            sqlx::query(UPSERT_SQL)
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to write setting {}", key))?;
        }
        tx.commit().await.context("Failed to commit settings")?;
        Ok(())
    }
}
