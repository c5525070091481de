//! Visit repository
//!
//! Append-only page view log plus the aggregate queries behind the admin
//! traffic summary.

use crate::db::DbPool;
use crate::models::{PageCount, Visit};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait VisitRepository: Send + Sync {
    async fn record(&self, session_id: &str, page_url: &str, at: DateTime<Utc>) -> Result<Visit>;

    /// Visits at or after `since`
    async fn count_since(&self, since: DateTime<Utc>) -> Result<i64>;

    /// Distinct sessions at or after `since`
    async fn unique_sessions_since(&self, since: DateTime<Utc>) -> Result<i64>;

    /// Most visited pages at or after `since`, highest count first
    async fn top_pages_since(&self, since: DateTime<Utc>, limit: i64) -> Result<Vec<PageCount>>;

    /// Delete visits older than `before`, returning how many were removed
    async fn purge_before(&self, before: DateTime<Utc>) -> Result<u64>;
}

pub struct SqlxVisitRepository {
    pool: DbPool,
}

impl SqlxVisitRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn VisitRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl VisitRepository for SqlxVisitRepository {
    async fn record(&self, session_id: &str, page_url: &str, at: DateTime<Utc>) -> Result<Visit> {
        let result =
            sqlx::query("INSERT INTO visits (session_id, page_url, visited_at) VALUES (?, ?, ?)")
                .bind(session_id)
                .bind(page_url)
                .bind(at)
                .execute(self.pool.pool())
                .await
                .context("Failed to record visit")?;

        Ok(Visit {
            id: result.last_insert_rowid(),
            session_id: session_id.to_string(),
            page_url: page_url.to_string(),
            visited_at: at,
        })
    }

    async fn count_since(&self, since: DateTime<Utc>) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM visits WHERE visited_at >= ?")
            .bind(since)
            .fetch_one(self.pool.pool())
            .await
            .context("Failed to count visits")
    }

    async fn unique_sessions_since(&self, since: DateTime<Utc>) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(DISTINCT session_id) FROM visits WHERE visited_at >= ?")
            .bind(since)
            .fetch_one(self.pool.pool())
            .await
            .context("Failed to count unique sessions")
    }

    async fn top_pages_since(&self, since: DateTime<Utc>, limit: i64) -> Result<Vec<PageCount>> {
        let rows = sqlx::query(
            r#"
            SELECT page_url, COUNT(*) AS visits
            FROM visits
            WHERE visited_at >= ?
            GROUP BY page_url
            ORDER BY visits DESC, page_url
            LIMIT ?
            "#,
        )
        .bind(since)
        .bind(limit)
        .fetch_all(self.pool.pool())
        .await
        .context("Failed to aggregate top pages")?;

        Ok(rows
            .iter()
            .map(|row| PageCount {
                page_url: row.get("page_url"),
                visits: row.get("visits"),
            })
            .collect())
    }

    async fn purge_before(&self, before: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM visits WHERE visited_at < ?")
            .bind(before)
            .execute(self.pool.pool())
            .await
            .context("Failed to purge visits")?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;

    async fn setup_test_repo() -> SqlxVisitRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxVisitRepository::new(pool)
    }

    #[tokio::test]
    async fn test_aggregates() {
        let repo = setup_test_repo().await;
        let now = Utc::now();

        repo.record("s1", "/posts/a", now).await.unwrap();
        repo.record("s1", "/posts/b", now).await.unwrap();
        repo.record("s2", "/posts/a", now).await.unwrap();
        repo.record("s3", "/posts/old", now - Duration::days(10)).await.unwrap();

        let since = now - Duration::days(1);
        assert_eq!(repo.count_since(since).await.unwrap(), 3);
        assert_eq!(repo.unique_sessions_since(since).await.unwrap(), 2);

        let top = repo.top_pages_since(since, 10).await.unwrap();
        assert_eq!(top[0].page_url, "/posts/a");
        assert_eq!(top[0].visits, 2);
        assert_eq!(top.len(), 2);
    }

    #[tokio::test]
    async fn test_purge_before() {
        let repo = setup_test_repo().await;
        let now = Utc::now();
        repo.record("s1", "/", now - Duration::days(100)).await.unwrap();
        repo.record("s2", "/", now).await.unwrap();

        let removed = repo.purge_before(now - Duration::days(90)).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(repo.count_since(now - Duration::days(365)).await.unwrap(), 1);
    }
}
