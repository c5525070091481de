//! Category repository
//!
//! Database operations for the flat category taxonomy.

use crate::db::DbPool;
use crate::models::{Category, CategoryWithCount, DEFAULT_CATEGORY_SLUG};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(&self, category: &Category) -> Result<Category>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    /// All categories ordered by `sort_order`, then name
    async fn list(&self) -> Result<Vec<Category>>;

    /// All categories with their published post counts
    async fn list_with_counts(&self) -> Result<Vec<CategoryWithCount>>;

    async fn update(&self, category: &Category) -> Result<Category>;

    async fn delete(&self, id: i64) -> Result<()>;

    /// Check if a name is taken by a category other than `exclude_id`
    async fn exists_by_name(&self, name: &str, exclude_id: Option<i64>) -> Result<bool>;

    /// Check if a slug is taken by a category other than `exclude_id`
    async fn exists_by_slug(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;

    /// The "uncategorized" category
    async fn get_default(&self) -> Result<Option<Category>> {
        self.get_by_slug(DEFAULT_CATEGORY_SLUG).await
    }
}

pub struct SqlxCategoryRepository {
    pool: DbPool,
}

impl SqlxCategoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DbPool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, category: &Category) -> Result<Category> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO categories (slug, name, description, sort_order, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&category.slug)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.sort_order)
        .bind(now)
        .execute(self.pool.pool())
        .await
        .context("Failed to create category")?;

        Ok(Category {
            id: result.last_insert_rowid(),
            created_at: now,
            ..category.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        let row = sqlx::query(
            "SELECT id, slug, name, description, sort_order, created_at FROM categories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await
        .context("Failed to get category by ID")?;

        Ok(row.as_ref().map(row_to_category))
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let row = sqlx::query(
            "SELECT id, slug, name, description, sort_order, created_at FROM categories WHERE slug = ?",
        )
        .bind(slug)
        .fetch_optional(self.pool.pool())
        .await
        .context("Failed to get category by slug")?;

        Ok(row.as_ref().map(row_to_category))
    }

    async fn list(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query(
            r#"
            SELECT id, slug, name, description, sort_order, created_at
            FROM categories
            ORDER BY sort_order, name
            "#,
        )
        .fetch_all(self.pool.pool())
        .await
        .context("Failed to list categories")?;

        Ok(rows.iter().map(row_to_category).collect())
    }

    async fn list_with_counts(&self) -> Result<Vec<CategoryWithCount>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.slug, c.name, c.description, c.sort_order, c.created_at,
                   COUNT(p.id) AS post_count
            FROM categories c
            LEFT JOIN posts p ON p.category_id = c.id AND p.status = 'published'
            GROUP BY c.id
            ORDER BY c.sort_order, c.name
            "#,
        )
        .fetch_all(self.pool.pool())
        .await
        .context("Failed to list categories with counts")?;

        Ok(rows
            .iter()
            .map(|row| CategoryWithCount {
                category: row_to_category(row),
                post_count: row.get("post_count"),
            })
            .collect())
    }

    async fn update(&self, category: &Category) -> Result<Category> {
        sqlx::query(
            r#"
            UPDATE categories
            SET slug = ?, name = ?, description = ?, sort_order = ?
            WHERE id = ?
            "#,
        )
        .bind(&category.slug)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.sort_order)
        .bind(category.id)
        .execute(self.pool.pool())
        .await
        .context("Failed to update category")?;

        self.get_by_id(category.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Category not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(self.pool.pool())
            .await
            .context("Failed to delete category")?;
        Ok(())
    }

    async fn exists_by_name(&self, name: &str, exclude_id: Option<i64>) -> Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE name = ? AND id != ?")
                .bind(name)
                .bind(exclude_id.unwrap_or(0))
                .fetch_one(self.pool.pool())
                .await
                .context("Failed to check category name existence")?;
        Ok(count > 0)
    }

    async fn exists_by_slug(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE slug = ? AND id != ?")
                .bind(slug)
                .bind(exclude_id.unwrap_or(0))
                .fetch_one(self.pool.pool())
                .await
                .context("Failed to check category slug existence")?;
        Ok(count > 0)
    }
}

fn row_to_category(row: &SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
        description: row.get("description"),
        sort_order: row.get("sort_order"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DbPool, SqlxCategoryRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxCategoryRepository::new(pool.clone());
        (pool, repo)
    }

    #[tokio::test]
    async fn test_default_category_exists() {
        let (_pool, repo) = setup_test_repo().await;
        let default = repo.get_default().await.unwrap().expect("default category");
        assert!(default.is_default());
    }

    #[tokio::test]
    async fn test_create_and_list_ordered() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&Category::new("zeta".into(), "Zeta".into(), None, 2))
            .await
            .unwrap();
        repo.create(&Category::new("alpha".into(), "Alpha".into(), None, 1))
            .await
            .unwrap();

        let slugs: Vec<String> = repo.list().await.unwrap().into_iter().map(|c| c.slug).collect();
        assert_eq!(slugs, vec!["uncategorized", "alpha", "zeta"]);
    }

    #[tokio::test]
    async fn test_exists_checks() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo
            .create(&Category::new("rust".into(), "Rust".into(), None, 0))
            .await
            .unwrap();

        assert!(repo.exists_by_name("Rust", None).await.unwrap());
        assert!(!repo.exists_by_name("Rust", Some(created.id)).await.unwrap());
        assert!(repo.exists_by_slug("rust", None).await.unwrap());
        assert!(!repo.exists_by_slug("go", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_with_counts_only_published() {
        let (pool, repo) = setup_test_repo().await;
        pool.execute(
            "INSERT INTO posts (slug, title, content, content_html, category_id, status) VALUES \
             ('a', 'A', '', '', 1, 'published'), ('b', 'B', '', '', 1, 'draft')",
        )
        .await
        .unwrap();

        let counts = repo.list_with_counts().await.unwrap();
        let default = counts.iter().find(|c| c.category.is_default()).unwrap();
        assert_eq!(default.post_count, 1);
    }
}
