//! Category model
//!
//! Categories are a flat taxonomy ordered by `sort_order`. The
//! `uncategorized` category is created by the migrations and receives the
//! posts of deleted categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Slug of the category that can never be deleted
pub const DEFAULT_CATEGORY_SLUG: &str = "uncategorized";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    /// Position in navigation, ascending
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn new(slug: String, name: String, description: Option<String>, sort_order: i32) -> Self {
        Self {
            id: 0,
            slug,
            name,
            description,
            sort_order,
            created_at: Utc::now(),
        }
    }

    /// Check if this is the default "uncategorized" category
    pub fn is_default(&self) -> bool {
        self.slug == DEFAULT_CATEGORY_SLUG
    }
}

/// Category with the number of published posts it holds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryWithCount {
    #[serde(flatten)]
    pub category: Category,
    pub post_count: i64,
}

/// Input for creating a new category
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCategoryInput {
    pub name: String,
    /// Generated from the name if not provided
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: Option<i32>,
}

impl CreateCategoryInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = Some(sort_order);
        self
    }
}

/// Input for updating a category
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCategoryInput {
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: Option<i32>,
}
