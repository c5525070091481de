//! Post model
//!
//! This module provides:
//! - `Post` entity with its SEO and structured-content fields
//! - `PostStatus` enum for publication states
//! - `Faq` and `ComparisonTable` blocks stored as JSON columns
//! - Input types for creating and updating posts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Blog post entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    /// URL-friendly slug (unique)
    pub slug: String,
    pub title: String,
    /// Short summary shown in listings and feeds
    pub excerpt: Option<String>,
    /// Markdown source
    pub content: String,
    /// Rendered HTML
    pub content_html: String,
    pub cover_image: Option<String>,
    pub author_id: Option<i64>,
    pub category_id: i64,
    /// Topic hub this post belongs to
    pub hub_id: Option<i64>,
    pub status: PostStatus,
    #[serde(flatten)]
    pub seo: PostSeo,
    /// Question/answer pairs rendered as an FAQ block
    #[serde(default)]
    pub faqs: Vec<Faq>,
    /// Optional product/option comparison table
    #[serde(default)]
    pub comparison: Option<ComparisonTable>,
    /// Estimated reading time, at least one minute
    pub reading_minutes: i64,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create a new post with the given parameters
    pub fn new(
        slug: String,
        title: String,
        content: String,
        content_html: String,
        category_id: i64,
        status: PostStatus,
    ) -> Self {
        let now = Utc::now();
        let published_at = if status == PostStatus::Published {
            Some(now)
        } else {
            None
        };

        Self {
            id: 0,
            slug,
            title,
            excerpt: None,
            content,
            content_html,
            cover_image: None,
            author_id: None,
            category_id,
            hub_id: None,
            status,
            seo: PostSeo::default(),
            faqs: Vec::new(),
            comparison: None,
            reading_minutes: 1,
            published_at,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published
    }

    /// Title used in `<title>` and social cards
    pub fn display_title(&self) -> &str {
        self.seo
            .meta_title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.title)
    }

    /// Description used in meta tags, falling back to the excerpt
    pub fn display_description(&self) -> Option<&str> {
        self.seo
            .meta_description
            .as_deref()
            .or(self.excerpt.as_deref())
            .filter(|d| !d.trim().is_empty())
    }
}

/// Per-post SEO overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostSeo {
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub canonical_url: Option<String>,
    pub focus_keyword: Option<String>,
    pub og_image: Option<String>,
}

/// Post publication status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    /// Not visible to the public
    #[default]
    Draft,
    Published,
    /// Hidden but kept
    Archived,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
            PostStatus::Archived => "archived",
        }
    }

    /// Parse status from its database representation
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(PostStatus::Draft),
            "published" => Some(PostStatus::Published),
            "archived" => Some(PostStatus::Archived),
            _ => None,
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A question and its answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Faq {
    pub question: String,
    pub answer: String,
}

/// Comparison table embedded in a post
///
/// Each row maps column names to cell text; cells are compared by the
/// sortable table engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonTable {
    #[serde(default)]
    pub title: Option<String>,
    pub columns: Vec<String>,
    pub rows: Vec<BTreeMap<String, String>>,
}

/// Input for creating a new post
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePostInput {
    pub title: String,
    /// Derived from the title when absent
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    pub content: String,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub author_id: Option<i64>,
    /// Defaults to the uncategorized category
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub hub_id: Option<i64>,
    #[serde(default)]
    pub status: Option<PostStatus>,
    #[serde(flatten)]
    pub seo: PostSeo,
    #[serde(default)]
    pub faqs: Vec<Faq>,
    #[serde(default)]
    pub comparison: Option<ComparisonTable>,
}

impl CreatePostInput {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_status(mut self, status: PostStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_author(mut self, author_id: i64) -> Self {
        self.author_id = Some(author_id);
        self
    }

    pub fn with_hub(mut self, hub_id: i64) -> Self {
        self.hub_id = Some(hub_id);
        self
    }

    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.excerpt = Some(excerpt.into());
        self
    }

    pub fn with_faqs(mut self, faqs: Vec<Faq>) -> Self {
        self.faqs = faqs;
        self
    }

    pub fn with_comparison(mut self, comparison: ComparisonTable) -> Self {
        self.comparison = Some(comparison);
        self
    }
}

/// Input for updating an existing post; absent fields are left unchanged
///
/// Nullable columns use `Option<Option<_>>`: `Some(None)` clears the value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePostInput {
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, with = "double_option")]
    pub excerpt: Option<Option<String>>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, with = "double_option")]
    pub cover_image: Option<Option<String>>,
    #[serde(default, with = "double_option")]
    pub author_id: Option<Option<i64>>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default, with = "double_option")]
    pub hub_id: Option<Option<i64>>,
    #[serde(default)]
    pub status: Option<PostStatus>,
    #[serde(default)]
    pub seo: Option<PostSeo>,
    #[serde(default)]
    pub faqs: Option<Vec<Faq>>,
    #[serde(default, with = "double_option")]
    pub comparison: Option<Option<ComparisonTable>>,
}

impl UpdatePostInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_status(mut self, status: PostStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_hub(mut self, hub_id: Option<i64>) -> Self {
        self.hub_id = Some(hub_id);
        self
    }

    /// Check if any field is set
    pub fn has_changes(&self) -> bool {
        self.slug.is_some()
            || self.title.is_some()
            || self.excerpt.is_some()
            || self.content.is_some()
            || self.cover_image.is_some()
            || self.author_id.is_some()
            || self.category_id.is_some()
            || self.hub_id.is_some()
            || self.status.is_some()
            || self.seo.is_some()
            || self.faqs.is_some()
            || self.comparison.is_some()
    }
}

/// Distinguishes an absent field from an explicit `null`
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
