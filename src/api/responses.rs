//! Shared API response types
//!
//! Public pages are returned as view models: the entity, its SEO meta tags,
//! breadcrumb trail and JSON-LD blocks, plus a pagination view for listings.

use serde::Serialize;
use serde_json::Value;

use crate::models::{Author, Category, Hub, PagedResult, Post};
use crate::services::pagination::PaginationView;
use crate::services::schema::{self, json_ld_script};
use crate::services::seo::{Breadcrumb, SeoMeta};
use crate::services::SiteSettings;

/// Category info embedded in post responses
#[derive(Debug, Clone, Serialize)]
pub struct CategoryInfo {
    pub id: i64,
    pub slug: String,
    pub name: String,
}

impl From<&Category> for CategoryInfo {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id,
            slug: category.slug.clone(),
            name: category.name.clone(),
        }
    }
}

/// Post card for list views
#[derive(Debug, Serialize)]
pub struct PostSummary {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
    pub category_id: i64,
    pub author_id: Option<i64>,
    pub hub_id: Option<i64>,
    pub reading_minutes: i64,
    pub published_at: Option<String>,
}

impl From<&Post> for PostSummary {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id,
            slug: post.slug.clone(),
            title: post.title.clone(),
            excerpt: post.excerpt.clone(),
            cover_image: post.cover_image.clone(),
            category_id: post.category_id,
            author_id: post.author_id,
            hub_id: post.hub_id,
            reading_minutes: post.reading_minutes,
            published_at: post.published_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Paginated list with the page bar view model
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
    /// Absent when everything fits on one page or `page` is past the end
    pub pagination: Option<PaginationView>,
}

impl<T> ListResponse<T> {
    pub fn from_paged<U>(result: PagedResult<U>, f: impl FnMut(U) -> T) -> Self {
        let total_pages = result.total_pages();
        let pagination = if result.page > total_pages {
            None
        } else {
            PaginationView::build(result.page, total_pages)
        };
        let result = result.map(f);
        Self {
            items: result.items,
            total: result.total,
            page: result.page,
            per_page: result.per_page,
            total_pages,
            pagination,
        }
    }
}

/// JSON-LD blocks as values and as ready-to-embed script tags
#[derive(Debug, Serialize)]
pub struct StructuredData {
    pub json_ld: Vec<Value>,
    pub scripts: String,
}

impl StructuredData {
    pub fn new(json_ld: Vec<Value>) -> Self {
        let scripts = json_ld.iter().map(json_ld_script).collect::<Vec<_>>().join("\n");
        Self { json_ld, scripts }
    }
}

/// Public post page
#[derive(Debug, Serialize)]
pub struct PostPageResponse {
    pub post: Post,
    pub category: Option<CategoryInfo>,
    pub author: Option<Author>,
    pub hub: Option<Hub>,
    pub seo: SeoMeta,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub structured_data: StructuredData,
}

/// Hub or category landing page
#[derive(Debug, Serialize)]
pub struct CollectionPageResponse<E> {
    #[serde(flatten)]
    pub entity: E,
    pub posts: ListResponse<PostSummary>,
    pub seo: SeoMeta,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub structured_data: StructuredData,
}

impl<E> CollectionPageResponse<E> {
    /// Landing page at `path` listing one page of the collection's posts
    pub fn build(
        entity: E,
        name: &str,
        description: Option<&str>,
        path: &str,
        breadcrumbs: Vec<Breadcrumb>,
        posts: PagedResult<Post>,
        settings: &SiteSettings,
    ) -> Self {
        let json_ld = vec![
            schema::collection_page(name, description, path, &posts.items, settings),
            schema::breadcrumb_list(&breadcrumbs, settings),
        ];
        Self {
            entity,
            posts: ListResponse::from_paged(posts, |p| PostSummary::from(&p)),
            seo: SeoMeta::for_page(name, description, path, settings),
            breadcrumbs,
            structured_data: StructuredData::new(json_ld),
        }
    }
}

/// Author profile page
#[derive(Debug, Serialize)]
pub struct AuthorPageResponse {
    pub author: Author,
    pub posts: ListResponse<PostSummary>,
    pub seo: SeoMeta,
    pub structured_data: StructuredData,
}
