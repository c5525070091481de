//! SEO metadata and breadcrumbs
//!
//! Page-level meta tags (title, description, canonical URL, Open Graph and
//! Twitter cards) derived from post SEO fields, falling back to the site
//! settings wherever a post leaves a field blank.

use serde::Serialize;

use crate::models::{Category, Hub, Post};
use crate::services::settings::{non_empty, SiteSettings};

pub fn post_path(slug: &str) -> String {
    format!("/posts/{}", slug)
}

pub fn category_path(slug: &str) -> String {
    format!("/categories/{}", slug)
}

pub fn hub_path(slug: &str) -> String {
    format!("/hubs/{}", slug)
}

pub fn author_path(slug: &str) -> String {
    format!("/authors/{}", slug)
}

/// One step of a breadcrumb trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    pub name: String,
    /// Site-relative path
    pub path: String,
}

impl Breadcrumb {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    fn home() -> Self {
        Self::new("Home", "/")
    }
}

/// Home › Category › Post. The category step is skipped when unknown.
pub fn post_breadcrumbs(post: &Post, category: Option<&Category>) -> Vec<Breadcrumb> {
    let mut trail = vec![Breadcrumb::home()];
    if let Some(category) = category {
        trail.push(Breadcrumb::new(&category.name, category_path(&category.slug)));
    }
    trail.push(Breadcrumb::new(&post.title, post_path(&post.slug)));
    trail
}

/// Home › Hub
pub fn hub_breadcrumbs(hub: &Hub) -> Vec<Breadcrumb> {
    vec![Breadcrumb::home(), Breadcrumb::new(&hub.name, hub_path(&hub.slug))]
}

/// Home › Category
pub fn category_breadcrumbs(category: &Category) -> Vec<Breadcrumb> {
    vec![
        Breadcrumb::home(),
        Breadcrumb::new(&category.name, category_path(&category.slug)),
    ]
}

/// Meta tags for one page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeoMeta {
    /// Full `<title>` text
    pub title: String,
    pub description: String,
    pub canonical_url: String,
    pub keywords: Option<String>,
    pub og_type: &'static str,
    pub og_title: String,
    pub og_description: String,
    pub og_url: String,
    pub og_image: Option<String>,
    pub og_site_name: String,
    pub og_locale: String,
    pub twitter_card: &'static str,
    pub twitter_site: Option<String>,
    pub article_published_time: Option<String>,
    pub article_modified_time: Option<String>,
}

impl SeoMeta {
    /// Meta tags for a post page
    pub fn for_post(post: &Post, settings: &SiteSettings) -> Self {
        let heading = post.display_title().to_string();
        let description = post
            .display_description()
            .map(str::to_string)
            .unwrap_or_else(|| settings.site_description.clone());

        let canonical_url = post
            .seo
            .canonical_url
            .as_deref()
            .and_then(non_empty)
            .map(|url| settings.absolute_url(url))
            .unwrap_or_else(|| settings.absolute_url(&post_path(&post.slug)));

        let image = post
            .seo
            .og_image
            .as_deref()
            .and_then(non_empty)
            .or(post.cover_image.as_deref().and_then(non_empty))
            .or(non_empty(&settings.default_og_image))
            .map(|image| settings.absolute_url(image));

        let mut meta = Self::base(&heading, description, canonical_url, image, settings);
        meta.og_type = "article";
        meta.keywords = post.seo.focus_keyword.as_deref().and_then(non_empty).map(str::to_string);
        meta.article_published_time = post.published_at.map(|t| t.to_rfc3339());
        meta.article_modified_time = Some(post.updated_at.to_rfc3339());
        meta
    }

    /// Meta tags for a listing or landing page at `path`
    pub fn for_page(
        heading: &str,
        description: Option<&str>,
        path: &str,
        settings: &SiteSettings,
    ) -> Self {
        let description = description
            .and_then(non_empty)
            .unwrap_or(&settings.site_description)
            .to_string();
        let image = non_empty(&settings.default_og_image).map(|image| settings.absolute_url(image));
        Self::base(heading, description, settings.absolute_url(path), image, settings)
    }

    /// Meta tags for the home page
    pub fn for_home(settings: &SiteSettings) -> Self {
        let mut meta = Self::for_page(&settings.site_name, None, "/", settings);
        meta.title = settings.site_name.clone();
        meta
    }

    fn base(
        heading: &str,
        description: String,
        canonical_url: String,
        image: Option<String>,
        settings: &SiteSettings,
    ) -> Self {
        Self {
            title: format!("{} | {}", heading, settings.site_name),
            og_title: heading.to_string(),
            og_description: description.clone(),
            description,
            og_url: canonical_url.clone(),
            canonical_url,
            keywords: None,
            og_type: "website",
            twitter_card: if image.is_some() {
                "summary_large_image"
            } else {
                "summary"
            },
            og_image: image,
            og_site_name: settings.site_name.clone(),
            og_locale: settings.language.replace('-', "_"),
            twitter_site: non_empty(&settings.twitter_handle).map(|h| format!("@{}", h)),
            article_published_time: None,
            article_modified_time: None,
        }
    }
}
