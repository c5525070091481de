//! RSS feed generation

use rss::{CategoryBuilder, ChannelBuilder, GuidBuilder, Item, ItemBuilder};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{Cache, CacheLayer};
use crate::services::category::CategoryService;
use crate::services::post::PostService;
use crate::services::seo::post_path;
use crate::services::settings::SettingsService;

pub const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";

/// Number of posts in the feed
const FEED_SIZE: i64 = 20;

const FEED_CACHE_TTL_SECS: u64 = 600;
/// Lives under the post prefix so any post write drops it
const CACHE_KEY_FEED: &str = "post:feed:rss";

/// Feed generation failed; nothing partial is served
#[derive(Debug, thiserror::Error)]
#[error("Failed to generate RSS feed")]
pub struct FeedError {
    #[source]
    source: anyhow::Error,
}

impl FeedError {
    fn new(source: impl Into<anyhow::Error>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

pub struct FeedService {
    posts: Arc<PostService>,
    categories: Arc<CategoryService>,
    settings: Arc<SettingsService>,
    cache: Arc<Cache>,
}

impl FeedService {
    pub fn new(
        posts: Arc<PostService>,
        categories: Arc<CategoryService>,
        settings: Arc<SettingsService>,
        cache: Arc<Cache>,
    ) -> Self {
        Self {
            posts,
            categories,
            settings,
            cache,
        }
    }

    /// RSS 2.0 document with the latest published posts
    pub async fn rss(&self) -> Result<String, FeedError> {
        if let Ok(Some(xml)) = self.cache.get::<String>(CACHE_KEY_FEED).await {
            return Ok(xml);
        }

        let xml = self.build_rss().await.inspect_err(|e| {
            tracing::error!(error = ?e, "RSS generation failed");
        })?;

        let _ = self
            .cache
            .set(CACHE_KEY_FEED, &xml, Duration::from_secs(FEED_CACHE_TTL_SECS))
            .await;
        Ok(xml)
    }

    async fn build_rss(&self) -> Result<String, FeedError> {
        let settings = self.settings.get_site_settings().await.map_err(FeedError::new)?;
        let posts = self
            .posts
            .latest_published(FEED_SIZE)
            .await
            .map_err(FeedError::new)?;
        let category_names: HashMap<i64, String> = self
            .categories
            .list()
            .await
            .map_err(FeedError::new)?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();

        let items: Vec<Item> = posts
            .iter()
            .map(|post| {
                let link = settings.absolute_url(&post_path(&post.slug));
                let categories = category_names
                    .get(&post.category_id)
                    .map(|name| vec![CategoryBuilder::default().name(name.clone()).build()])
                    .unwrap_or_default();

                ItemBuilder::default()
                    .title(Some(post.title.clone()))
                    .link(Some(link.clone()))
                    .guid(Some(GuidBuilder::default().value(link).permalink(true).build()))
                    .description(post.display_description().map(str::to_string))
                    .content(Some(post.content_html.clone()))
                    .pub_date(post.published_at.map(|t| t.to_rfc2822()))
                    .categories(categories)
                    .build()
            })
            .collect();

        let channel = ChannelBuilder::default()
            .title(settings.site_name.clone())
            .link(settings.absolute_url("/"))
            .description(settings.site_description.clone())
            .language(Some(settings.language.clone()))
            .last_build_date(posts.first().and_then(|p| p.published_at).map(|t| t.to_rfc2822()))
            .items(items)
            .build();

        let bytes = channel.write_to(Vec::new()).map_err(FeedError::new)?;
        String::from_utf8(bytes).map_err(FeedError::new)
    }
}
