//! Settings service
//!
//! Typed access to the site-wide key/value settings used by SEO, feeds and
//! listings.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::SettingsRepository;

const SETTINGS_CACHE_TTL_SECS: u64 = 3600;
const CACHE_KEY_SITE_SETTINGS: &str = "settings:site";

/// Known setting keys
pub mod keys {
    pub const SITE_NAME: &str = "site_name";
    pub const SITE_DESCRIPTION: &str = "site_description";
    pub const SITE_URL: &str = "site_url";
    pub const SITE_LOGO: &str = "site_logo";
    pub const LANGUAGE: &str = "language";
    pub const POSTS_PER_PAGE: &str = "posts_per_page";
    pub const TWITTER_HANDLE: &str = "twitter_handle";
    pub const DEFAULT_OG_IMAGE: &str = "default_og_image";
}

/// Site settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSettings {
    pub site_name: String,
    pub site_description: String,
    /// Public base URL, no trailing slash
    pub site_url: String,
    pub site_logo: String,
    pub language: String,
    pub posts_per_page: u32,
    pub twitter_handle: String,
    pub default_og_image: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            site_name: "Quillpost".to_string(),
            site_description: "A blog powered by Quillpost".to_string(),
            site_url: "http://localhost:8080".to_string(),
            site_logo: String::new(),
            language: "en".to_string(),
            posts_per_page: 10,
            twitter_handle: String::new(),
            default_og_image: String::new(),
        }
    }
}

impl SiteSettings {
    fn from_map(map: &HashMap<String, String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str, default: String| map.get(key).cloned().unwrap_or(default);

        Self {
            site_name: text(keys::SITE_NAME, defaults.site_name),
            site_description: text(keys::SITE_DESCRIPTION, defaults.site_description),
            site_url: text(keys::SITE_URL, defaults.site_url)
                .trim_end_matches('/')
                .to_string(),
            site_logo: text(keys::SITE_LOGO, defaults.site_logo),
            language: text(keys::LANGUAGE, defaults.language),
            posts_per_page: map
                .get(keys::POSTS_PER_PAGE)
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.posts_per_page),
            twitter_handle: text(keys::TWITTER_HANDLE, defaults.twitter_handle),
            default_og_image: text(keys::DEFAULT_OG_IMAGE, defaults.default_og_image),
        }
    }

    fn to_map(&self) -> HashMap<String, String> {
        HashMap::from([
            (keys::SITE_NAME.to_string(), self.site_name.clone()),
            (keys::SITE_DESCRIPTION.to_string(), self.site_description.clone()),
            (keys::SITE_URL.to_string(), self.site_url.clone()),
            (keys::SITE_LOGO.to_string(), self.site_logo.clone()),
            (keys::LANGUAGE.to_string(), self.language.clone()),
            (keys::POSTS_PER_PAGE.to_string(), self.posts_per_page.to_string()),
            (keys::TWITTER_HANDLE.to_string(), self.twitter_handle.clone()),
            (keys::DEFAULT_OG_IMAGE.to_string(), self.default_og_image.clone()),
        ])
    }

    /// Join a site-relative path onto the base URL
    pub fn absolute_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.site_url, path.trim_start_matches('/'))
    }

    /// Logo as an absolute URL, if one is set
    pub fn logo_url(&self) -> Option<String> {
        non_empty(&self.site_logo).map(|logo| self.absolute_url(logo))
    }
}

/// Return `Some` for strings with visible content
pub fn non_empty(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Partial settings update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSettingsInput {
    pub site_name: Option<String>,
    pub site_description: Option<String>,
    pub site_url: Option<String>,
    pub site_logo: Option<String>,
    pub language: Option<String>,
    pub posts_per_page: Option<u32>,
    pub twitter_handle: Option<String>,
    pub default_og_image: Option<String>,
}

#[derive(Debug, Error)]
pub enum SettingsServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct SettingsService {
    repo: Arc<dyn SettingsRepository>,
    cache: Arc<Cache>,
}

impl SettingsService {
    pub fn new(repo: Arc<dyn SettingsRepository>, cache: Arc<Cache>) -> Self {
        Self { repo, cache }
    }

    /// Current site settings, defaults filling any missing key
    pub async fn get_site_settings(&self) -> Result<SiteSettings, SettingsServiceError> {
        if let Ok(Some(settings)) = self.cache.get::<SiteSettings>(CACHE_KEY_SITE_SETTINGS).await {
            return Ok(settings);
        }

        let map = self.repo.get_all().await?;
        let settings = SiteSettings::from_map(&map);

        let _ = self
            .cache
            .set(
                CACHE_KEY_SITE_SETTINGS,
                &settings,
                Duration::from_secs(SETTINGS_CACHE_TTL_SECS),
            )
            .await;

        Ok(settings)
    }

    /// Apply a partial update and return the resulting settings
    pub async fn update(&self, input: UpdateSettingsInput) -> Result<SiteSettings, SettingsServiceError> {
        let mut settings = self.get_site_settings().await?;

        if let Some(name) = input.site_name {
            if name.trim().is_empty() {
                return Err(SettingsServiceError::ValidationError(
                    "Site name cannot be empty".to_string(),
                ));
            }
            settings.site_name = name.trim().to_string();
        }
        if let Some(url) = input.site_url {
            let url = url.trim().trim_end_matches('/');
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(SettingsServiceError::ValidationError(
                    "Site URL must start with http:// or https://".to_string(),
                ));
            }
            settings.site_url = url.to_string();
        }
        if let Some(per_page) = input.posts_per_page {
            if !(1..=100).contains(&per_page) {
                return Err(SettingsServiceError::ValidationError(
                    "Posts per page must be between 1 and 100".to_string(),
                ));
            }
            settings.posts_per_page = per_page;
        }
        if let Some(description) = input.site_description {
            settings.site_description = description;
        }
        if let Some(logo) = input.site_logo {
            settings.site_logo = logo;
        }
        if let Some(language) = input.language {
            settings.language = language;
        }
        if let Some(handle) = input.twitter_handle {
            settings.twitter_handle = handle.trim().trim_start_matches('@').to_string();
        }
        if let Some(image) = input.default_og_image {
            settings.default_og_image = image;
        }

        self.repo.set_many(&settings.to_map()).await?;
        let _ = self.cache.delete(CACHE_KEY_SITE_SETTINGS).await;
        // The feed channel embeds the site name, description and URL
        let _ = self.cache.delete_pattern("post:feed:*").await;

        tracing::info!("Site settings updated");
        Ok(settings)
    }

    /// Single raw setting value
    pub async fn get(&self, key: &str) -> Result<Option<String>, SettingsServiceError> {
        Ok(self.repo.get(key).await?)
    }
}
