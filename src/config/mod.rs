//! Configuration management
//!
//! Configuration is loaded from `config.yml` and then overridden by
//! `QUILLPOST_*` environment variables. Missing values fall back to defaults,
//! so an empty or absent file yields a runnable development setup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    /// Local upload directory settings
    #[serde(default)]
    pub upload: UploadConfig,
    /// S3-compatible object storage used by the upload helper
    #[serde(default)]
    pub storage: StorageConfig,
    /// Bootstrap administrator account
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (the admin dashboard / blog front end)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path, `sqlite:` URL or `:memory:`
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_database_url() -> String {
    "data/quillpost.db".to_string()
}

fn default_max_connections() -> u32 {
    20
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache TTL in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
    /// Maximum number of cached entries
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl(),
            max_capacity: default_max_capacity(),
        }
    }
}

fn default_ttl() -> u64 {
    3600
}

fn default_max_capacity() -> u64 {
    10_000
}

/// Local upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Directory where uploaded media is written
    #[serde(default = "default_upload_path")]
    pub path: PathBuf,
    /// Maximum file size in bytes (default: 10MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Allowed MIME types
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: default_upload_path(),
            max_file_size: default_max_file_size(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_upload_path() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/gif".to_string(),
        "image/webp".to_string(),
        "image/svg+xml".to_string(),
        "application/pdf".to_string(),
    ]
}

impl UploadConfig {
    /// Check if a MIME type is allowed
    pub fn is_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_types.iter().any(|t| t == mime_type)
    }
}

/// S3-compatible object storage configuration (AWS S3, Cloudflare R2, MinIO)
///
/// Every field is optional: when credentials or the bucket are missing the
/// upload helper reports "no URL" and callers keep the local copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Endpoint URL, e.g. `https://<account>.r2.cloudflarestorage.com`
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Signing region (`auto` for R2)
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    #[serde(default)]
    pub bucket: Option<String>,
    /// Public base URL objects are served from
    #[serde(default)]
    pub public_url: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: default_region(),
            access_key_id: None,
            secret_access_key: None,
            bucket: None,
            public_url: None,
        }
    }
}

fn default_region() -> String {
    "auto".to_string()
}

impl StorageConfig {
    /// Endpoint, credentials and bucket are all present and non-empty
    pub fn is_complete(&self) -> bool {
        [
            &self.endpoint,
            &self.access_key_id,
            &self.secret_access_key,
            &self.bucket,
        ]
        .iter()
        .all(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

/// Bootstrap administrator, created on startup when no users exist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "default_admin_username")]
    pub username: String,
    #[serde(default = "default_admin_email")]
    pub email: String,
    /// Plaintext bootstrap password; no account is created when unset
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: default_admin_username(),
            email: default_admin_email(),
            password: None,
        }
    }
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_admin_email() -> String {
    "admin@localhost".to_string()
}

/// Visitor tracking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Accept beacons on `POST /track`
    #[serde(default = "default_tracking_enabled")]
    pub enabled: bool,
    /// Visits older than this many days are purged by the maintenance task
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            enabled: default_tracking_enabled(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_tracking_enabled() -> bool {
    true
}

fn default_retention_days() -> i64 {
    90
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
}

impl Config {
    /// Load configuration from file
    ///
    /// A missing or empty file yields the default configuration.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: format_yaml_error(&e),
        })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Recognised variables:
    /// - `QUILLPOST_SERVER_HOST`, `QUILLPOST_SERVER_PORT`, `QUILLPOST_SERVER_CORS_ORIGIN`
    /// - `QUILLPOST_DATABASE_URL`
    /// - `QUILLPOST_CACHE_TTL_SECONDS`
    /// - `QUILLPOST_UPLOAD_PATH`
    /// - `QUILLPOST_STORAGE_ENDPOINT`, `QUILLPOST_STORAGE_REGION`,
    ///   `QUILLPOST_STORAGE_ACCESS_KEY_ID`, `QUILLPOST_STORAGE_SECRET_ACCESS_KEY`,
    ///   `QUILLPOST_STORAGE_BUCKET`, `QUILLPOST_STORAGE_PUBLIC_URL`
    /// - `QUILLPOST_ADMIN_USERNAME`, `QUILLPOST_ADMIN_EMAIL`, `QUILLPOST_ADMIN_PASSWORD`
    /// - `QUILLPOST_TRACKING_ENABLED`
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("QUILLPOST_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parsed::<u16>("QUILLPOST_SERVER_PORT") {
            self.server.port = port;
        }
        if let Ok(cors_origin) = std::env::var("QUILLPOST_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(url) = std::env::var("QUILLPOST_DATABASE_URL") {
            self.database.url = url;
        }

        if let Some(ttl) = env_parsed::<u64>("QUILLPOST_CACHE_TTL_SECONDS") {
            self.cache.ttl_seconds = ttl;
        }

        if let Ok(path) = std::env::var("QUILLPOST_UPLOAD_PATH") {
            self.upload.path = PathBuf::from(path);
        }

        // Object storage
        env_optional("QUILLPOST_STORAGE_ENDPOINT", &mut self.storage.endpoint);
        env_optional("QUILLPOST_STORAGE_ACCESS_KEY_ID", &mut self.storage.access_key_id);
        env_optional(
            "QUILLPOST_STORAGE_SECRET_ACCESS_KEY",
            &mut self.storage.secret_access_key,
        );
        env_optional("QUILLPOST_STORAGE_BUCKET", &mut self.storage.bucket);
        env_optional("QUILLPOST_STORAGE_PUBLIC_URL", &mut self.storage.public_url);
        if let Ok(region) = std::env::var("QUILLPOST_STORAGE_REGION") {
            self.storage.region = region;
        }

        if let Ok(username) = std::env::var("QUILLPOST_ADMIN_USERNAME") {
            self.admin.username = username;
        }
        if let Ok(email) = std::env::var("QUILLPOST_ADMIN_EMAIL") {
            self.admin.email = email;
        }
        env_optional("QUILLPOST_ADMIN_PASSWORD", &mut self.admin.password);

        if let Some(enabled) = env_parsed::<bool>("QUILLPOST_TRACKING_ENABLED") {
            self.tracking.enabled = enabled;
        }
    }
}

/// Parse an environment variable, ignoring invalid values
fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Override an optional setting; an empty variable clears it
fn env_optional(key: &str, target: &mut Option<String>) {
    if let Ok(value) = std::env::var(key) {
        *target = if value.trim().is_empty() { None } else { Some(value) };
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Environment-mutating tests share this lock.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        super::CONFIG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner())
    }

    const STORAGE_VARS: &[&str] = &[
        "QUILLPOST_STORAGE_ENDPOINT",
        "QUILLPOST_STORAGE_ACCESS_KEY_ID",
        "QUILLPOST_STORAGE_SECRET_ACCESS_KEY",
        "QUILLPOST_STORAGE_BUCKET",
        "QUILLPOST_STORAGE_PUBLIC_URL",
        "QUILLPOST_STORAGE_REGION",
    ];

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = std::path::Path::new("nonexistent_quillpost_config.yml");
        let config = Config::load(path).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.url, "data/quillpost.db");
        assert_eq!(config.cache.ttl_seconds, 3600);
        assert_eq!(config.upload.path, PathBuf::from("uploads"));
        assert_eq!(config.storage.region, "auto");
        assert!(config.storage.bucket.is_none());
        assert!(config.tracking.enabled);
    }

    #[test]
    fn test_load_empty_file_returns_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "   \n").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 3000\nstorage:\n  bucket: media\n").unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.storage.bucket.as_deref(), Some("media"));
        assert_eq!(config.storage.region, "auto");
    }

    #[test]
    fn test_storage_region_defaults_without_storage_section() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 9000\n").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.storage.region, "auto");
        assert_eq!(StorageConfig::default().region, "auto");
    }

    #[test]
    fn test_load_invalid_yaml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: not_a_number\n").unwrap();

        let err = Config::load(file.path()).unwrap_err().to_string();
        assert!(err.contains("parse"));
    }

    #[test]
    fn test_storage_is_complete() {
        let mut storage = StorageConfig {
            endpoint: Some("https://s3.example.com".to_string()),
            region: "auto".to_string(),
            access_key_id: Some("key".to_string()),
            secret_access_key: Some("secret".to_string()),
            bucket: Some("media".to_string()),
            public_url: None,
        };
        assert!(storage.is_complete());

        storage.bucket = Some("  ".to_string());
        assert!(!storage.is_complete());

        storage.bucket = None;
        assert!(!storage.is_complete());
    }

    #[test]
    fn test_env_override_storage() {
        let _guard = lock_env();
        for var in STORAGE_VARS {
            std::env::remove_var(var);
        }

        std::env::set_var("QUILLPOST_STORAGE_ENDPOINT", "https://r2.example.com");
        std::env::set_var("QUILLPOST_STORAGE_BUCKET", "blog-media");
        std::env::set_var("QUILLPOST_STORAGE_PUBLIC_URL", "https://cdn.example.com");

        let config = Config::load_with_env(std::path::Path::new("nonexistent.yml")).unwrap();

        assert_eq!(config.storage.endpoint.as_deref(), Some("https://r2.example.com"));
        assert_eq!(config.storage.bucket.as_deref(), Some("blog-media"));
        assert_eq!(config.storage.public_url.as_deref(), Some("https://cdn.example.com"));
        assert!(config.storage.access_key_id.is_none());

        for var in STORAGE_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_env_override_empty_clears_optional() {
        let _guard = lock_env();
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "storage:\n  bucket: media\n").unwrap();

        std::env::set_var("QUILLPOST_STORAGE_BUCKET", "");
        let config = Config::load_with_env(file.path()).unwrap();
        assert!(config.storage.bucket.is_none());

        std::env::remove_var("QUILLPOST_STORAGE_BUCKET");
    }

    #[test]
    fn test_env_override_invalid_port_ignored() {
        let _guard = lock_env();
        std::env::set_var("QUILLPOST_SERVER_PORT", "not-a-port");

        let config = Config::load_with_env(std::path::Path::new("nonexistent.yml")).unwrap();
        assert_eq!(config.server.port, 8080);

        std::env::remove_var("QUILLPOST_SERVER_PORT");
    }
}
