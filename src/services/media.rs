//! Media service
//!
//! Uploaded files are always written to the local upload directory first.
//! The object-storage helper is then asked for a public URL; when it has
//! none the file is served from `/uploads/<file>`.

use anyhow::Context;
use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::db::repositories::MediaRepository;
use crate::models::{ListParams, Media, MediaLocation, NewMedia, PagedResult};
use crate::services::storage::UploadHelper;

/// URL prefix the local upload directory is served under
pub const LOCAL_UPLOAD_PREFIX: &str = "/uploads";

#[derive(Debug, thiserror::Error)]
pub enum MediaServiceError {
    #[error("Media not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct MediaService {
    repo: Arc<dyn MediaRepository>,
    config: UploadConfig,
    uploader: Arc<UploadHelper>,
}

impl MediaService {
    pub fn new(repo: Arc<dyn MediaRepository>, config: UploadConfig, uploader: Arc<UploadHelper>) -> Self {
        Self {
            repo,
            config,
            uploader,
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.config.path
    }

    /// Largest accepted file in bytes
    pub fn max_file_size(&self) -> u64 {
        self.config.max_file_size
    }

    /// Store an uploaded file and record it.
    ///
    /// # Errors
    ///
    /// - `ValidationError` for an empty file, a disallowed type or an oversized file
    /// - `InternalError` when the local copy cannot be written
    pub async fn upload(
        &self,
        original_name: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<Media, MediaServiceError> {
        if data.is_empty() {
            return Err(MediaServiceError::ValidationError("File is empty".to_string()));
        }
        if !self.config.is_type_allowed(content_type) {
            return Err(MediaServiceError::ValidationError(format!(
                "Invalid file type: {}. Allowed types: {}",
                content_type,
                self.config.allowed_types.join(", ")
            )));
        }
        if data.len() as u64 > self.config.max_file_size {
            return Err(MediaServiceError::ValidationError(format!(
                "File too large. Maximum size: {} bytes ({} MB)",
                self.config.max_file_size,
                self.config.max_file_size / 1024 / 1024
            )));
        }

        tokio::fs::create_dir_all(&self.config.path)
            .await
            .with_context(|| format!("Failed to create upload dir {}", self.config.path.display()))?;

        let filename = format!("{}.{}", Uuid::new_v4(), file_extension(content_type));
        let file_path = self.config.path.join(&filename);
        tokio::fs::write(&file_path, &data)
            .await
            .context("Failed to save uploaded file")?;

        let (url, location) = match self.uploader.upload_file(&file_path, &filename, content_type).await {
            Some(url) => (url, MediaLocation::Object),
            None => (local_url(&filename), MediaLocation::Local),
        };

        let created = self
            .repo
            .create(&NewMedia {
                filename,
                original_name: original_name.to_string(),
                url,
                content_type: content_type.to_string(),
                size: data.len() as i64,
                location,
            })
            .await;
        let media = match created {
            Ok(media) => media,
            Err(e) => {
                // No record points at the local copy
                if let Err(rm) = tokio::fs::remove_file(&file_path).await {
                    tracing::warn!(path = %file_path.display(), error = %rm, "Failed to remove orphaned upload");
                }
                return Err(MediaServiceError::InternalError(e.context("Failed to record media")));
            }
        };

        tracing::info!(id = media.id, filename = %media.filename, location = media.location.as_str(), "Media uploaded");
        Ok(media)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Media, MediaServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| MediaServiceError::NotFound(format!("id {}", id)))
    }

    pub async fn list(&self, params: &ListParams) -> Result<PagedResult<Media>, MediaServiceError> {
        let items = self.repo.list(params.offset(), params.limit()).await?;
        let total = self.repo.count().await?;
        Ok(PagedResult::new(items, total, params))
    }

    /// Delete the record and the local copy. Objects already in the bucket are left alone.
    pub async fn delete(&self, id: i64) -> Result<(), MediaServiceError> {
        let media = self.get_by_id(id).await?;
        self.repo.delete(id).await.context("Failed to delete media")?;

        let path = self.config.path.join(&media.filename);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove local media file");
            }
        }

        tracing::info!(id, filename = %media.filename, "Media deleted");
        Ok(())
    }
}

fn local_url(filename: &str) -> String {
    format!("{}/{}", LOCAL_UPLOAD_PREFIX, filename)
}

/// Stored extension, derived from the checked content type only.
/// The client's file name never reaches the served path.
fn file_extension(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "application/pdf" => "pdf",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::db::repositories::SqlxMediaRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::services::storage::ObjectStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ObjectStore for CountingStore {
        async fn put_object(&self, _bucket: &str, _key: &str, _body: Bytes, _content_type: &str) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn storage_config(configured: bool) -> StorageConfig {
        if !configured {
            return StorageConfig::default();
        }
        StorageConfig {
            endpoint: Some("https://s3.example.com".into()),
            region: "auto".into(),
            access_key_id: Some("key".into()),
            secret_access_key: Some("secret".into()),
            bucket: Some("media".into()),
            public_url: Some("https://cdn.example.com/".into()),
        }
    }

    async fn setup_test_service(configured: bool) -> (MediaService, Arc<CountingStore>, TempDir) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let dir = TempDir::new().unwrap();
        let store = Arc::new(CountingStore {
            calls: AtomicUsize::new(0),
        });
        let uploader = UploadHelper::new(store.clone(), &storage_config(configured));
        let config = UploadConfig {
            path: dir.path().join("uploads"),
            max_file_size: 1024,
            ..Default::default()
        };
        let service = MediaService::new(SqlxMediaRepository::boxed(pool), config, Arc::new(uploader));
        (service, store, dir)
    }

    #[tokio::test]
    async fn test_upload_falls_back_to_local_url() {
        let (service, store, _dir) = setup_test_service(false).await;
        let media = service
            .upload("Photo.PNG", "image/png", Bytes::from_static(b"png-bytes"))
            .await
            .unwrap();

        assert_eq!(media.location, MediaLocation::Local);
        assert!(media.filename.ends_with(".png"));
        assert_eq!(media.url, format!("/uploads/{}", media.filename));
        assert!(service.upload_dir().join(&media.filename).exists());
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_upload_uses_object_storage_url() {
        let (service, store, _dir) = setup_test_service(true).await;
        let media = service
            .upload("doc.pdf", "application/pdf", Bytes::from_static(b"%PDF"))
            .await
            .unwrap();

        assert_eq!(media.location, MediaLocation::Object);
        assert_eq!(media.url, format!("https://cdn.example.com/{}", media.filename));
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
        // The local copy is kept either way
        assert!(service.upload_dir().join(&media.filename).exists());
    }

    #[tokio::test]
    async fn test_upload_validation() {
        let (service, _, _dir) = setup_test_service(false).await;

        let wrong_type = service
            .upload("a.exe", "application/x-msdownload", Bytes::from_static(b"MZ"))
            .await;
        assert!(matches!(wrong_type, Err(MediaServiceError::ValidationError(_))));

        let too_big = service
            .upload("big.png", "image/png", Bytes::from(vec![0u8; 2048]))
            .await;
        assert!(matches!(too_big, Err(MediaServiceError::ValidationError(_))));

        let empty = service.upload("e.png", "image/png", Bytes::new()).await;
        assert!(matches!(empty, Err(MediaServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let (service, _, _dir) = setup_test_service(false).await;
        let media = service
            .upload("a.gif", "image/gif", Bytes::from_static(b"GIF89a"))
            .await
            .unwrap();

        let page = service.list(&ListParams::default()).await.unwrap();
        assert_eq!(page.total, 1);

        service.delete(media.id).await.unwrap();
        assert!(!service.upload_dir().join(&media.filename).exists());
        assert!(matches!(
            service.get_by_id(media.id).await,
            Err(MediaServiceError::NotFound(_))
        ));
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("image/jpeg"), "jpg");
        assert_eq!(file_extension("image/webp"), "webp");
        assert_eq!(file_extension("application/pdf"), "pdf");
        assert_eq!(file_extension("text/plain"), "bin");
    }

    #[tokio::test]
    async fn test_upload_ignores_client_extension() {
        let (service, _, _dir) = setup_test_service(false).await;
        let media = service
            .upload("evil.html", "image/png", Bytes::from_static(b"<script>"))
            .await
            .unwrap();

        assert!(media.filename.ends_with(".png"));
        assert!(!media.url.ends_with(".html"));
        assert_eq!(media.original_name, "evil.html");
    }

    struct FailingMediaRepository;

    #[async_trait]
    impl MediaRepository for FailingMediaRepository {
        async fn create(&self, _media: &NewMedia) -> anyhow::Result<Media> {
            anyhow::bail!("database is locked")
        }

        async fn get_by_id(&self, _id: i64) -> anyhow::Result<Option<Media>> {
            Ok(None)
        }

        async fn list(&self, _offset: i64, _limit: i64) -> anyhow::Result<Vec<Media>> {
            Ok(Vec::new())
        }

        async fn count(&self) -> anyhow::Result<i64> {
            Ok(0)
        }

        async fn delete(&self, _id: i64) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failed_record_removes_local_file() {
        let dir = TempDir::new().unwrap();
        let upload_dir = dir.path().join("uploads");
        let store = Arc::new(CountingStore {
            calls: AtomicUsize::new(0),
        });
        let uploader = UploadHelper::new(store, &storage_config(false));
        let config = UploadConfig {
            path: upload_dir.clone(),
            max_file_size: 1024,
            ..Default::default()
        };
        let service = MediaService::new(Arc::new(FailingMediaRepository), config, Arc::new(uploader));

        let result = service
            .upload("a.png", "image/png", Bytes::from_static(b"png-bytes"))
            .await;
        assert!(matches!(result, Err(MediaServiceError::InternalError(_))));

        let leftovers = std::fs::read_dir(&upload_dir).unwrap().count();
        assert_eq!(leftovers, 0);
    }
}
