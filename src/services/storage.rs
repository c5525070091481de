//! Object storage upload helper
//!
//! Uploads media to an S3-compatible bucket (R2, MinIO, AWS) with AWS
//! Signature Version 4. Object storage is optional: every failure path,
//! including missing configuration, resolves to `None` and the caller keeps
//! serving the local copy.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use data_encoding::HEXLOWER;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;

use crate::config::StorageConfig;

type HmacSha256 = Hmac<Sha256>;

const SIGNING_ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SIGNED_HEADERS: &str = "content-type;host;x-amz-content-sha256;x-amz-date";

/// Minimal object store: one put per upload
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(&self, bucket: &str, key: &str, body: Bytes, content_type: &str) -> Result<()>;
}

/// S3-compatible store using path-style requests
pub struct S3ObjectStore {
    client: reqwest::Client,
    endpoint: String,
    region: String,
    access_key_id: String,
    secret_access_key: String,
}

impl S3ObjectStore {
    pub fn new(client: reqwest::Client, config: &StorageConfig) -> Self {
        Self {
            client,
            endpoint: config
                .endpoint
                .as_deref()
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string(),
            region: config.region.clone(),
            access_key_id: config.access_key_id.clone().unwrap_or_default(),
            secret_access_key: config.secret_access_key.clone().unwrap_or_default(),
        }
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        format!("{}{}", self.endpoint, canonical_uri(bucket, key))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, bucket: &str, key: &str, body: Bytes, content_type: &str) -> Result<()> {
        let url = reqwest::Url::parse(&self.object_url(bucket, key)).context("Invalid storage endpoint")?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => bail!("Storage endpoint has no host"),
        };

        let request = SignedPut {
            host: &host,
            uri: &canonical_uri(bucket, key),
            content_type,
            payload_hash: &HEXLOWER.encode(&Sha256::digest(&body)),
            region: &self.region,
            access_key_id: &self.access_key_id,
            secret_access_key: &self.secret_access_key,
            now: Utc::now(),
        };
        let headers = request.headers()?;

        let mut builder = self.client.put(url).body(body);
        for (name, value) in &headers {
            builder = builder.header(*name, value);
        }

        let response = builder.send().await.context("Object upload request failed")?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            bail!("Object upload rejected with {}: {}", status, detail);
        }
        Ok(())
    }
}

/// `/{bucket}/{key}` with each key segment URI-encoded
fn canonical_uri(bucket: &str, key: &str) -> String {
    let encoded_key = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("/{}/{}", urlencoding::encode(bucket), encoded_key)
}

/// Everything needed to sign one PUT request
struct SignedPut<'a> {
    host: &'a str,
    uri: &'a str,
    content_type: &'a str,
    payload_hash: &'a str,
    region: &'a str,
    access_key_id: &'a str,
    secret_access_key: &'a str,
    now: DateTime<Utc>,
}

impl SignedPut<'_> {
    fn amz_date(&self) -> String {
        self.now.format("%Y%m%dT%H%M%SZ").to_string()
    }

    fn scope(&self) -> String {
        format!("{}/{}/s3/aws4_request", self.now.format("%Y%m%d"), self.region)
    }

    fn canonical_request(&self) -> String {
        format!(
            "PUT\n{}\n\ncontent-type:{}\nhost:{}\nx-amz-content-sha256:{}\nx-amz-date:{}\n\n{}\n{}",
            self.uri,
            self.content_type.trim(),
            self.host,
            self.payload_hash,
            self.amz_date(),
            SIGNED_HEADERS,
            self.payload_hash
        )
    }

    fn string_to_sign(&self) -> String {
        let request_hash = HEXLOWER.encode(&Sha256::digest(self.canonical_request().as_bytes()));
        format!(
            "{}\n{}\n{}\n{}",
            SIGNING_ALGORITHM,
            self.amz_date(),
            self.scope(),
            request_hash
        )
    }

    fn authorization(&self) -> Result<String> {
        let date = self.now.format("%Y%m%d").to_string();
        let key = signing_key(self.secret_access_key, &date, self.region, "s3")?;
        let signature = HEXLOWER.encode(&hmac_sha256(&key, self.string_to_sign().as_bytes())?);
        Ok(format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            SIGNING_ALGORITHM,
            self.access_key_id,
            self.scope(),
            SIGNED_HEADERS,
            signature
        ))
    }

    fn headers(&self) -> Result<Vec<(&'static str, String)>> {
        Ok(vec![
            ("authorization", self.authorization()?),
            ("content-type", self.content_type.trim().to_string()),
            ("x-amz-content-sha256", self.payload_hash.to_string()),
            ("x-amz-date", self.amz_date()),
        ])
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| anyhow!("Invalid HMAC key: {}", e))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// SigV4 signing key for one day, region and service
fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Result<Vec<u8>> {
    let k_date = hmac_sha256(format!("AWS4{}", secret).as_bytes(), date.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

/// Uploads local files to object storage and reports their public URL
pub struct UploadHelper {
    store: Arc<dyn ObjectStore>,
    bucket: Option<String>,
    public_url: Option<String>,
}

impl UploadHelper {
    pub fn new(store: Arc<dyn ObjectStore>, config: &StorageConfig) -> Self {
        Self {
            store,
            bucket: config
                .bucket
                .clone()
                .filter(|_| config.is_complete()),
            public_url: config
                .public_url
                .as_deref()
                .map(|url| url.trim().trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),
        }
    }

    /// Helper backed by the S3 store built from the same configuration
    pub fn from_config(config: &StorageConfig, client: reqwest::Client) -> Self {
        Self::new(Arc::new(S3ObjectStore::new(client, config)), config)
    }

    /// Whether uploads can be attempted at all
    pub fn is_configured(&self) -> bool {
        self.bucket.is_some()
    }

    /// Upload `path` as object `filename`.
    ///
    /// Returns the public URL on success. Missing configuration, I/O errors,
    /// service errors and a missing public base URL all yield `None`. There
    /// are no retries.
    pub async fn upload_file(&self, path: &Path, filename: &str, mime: &str) -> Option<String> {
        let bucket = match &self.bucket {
            Some(bucket) => bucket,
            None => {
                tracing::debug!("Object storage not configured, skipping upload");
                return None;
            }
        };

        let body = match tokio::fs::read(path).await {
            Ok(body) => Bytes::from(body),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read file for upload");
                return None;
            }
        };

        if let Err(e) = self.store.put_object(bucket, filename, body, mime).await {
            tracing::warn!(filename, error = %e, "Object storage upload failed");
            return None;
        }

        tracing::info!(filename, bucket = %bucket, "Uploaded to object storage");
        self.public_url
            .as_ref()
            .map(|base| format!("{}/{}", base, filename))
    }
}
