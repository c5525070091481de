//! Media model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Uploaded file record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub id: i64,
    /// Stored file name (unique)
    pub filename: String,
    /// Name the file was uploaded under
    pub original_name: String,
    /// Public URL, either object storage or `/uploads/<filename>`
    pub url: String,
    pub content_type: String,
    pub size: i64,
    pub location: MediaLocation,
    pub created_at: DateTime<Utc>,
}

/// Where the served copy of a file lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaLocation {
    /// Object storage bucket
    Object,
    /// Local upload directory
    Local,
}

impl MediaLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaLocation::Object => "object",
            MediaLocation::Local => "local",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "object" => MediaLocation::Object,
            _ => MediaLocation::Local,
        }
    }
}

/// Values for a new media row
#[derive(Debug, Clone)]
pub struct NewMedia {
    pub filename: String,
    pub original_name: String,
    pub url: String,
    pub content_type: String,
    pub size: i64,
    pub location: MediaLocation,
}
