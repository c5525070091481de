//! Author model
//!
//! Authors are public bylines, separate from admin accounts. Their profile
//! feeds the `Person` JSON-LD block on post pages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub bio: Option<String>,
    /// Avatar image URL
    pub avatar: Option<String>,
    pub job_title: Option<String>,
    pub website: Option<String>,
    /// Profile URLs on other sites (schema.org `sameAs`)
    #[serde(default)]
    pub same_as: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateAuthorInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub same_as: Vec<String>,
}

impl CreateAuthorInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_job_title(mut self, job_title: impl Into<String>) -> Self {
        self.job_title = Some(job_title.into());
        self
    }

    pub fn with_same_as(mut self, same_as: Vec<String>) -> Self {
        self.same_as = same_as;
        self
    }
}

/// Partial author update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAuthorInput {
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub same_as: Option<Vec<String>>,
}
