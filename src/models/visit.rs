//! Visitor tracking models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded page view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub id: i64,
    /// Client-generated session identifier
    pub session_id: String,
    pub page_url: String,
    pub visited_at: DateTime<Utc>,
}

/// Aggregated visit counts since a point in time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisitStats {
    pub since: Option<DateTime<Utc>>,
    pub total_visits: i64,
    pub unique_sessions: i64,
    pub top_pages: Vec<PageCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageCount {
    pub page_url: String,
    pub visits: i64,
}
