//! Visitor tracking
//!
//! The public site posts a beacon per page view. Recording is best effort:
//! the HTTP handler swallows every error from here and still answers 204.

use anyhow::Context;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::config::TrackingConfig;
use crate::db::repositories::VisitRepository;
use crate::models::{Visit, VisitStats};

const MAX_SESSION_ID_LEN: usize = 128;
const MAX_PAGE_URL_LEN: usize = 2048;
const TOP_PAGES_LIMIT: i64 = 10;
const DEFAULT_STATS_DAYS: i64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Beacon payload sent by the front end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackEvent {
    pub session_id: String,
    pub page_url: String,
    /// RFC 3339 string or epoch milliseconds; the receive time when absent
    #[serde(default)]
    pub timestamp: Option<BeaconTimestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BeaconTimestamp {
    EpochMillis(i64),
    Text(String),
}

impl BeaconTimestamp {
    pub fn parse(&self) -> Option<DateTime<Utc>> {
        match self {
            BeaconTimestamp::EpochMillis(ms) => Utc.timestamp_millis_opt(*ms).single(),
            BeaconTimestamp::Text(text) => {
                let text = text.trim();
                DateTime::parse_from_rfc3339(text)
                    .map(|t| t.with_timezone(&Utc))
                    .ok()
                    .or_else(|| text.parse::<i64>().ok().and_then(|ms| Utc.timestamp_millis_opt(ms).single()))
            }
        }
    }
}

pub struct TrackingService {
    repo: Arc<dyn VisitRepository>,
    config: TrackingConfig,
}

impl TrackingService {
    pub fn new(repo: Arc<dyn VisitRepository>, config: TrackingConfig) -> Self {
        Self { repo, config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Validate and persist a page view. `Ok(None)` when tracking is disabled.
    pub async fn record(&self, event: TrackEvent) -> Result<Option<Visit>, TrackingError> {
        if !self.config.enabled {
            return Ok(None);
        }

        let session_id = event.session_id.trim();
        let page_url = event.page_url.trim();
        if session_id.is_empty() || session_id.len() > MAX_SESSION_ID_LEN {
            return Err(TrackingError::ValidationError("Invalid session_id".to_string()));
        }
        if page_url.is_empty() || page_url.len() > MAX_PAGE_URL_LEN {
            return Err(TrackingError::ValidationError("Invalid page_url".to_string()));
        }

        let visited_at = match &event.timestamp {
            Some(ts) => ts.parse().ok_or_else(|| {
                TrackingError::ValidationError("Timestamp must be RFC 3339 or epoch milliseconds".to_string())
            })?,
            None => Utc::now(),
        };

        let visit = self
            .repo
            .record(session_id, page_url, visited_at)
            .await
            .context("Failed to record visit")?;
        Ok(Some(visit))
    }

    /// Aggregates since `since` (default: the last 30 days)
    pub async fn stats(&self, since: Option<DateTime<Utc>>) -> Result<VisitStats, TrackingError> {
        let since = since.unwrap_or_else(|| Utc::now() - Duration::days(DEFAULT_STATS_DAYS));

        Ok(VisitStats {
            since: Some(since),
            total_visits: self.repo.count_since(since).await?,
            unique_sessions: self.repo.unique_sessions_since(since).await?,
            top_pages: self.repo.top_pages_since(since, TOP_PAGES_LIMIT).await?,
        })
    }

    /// Delete visits older than the retention window
    pub async fn purge_expired(&self) -> Result<u64, TrackingError> {
        let cutoff = Utc::now() - Duration::days(self.config.retention_days.max(1));
        let removed = self.repo.purge_before(cutoff).await?;
        if removed > 0 {
            tracing::info!(removed, "Purged old visits");
        }
        Ok(removed)
    }
}

/// Fire-and-forget beacon client
#[derive(Clone)]
pub struct BeaconSender {
    client: reqwest::Client,
    endpoint: String,
}

impl BeaconSender {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Post `event` in the background. Failures are logged at debug level
    /// and never reach the caller; the handle exists only for tests.
    pub fn send(&self, event: TrackEvent) -> JoinHandle<()> {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        tokio::spawn(async move {
            match client.post(&endpoint).json(&event).send().await {
                Ok(response) if !response.status().is_success() => {
                    tracing::debug!(status = %response.status(), "Beacon rejected");
                }
                Ok(_) => {}
                Err(e) => tracing::debug!(error = %e, "Beacon failed"),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxVisitRepository;
    use crate::db::{create_test_pool, migrations};
    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use std::sync::Mutex;

    async fn setup_test_service(enabled: bool) -> TrackingService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        TrackingService::new(
            SqlxVisitRepository::boxed(pool),
            TrackingConfig {
                enabled,
                retention_days: 90,
            },
        )
    }

    fn event(session_id: &str, page_url: &str, timestamp: Option<BeaconTimestamp>) -> TrackEvent {
        TrackEvent {
            session_id: session_id.to_string(),
            page_url: page_url.to_string(),
            timestamp,
        }
    }

    #[test]
    fn test_timestamp_formats() {
        let rfc = BeaconTimestamp::Text("2024-03-01T12:00:00Z".into());
        let millis = BeaconTimestamp::EpochMillis(1_709_294_400_000);
        let millis_text = BeaconTimestamp::Text("1709294400000".into());
        assert_eq!(rfc.parse(), millis.parse());
        assert_eq!(millis.parse(), millis_text.parse());
        assert!(BeaconTimestamp::Text("yesterday".into()).parse().is_none());
    }

    #[test]
    fn test_event_deserializes_both_timestamp_shapes() {
        let a: TrackEvent =
            serde_json::from_str(r#"{"session_id":"s","page_url":"/","timestamp":1700000000000}"#).unwrap();
        assert_eq!(a.timestamp, Some(BeaconTimestamp::EpochMillis(1_700_000_000_000)));

        let b: TrackEvent = serde_json::from_str(r#"{"session_id":"s","page_url":"/"}"#).unwrap();
        assert_eq!(b.timestamp, None);
    }

    #[tokio::test]
    async fn test_record_and_stats() {
        let service = setup_test_service(true).await;
        service.record(event("s1", "/posts/a", None)).await.unwrap();
        service.record(event("s2", "/posts/a", None)).await.unwrap();
        service
            .record(event("s1", "/posts/b", Some(BeaconTimestamp::Text(Utc::now().to_rfc3339()))))
            .await
            .unwrap();

        let stats = service.stats(None).await.unwrap();
        assert_eq!(stats.total_visits, 3);
        assert_eq!(stats.unique_sessions, 2);
        assert_eq!(stats.top_pages[0].page_url, "/posts/a");
    }

    #[tokio::test]
    async fn test_invalid_events_rejected() {
        let service = setup_test_service(true).await;
        for bad in [
            event("", "/", None),
            event("s", "  ", None),
            event("s", "/", Some(BeaconTimestamp::Text("not a time".into()))),
        ] {
            assert!(matches!(
                service.record(bad).await,
                Err(TrackingError::ValidationError(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_disabled_tracking_records_nothing() {
        let service = setup_test_service(false).await;
        assert!(service.record(event("s", "/", None)).await.unwrap().is_none());
        assert_eq!(service.stats(None).await.unwrap().total_visits, 0);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let service = setup_test_service(true).await;
        let old = (Utc::now() - Duration::days(200)).timestamp_millis();
        service
            .record(event("s", "/", Some(BeaconTimestamp::EpochMillis(old))))
            .await
            .unwrap();
        service.record(event("s", "/", None)).await.unwrap();

        assert_eq!(service.purge_expired().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_beacon_sender_posts_event() {
        let received: Arc<Mutex<Vec<TrackEvent>>> = Arc::default();
        let app = Router::new()
            .route(
                "/track",
                post(
                    |State(received): State<Arc<Mutex<Vec<TrackEvent>>>>, Json(event): Json<TrackEvent>| async move {
                        received.lock().unwrap().push(event);
                        StatusCode::NO_CONTENT
                    },
                ),
            )
            .with_state(received.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let sender = BeaconSender::new(reqwest::Client::new(), format!("http://{}/track", addr));
        sender.send(event("s1", "/posts/a", None)).await.unwrap();

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].page_url, "/posts/a");
    }

    #[tokio::test]
    async fn test_beacon_sender_swallows_errors() {
        let sender = BeaconSender::new(reqwest::Client::new(), "http://127.0.0.1:9/track");
        // Completes without panicking even though nothing listens there
        sender.send(event("s1", "/", None)).await.unwrap();
    }
}
