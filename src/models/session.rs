//! Session model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Login session; the id doubles as the bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_is_expired() {
        let now = Utc::now();
        let live = Session {
            id: "a".into(),
            user_id: 1,
            expires_at: now + Duration::hours(1),
            created_at: now,
        };
        let dead = Session {
            expires_at: now - Duration::seconds(1),
            ..live.clone()
        };

        assert!(!live.is_expired());
        assert!(dead.is_expired());
    }
}
