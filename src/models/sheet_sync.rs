use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SheetSyncState {
    pub auto_sync: bool,
    pub interval_seconds: i32,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub last_result: Option<JsonValue>,
    pub updated_at: DateTime<Utc>,
}

impl SheetSyncState {
    /// Whether the background worker should run a sync at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.auto_sync {
            return false;
        }
        match self.last_synced_at {
            None => true,
            Some(last) => (now - last).num_seconds() >= i64::from(self.interval_seconds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn state(auto_sync: bool, last: Option<DateTime<Utc>>) -> SheetSyncState {
        SheetSyncState {
            auto_sync,
            interval_seconds: 60,
            last_synced_at: last,
            last_result: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn disabled_sync_is_never_due() {
        assert!(!state(false, None).is_due(Utc::now()));
    }

    #[test]
    fn due_after_interval_elapsed() {
        let now = Utc::now();
        assert!(state(true, None).is_due(now));
        assert!(!state(true, Some(now - Duration::seconds(30))).is_due(now));
        assert!(state(true, Some(now - Duration::seconds(61))).is_due(now));
    }
}
