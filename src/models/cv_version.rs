use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CvVersion {
    pub id: i64,
    pub cv_id: i64,
    pub content: String,
    pub version: i32,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Next version number for a CV given the current maximum, if any.
pub fn next_version(current_max: Option<i32>) -> i32 {
    current_max.unwrap_or(0) + 1
}

/// A version snapshot is taken only when the incoming content is non-empty
/// and differs from what is stored.
pub fn needs_snapshot(stored: Option<&str>, incoming: Option<&str>) -> bool {
    match incoming {
        Some(new) if !new.is_empty() => stored != Some(new),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_version_is_one() {
        assert_eq!(next_version(None), 1);
        assert_eq!(next_version(Some(4)), 5);
    }

    #[test]
    fn snapshot_only_on_real_content_change() {
        assert!(needs_snapshot(Some("old"), Some("new")));
        assert!(needs_snapshot(None, Some("first")));
        assert!(!needs_snapshot(Some("same"), Some("same")));
        assert!(!needs_snapshot(Some("old"), Some("")));
        assert!(!needs_snapshot(Some("old"), None));
    }
}
