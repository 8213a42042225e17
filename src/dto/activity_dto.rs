use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::models::activity_log::{ActivityLogEntry, ActivityType, TargetType};
use crate::services::activity_service::ActivityList;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ActivityListQuery {
    pub action: Option<ActivityType>,
    pub user_id: Option<Uuid>,
    pub cv_id: Option<i64>,
    pub since: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityListResponse {
    pub logs: Vec<ActivityLogEntry>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl From<ActivityList> for ActivityListResponse {
    fn from(value: ActivityList) -> Self {
        Self {
            logs: value.items,
            total: value.total,
            page: value.page,
            per_page: value.per_page,
            total_pages: value.total_pages,
        }
    }
}

/// Event observed by the client, e.g. a CV opened in the viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportActivityPayload {
    pub action: ActivityType,
    #[serde(default)]
    pub description: String,
    pub cv_id: Option<i64>,
    pub target_type: Option<TargetType>,
    pub target_id: Option<String>,
    pub metadata: Option<JsonValue>,
}
