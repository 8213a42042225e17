use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "activity_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    CvCreated,
    CvUpdated,
    CvDeleted,
    CvViewed,
    CvExported,
    StatusChanged,
    ContractCreated,
    ContractDeleted,
    ExcelImport,
    BulkDelete,
    BulkStatusChange,
    BulkDownload,
    UserLogin,
    UserLogout,
    UserCreated,
    UserUpdated,
    UserDeleted,
    SheetSync,
    SystemActivated,
}

impl ActivityType {
    /// Events a client may report on its own; everything else is written by
    /// the server as a side effect of the operation it describes.
    pub fn is_client_reportable(self) -> bool {
        matches!(self, ActivityType::CvViewed | ActivityType::BulkDownload)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityType::CvCreated => "CV_CREATED",
            ActivityType::CvUpdated => "CV_UPDATED",
            ActivityType::CvDeleted => "CV_DELETED",
            ActivityType::CvViewed => "CV_VIEWED",
            ActivityType::CvExported => "CV_EXPORTED",
            ActivityType::StatusChanged => "STATUS_CHANGED",
            ActivityType::ContractCreated => "CONTRACT_CREATED",
            ActivityType::ContractDeleted => "CONTRACT_DELETED",
            ActivityType::ExcelImport => "EXCEL_IMPORT",
            ActivityType::BulkDelete => "BULK_DELETE",
            ActivityType::BulkStatusChange => "BULK_STATUS_CHANGE",
            ActivityType::BulkDownload => "BULK_DOWNLOAD",
            ActivityType::UserLogin => "USER_LOGIN",
            ActivityType::UserLogout => "USER_LOGOUT",
            ActivityType::UserCreated => "USER_CREATED",
            ActivityType::UserUpdated => "USER_UPDATED",
            ActivityType::UserDeleted => "USER_DELETED",
            ActivityType::SheetSync => "SHEET_SYNC",
            ActivityType::SystemActivated => "SYSTEM_ACTIVATED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetType {
    Cv,
    Contract,
    User,
    System,
}

impl TargetType {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetType::Cv => "CV",
            TargetType::Contract => "CONTRACT",
            TargetType::User => "USER",
            TargetType::System => "SYSTEM",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityLog {
    pub id: i64,
    pub user_id: Option<Uuid>,
    pub cv_id: Option<i64>,
    pub action: ActivityType,
    pub description: String,
    pub target_type: String,
    pub target_id: Option<String>,
    pub metadata: Option<JsonValue>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Activity row joined with the acting user's display fields.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityLogEntry {
    pub id: i64,
    pub user_id: Option<Uuid>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub cv_id: Option<i64>,
    pub action: ActivityType,
    pub description: String,
    pub target_type: String,
    pub target_id: Option<String>,
    pub metadata: Option<JsonValue>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clients_may_only_report_views_and_downloads() {
        assert!(ActivityType::CvViewed.is_client_reportable());
        assert!(ActivityType::BulkDownload.is_client_reportable());
        assert!(!ActivityType::CvDeleted.is_client_reportable());
        assert!(!ActivityType::UserLogin.is_client_reportable());
    }

    #[test]
    fn action_names_match_database_labels() {
        let v = serde_json::to_value(ActivityType::ExcelImport).unwrap();
        assert_eq!(v, "EXCEL_IMPORT");
        let parsed: ActivityType = serde_json::from_value("STATUS_CHANGED".into()).unwrap();
        assert_eq!(parsed, ActivityType::StatusChanged);
        assert_eq!(ActivityType::SystemActivated.as_str(), "SYSTEM_ACTIVATED");
    }
}
