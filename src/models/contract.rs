use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::cv::{CvStatus, Priority};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Contract {
    pub id: i64,
    pub cv_id: i64,
    pub identity_number: String,
    pub contract_date: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A hired CV together with its most recent contract.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HiredCv {
    pub cv_id: i64,
    pub full_name: String,
    pub full_name_arabic: Option<String>,
    pub phone: Option<String>,
    pub nationality: Option<String>,
    pub position: Option<String>,
    pub reference_code: Option<String>,
    pub status: CvStatus,
    pub priority: Priority,
    pub contract_id: Option<i64>,
    pub identity_number: Option<String>,
    pub contract_date: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}
