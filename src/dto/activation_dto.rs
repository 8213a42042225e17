use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationPayload {
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationStatusResponse {
    pub activated: bool,
    pub attempts_left: u32,
    pub locked_until: Option<DateTime<Utc>>,
}
