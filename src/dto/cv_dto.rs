use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};
use validator::Validate;

use crate::error::{Error, Result};

use crate::models::cv::{Cv, CvStatus, GalleryCv, MaritalStatus, Priority, SkillLevel, UserRef};
use crate::models::cv_version::CvVersion;
use crate::services::cv_service::{CvList, EDITABLE_COLUMNS};

/// Body of `POST /api/cvs` and `PATCH /api/cvs/:id`. Every field is optional;
/// on update an absent field keeps its stored value and a field in `cleared`
/// is set to NULL.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CvPayload {
    #[validate(length(max = 255))]
    pub full_name: Option<String>,
    pub full_name_arabic: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub reference_code: Option<String>,
    pub monthly_salary: Option<String>,
    pub contract_period: Option<String>,
    pub position: Option<String>,
    pub passport_number: Option<String>,
    pub passport_issue_date: Option<String>,
    pub passport_expiry_date: Option<String>,
    pub passport_issue_place: Option<String>,
    pub nationality: Option<String>,
    pub religion: Option<String>,
    pub date_of_birth: Option<String>,
    pub place_of_birth: Option<String>,
    pub living_town: Option<String>,
    pub marital_status: Option<MaritalStatus>,
    #[validate(range(min = 0, max = 30))]
    pub number_of_children: Option<i32>,
    pub weight: Option<String>,
    pub height: Option<String>,
    pub complexion: Option<String>,
    #[validate(range(min = 0, max = 120))]
    pub age: Option<i32>,
    pub english_level: Option<SkillLevel>,
    pub arabic_level: Option<SkillLevel>,
    pub baby_sitting: Option<SkillLevel>,
    pub children_care: Option<SkillLevel>,
    pub tutoring: Option<SkillLevel>,
    pub disabled_care: Option<SkillLevel>,
    pub cleaning: Option<SkillLevel>,
    pub washing: Option<SkillLevel>,
    pub ironing: Option<SkillLevel>,
    pub arabic_cooking: Option<SkillLevel>,
    pub sewing: Option<SkillLevel>,
    pub driving: Option<SkillLevel>,
    pub previous_employment: Option<String>,
    pub profile_image: Option<String>,
    pub experience: Option<String>,
    pub education: Option<String>,
    pub skills: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub notes: Option<String>,
    pub status: Option<CvStatus>,
    pub priority: Option<Priority>,
    #[serde(skip)]
    pub cleared: BTreeSet<String>,
}

/// Columns a PATCH can never null out.
const REQUIRED_COLUMNS: [&str; 3] = ["full_name", "status", "priority"];

fn is_blank(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

impl CvPayload {
    /// Parses a PATCH body. Known keys sent as `null` or a blank string are
    /// collected into `cleared`.
    pub fn from_json(body: JsonValue) -> Result<Self> {
        let JsonValue::Object(mut map) = body else {
            return Err(Error::BadRequest("Request body must be a JSON object".into()));
        };
        let cleared = map
            .iter()
            .filter(|(key, value)| {
                is_blank(value)
                    && EDITABLE_COLUMNS.contains(&key.as_str())
                    && !REQUIRED_COLUMNS.contains(&key.as_str())
            })
            .map(|(key, _)| key.clone())
            .collect();
        for value in map.values_mut() {
            if is_blank(value) {
                *value = JsonValue::Null;
            }
        }
        let mut payload: CvPayload = serde_json::from_value(JsonValue::Object(map))?;
        payload.cleared = cleared;
        Ok(payload.normalized())
    }

    /// Trims the name and drops blank name/email so they count as absent.
    pub fn normalized(mut self) -> Self {
        self.full_name = self
            .full_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        self.email = self
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        self
    }

    /// Names of the fields set or cleared by the payload, for the activity log.
    pub fn present_fields(&self) -> Vec<String> {
        let mut fields: BTreeSet<String> = match serde_json::to_value(self) {
            Ok(JsonValue::Object(map)) => map
                .into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, _)| k)
                .collect(),
            _ => BTreeSet::new(),
        };
        fields.extend(self.cleared.iter().cloned());
        fields.into_iter().collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CvListQuery {
    pub status: Option<CvStatus>,
    pub exclude_status: Option<CvStatus>,
    pub priority: Option<Priority>,
    pub nationality: Option<String>,
    pub marital_status: Option<MaritalStatus>,
    pub skill: Option<String>,
    pub min_age: Option<i32>,
    pub max_age: Option<i32>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvListResponse {
    pub cvs: Vec<Cv>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl From<CvList> for CvListResponse {
    fn from(value: CvList) -> Self {
        Self {
            cvs: value.items,
            total: value.total,
            page: value.page,
            per_page: value.per_page,
            total_pages: value.total_pages,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvResponse {
    pub cv: Cv,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvDetailResponse {
    pub cv: Cv,
    pub created_by: Option<UserRef>,
    pub updated_by: Option<UserRef>,
    pub versions: Vec<CvVersion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvVersionsResponse {
    pub versions: Vec<CvVersion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvStatsResponse {
    pub total: i64,
    pub counts: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkAction {
    Delete,
    Status,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BulkCvRequest {
    #[validate(length(min = 1, max = 1000))]
    pub cv_ids: Vec<i64>,
    pub action: BulkAction,
    pub status: Option<CvStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkCvResponse {
    pub processed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HireCvPayload {
    #[validate(length(min = 1, max = 64))]
    pub identity_number: String,
    pub contract_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExportCvsRequest {
    pub cv_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GalleryQuery {
    pub status: Option<CvStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryResponse {
    pub cvs: Vec<GalleryCv>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_name_and_email_become_absent() {
        let payload = CvPayload {
            full_name: Some("   ".into()),
            email: Some("".into()),
            ..Default::default()
        }
        .normalized();
        assert!(payload.full_name.is_none());
        assert!(payload.email.is_none());
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn malformed_email_fails_validation() {
        let payload = CvPayload {
            full_name: Some("Maria Santos".into()),
            email: Some("not-an-email".into()),
            ..Default::default()
        }
        .normalized();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn present_fields_lists_only_sent_keys() {
        let payload: CvPayload =
            serde_json::from_str(r#"{"phone":"+63 900","status":"BOOKED"}"#).unwrap();
        let mut fields = payload.present_fields();
        fields.sort();
        assert_eq!(fields, vec!["phone".to_string(), "status".to_string()]);
    }

    #[test]
    fn null_and_blank_keys_are_cleared() {
        let payload = CvPayload::from_json(serde_json::json!({
            "email": "",
            "marital_status": null,
            "age": null,
            "full_name": "  ",
            "status": null,
            "unknown": null,
            "phone": "+63 900"
        }))
        .unwrap();
        let cleared: Vec<&str> = payload.cleared.iter().map(String::as_str).collect();
        assert_eq!(cleared, vec!["age", "email", "marital_status"]);
        assert!(payload.email.is_none());
        assert!(payload.full_name.is_none());
        assert_eq!(
            payload.present_fields(),
            vec!["age", "email", "marital_status", "phone"]
        );
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn blank_strings_are_accepted_for_typed_fields() {
        let payload = CvPayload::from_json(serde_json::json!({ "age": "", "driving": " " })).unwrap();
        assert!(payload.cleared.contains("age"));
        assert!(payload.cleared.contains("driving"));
    }

    #[test]
    fn non_object_body_is_rejected() {
        assert!(matches!(
            CvPayload::from_json(serde_json::json!([1, 2])),
            Err(Error::BadRequest(_))
        ));
    }

    #[test]
    fn bulk_action_uses_lowercase_names() {
        let req: BulkCvRequest =
            serde_json::from_str(r#"{"cv_ids":[1,2],"action":"status","status":"ARCHIVED"}"#)
                .unwrap();
        assert_eq!(req.action, BulkAction::Status);
        assert_eq!(req.status, Some(CvStatus::Archived));
    }
}
