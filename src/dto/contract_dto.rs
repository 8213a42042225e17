use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::contract::{Contract, HiredCv};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CreateContractPayload {
    pub cv_id: Option<i64>,
    pub identity_number: Option<String>,
    pub contract_date: Option<DateTime<Utc>>,
}

impl CreateContractPayload {
    /// Returns the CV id and trimmed identity number, or the 400 both are
    /// required for.
    pub fn required_fields(&self) -> Result<(i64, String)> {
        let identity = self
            .identity_number
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        match (self.cv_id, identity) {
            (Some(cv_id), Some(identity)) => Ok((cv_id, identity.to_string())),
            _ => Err(Error::BadRequest(
                "CV ID and Identity Number are required".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ContractListQuery {
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractResponse {
    pub contract: Contract,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HiredListResponse {
    pub contracts: Vec<HiredCv>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_ids_are_required() {
        let missing_identity = CreateContractPayload {
            cv_id: Some(4),
            identity_number: Some("  ".into()),
            contract_date: None,
        };
        assert!(matches!(
            missing_identity.required_fields(),
            Err(Error::BadRequest(msg)) if msg == "CV ID and Identity Number are required"
        ));

        let ok = CreateContractPayload {
            cv_id: Some(4),
            identity_number: Some(" 2231 ".into()),
            contract_date: None,
        };
        assert_eq!(ok.required_fields().unwrap(), (4, "2231".to_string()));
    }
}
