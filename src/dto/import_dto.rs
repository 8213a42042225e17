use serde::{Deserialize, Serialize};

use crate::dto::cv_dto::CvPayload;
use crate::models::cv::{Cv, CvStatus, Priority};

/// One spreadsheet data row after header mapping and validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedCv {
    pub row: usize,
    pub full_name: String,
    pub full_name_arabic: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub experience: Option<String>,
    pub education: Option<String>,
    pub skills: Option<String>,
    pub summary: Option<String>,
    pub notes: Option<String>,
    pub reference_code: Option<String>,
    pub nationality: Option<String>,
    pub age: Option<i32>,
    /// `None` when the priority cell was blank.
    pub priority: Option<Priority>,
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ParsedCv {
    /// Fields to insert for a new CV. Status is always `NEW`; a blank
    /// priority falls back to the column default on insert.
    pub fn to_payload(&self) -> CvPayload {
        CvPayload {
            full_name: Some(self.full_name.clone()),
            full_name_arabic: self.full_name_arabic.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            position: self.position.clone(),
            experience: self.experience.clone(),
            education: self.education.clone(),
            skills: self.skills.clone(),
            summary: self.summary.clone(),
            notes: self.notes.clone(),
            reference_code: self.reference_code.clone(),
            nationality: self.nationality.clone(),
            age: self.age,
            priority: self.priority,
            status: Some(CvStatus::New),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportAction {
    Preview,
    Import,
}

impl std::str::FromStr for ImportAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "preview" => Ok(ImportAction::Preview),
            "import" => Ok(ImportAction::Import),
            _ => Err("Invalid action. Use \"preview\" or \"import\"".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportPreviewResponse {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub valid_cvs: Vec<ParsedCv>,
    pub invalid_cvs: Vec<ParsedCv>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResultResponse {
    pub message: String,
    pub imported: usize,
    pub total: usize,
    pub skipped: usize,
    pub cvs: Vec<Cv>,
}
