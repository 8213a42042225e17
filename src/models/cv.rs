use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "cv_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CvStatus {
    New,
    Booked,
    Hired,
    Rejected,
    Returned,
    Archived,
}

impl CvStatus {
    pub const ALL: [CvStatus; 6] = [
        CvStatus::New,
        CvStatus::Booked,
        CvStatus::Hired,
        CvStatus::Rejected,
        CvStatus::Returned,
        CvStatus::Archived,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CvStatus::New => "NEW",
            CvStatus::Booked => "BOOKED",
            CvStatus::Hired => "HIRED",
            CvStatus::Rejected => "REJECTED",
            CvStatus::Returned => "RETURNED",
            CvStatus::Archived => "ARCHIVED",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CvStatus::New => "New",
            CvStatus::Booked => "Booked",
            CvStatus::Hired => "Hired",
            CvStatus::Rejected => "Rejected",
            CvStatus::Returned => "Returned",
            CvStatus::Archived => "Archived",
        }
    }

    /// Regular transition table. Staying in the same status is always allowed.
    /// Managers may bypass it (see `CvService::update`).
    pub fn can_transition_to(self, next: CvStatus) -> bool {
        use CvStatus::*;
        if self == next {
            return true;
        }
        match self {
            New => matches!(next, Booked | Hired | Rejected | Archived),
            Booked => matches!(next, New | Hired | Rejected | Archived),
            Hired => matches!(next, Returned | Archived),
            Returned => matches!(next, New | Booked | Hired | Archived),
            Rejected => matches!(next, New | Archived),
            Archived => matches!(next, New),
        }
    }
}

impl std::str::FromStr for CvStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CvStatus::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown CV status: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "cv_priority", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
            Priority::Urgent => "URGENT",
        }
    }

    /// Maps a free-text spreadsheet cell (Arabic or English) to a priority.
    /// Unknown or empty text falls back to `Medium`.
    pub fn from_keyword(raw: &str) -> Priority {
        match raw.trim().to_lowercase().as_str() {
            "منخفضة" | "low" => Priority::Low,
            "عالية" | "high" => Priority::High,
            "عاجلة" | "urgent" => Priority::Urgent,
            _ => Priority::Medium,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "skill_level", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkillLevel {
    Yes,
    No,
    Willing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "marital_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaritalStatus {
    Single,
    Married,
    Divorced,
    Widowed,
}

impl MaritalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MaritalStatus::Single => "SINGLE",
            MaritalStatus::Married => "MARRIED",
            MaritalStatus::Divorced => "DIVORCED",
            MaritalStatus::Widowed => "WIDOWED",
        }
    }
}

/// Skill columns that can be used with the `skill` list filter.
pub const SKILL_COLUMNS: [&str; 12] = [
    "english_level",
    "arabic_level",
    "baby_sitting",
    "children_care",
    "tutoring",
    "disabled_care",
    "cleaning",
    "washing",
    "ironing",
    "arabic_cooking",
    "sewing",
    "driving",
];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Cv {
    pub id: i64,
    pub full_name: String,
    pub full_name_arabic: Option<String>,
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
    pub number_of_children: Option<i32>,
    pub weight: Option<String>,
    pub height: Option<String>,
    pub complexion: Option<String>,
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
    pub source: Option<String>,
    pub status: CvStatus,
    pub priority: Priority,
    pub contract_date: Option<DateTime<Utc>>,
    pub created_by_id: Option<Uuid>,
    pub updated_by_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const CV_COLUMNS: &str = "id, full_name, full_name_arabic, email, phone, reference_code, \
    monthly_salary, contract_period, position, passport_number, passport_issue_date, \
    passport_expiry_date, passport_issue_place, nationality, religion, date_of_birth, \
    place_of_birth, living_town, marital_status, number_of_children, weight, height, complexion, \
    age, english_level, arabic_level, baby_sitting, children_care, tutoring, disabled_care, \
    cleaning, washing, ironing, arabic_cooking, sewing, driving, previous_employment, \
    profile_image, experience, education, skills, summary, content, notes, source, status, \
    priority, contract_date, created_by_id, updated_by_id, created_at, updated_at";

/// Display name of the user who created or last touched a CV.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRef {
    pub name: String,
    pub email: String,
}

/// Subset of a CV shown in the public gallery.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GalleryCv {
    pub id: i64,
    pub full_name: String,
    pub full_name_arabic: Option<String>,
    pub nationality: Option<String>,
    pub position: Option<String>,
    pub age: Option<i32>,
    pub profile_image: Option<String>,
    pub phone: Option<String>,
    pub reference_code: Option<String>,
    pub status: CvStatus,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::Utc;

    pub fn sample_cv() -> Cv {
        let now = Utc::now();
        Cv {
            id: 1,
            full_name: "Maria Santos".into(),
            full_name_arabic: None,
            email: Some("maria@agency.com".into()),
            phone: Some("+63 900 000 0000".into()),
            reference_code: Some("REF-1".into()),
            monthly_salary: None,
            contract_period: None,
            position: Some("Housemaid".into()),
            passport_number: None,
            passport_issue_date: None,
            passport_expiry_date: None,
            passport_issue_place: None,
            nationality: Some("Philippines".into()),
            religion: None,
            date_of_birth: None,
            place_of_birth: None,
            living_town: None,
            marital_status: None,
            number_of_children: None,
            weight: None,
            height: None,
            complexion: None,
            age: Some(29),
            english_level: None,
            arabic_level: None,
            baby_sitting: None,
            children_care: None,
            tutoring: None,
            disabled_care: None,
            cleaning: None,
            washing: None,
            ironing: None,
            arabic_cooking: None,
            sewing: None,
            driving: None,
            previous_employment: None,
            profile_image: None,
            experience: Some("4".into()),
            education: Some("High school".into()),
            skills: Some("Cooking, cleaning".into()),
            summary: Some("Experienced caregiver. ".repeat(60)),
            content: Some("<p>Worked in <b>Dubai</b> for two years.</p>".into()),
            notes: None,
            source: Some("Manual".into()),
            status: CvStatus::New,
            priority: Priority::High,
            contract_date: None,
            created_by_id: None,
            updated_by_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archived_cannot_jump_to_booked_without_override() {
        assert!(!CvStatus::Archived.can_transition_to(CvStatus::Booked));
        assert!(CvStatus::Archived.can_transition_to(CvStatus::New));
    }

    #[test]
    fn hired_cv_can_only_be_returned_or_archived() {
        assert!(CvStatus::Hired.can_transition_to(CvStatus::Returned));
        assert!(CvStatus::Hired.can_transition_to(CvStatus::Archived));
        assert!(!CvStatus::Hired.can_transition_to(CvStatus::New));
        assert!(!CvStatus::Hired.can_transition_to(CvStatus::Booked));
    }

    #[test]
    fn returned_cv_can_be_hired_again() {
        assert!(CvStatus::Returned.can_transition_to(CvStatus::Hired));
    }

    #[test]
    fn self_transition_is_a_no_op() {
        for st in CvStatus::ALL {
            assert!(st.can_transition_to(st));
        }
    }

    #[test]
    fn priority_keywords_cover_both_languages() {
        assert_eq!(Priority::from_keyword("عاجلة"), Priority::Urgent);
        assert_eq!(Priority::from_keyword(" High "), Priority::High);
        assert_eq!(Priority::from_keyword("منخفضة"), Priority::Low);
        assert_eq!(Priority::from_keyword(""), Priority::Medium);
        assert_eq!(Priority::from_keyword("whenever"), Priority::Medium);
    }

    #[test]
    fn status_parses_from_wire_names() {
        assert_eq!("booked".parse::<CvStatus>(), Ok(CvStatus::Booked));
        assert!("PENDING".parse::<CvStatus>().is_err());
        assert_eq!(
            serde_json::to_value(CvStatus::Returned).unwrap(),
            serde_json::json!("RETURNED")
        );
    }
}
