use calamine::{open_workbook_auto_from_rs, Data, Reader};
use sqlx::PgPool;
use std::io::Cursor;
use uuid::Uuid;

use crate::dto::import_dto::{ImportPreviewResponse, ParsedCv};
use crate::error::{Error, Result};
use crate::models::cv::{Cv, Priority};
use crate::services::cv_service::insert_cv;
use crate::utils::validation::is_plausible_email;

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const XLS_MIME: &str = "application/vnd.ms-excel";
pub const CSV_MIME: &str = "text/csv";

const PREVIEW_LIMIT: usize = 10;

/// (Arabic header, English header). The Arabic column wins when both are filled.
const FULL_NAME: (&str, &str) = ("الاسم الكامل", "Full Name");
const ARABIC_NAME: (&str, &str) = ("الاسم بالعربي", "Arabic Name");
const EMAIL: (&str, &str) = ("البريد الإلكتروني", "Email");
const PHONE: (&str, &str) = ("رقم الهاتف", "Phone");
const POSITION: (&str, &str) = ("المنصب", "Position");
const EXPERIENCE: (&str, &str) = ("سنوات الخبرة", "Experience");
const EDUCATION: (&str, &str) = ("المؤهل العلمي", "Education");
const SKILLS: (&str, &str) = ("المهارات", "Skills");
const SUMMARY: (&str, &str) = ("الملخص المهني", "Summary");
const PRIORITY: (&str, &str) = ("الأولوية", "Priority");
const NOTES: (&str, &str) = ("ملاحظات", "Notes");
const REFERENCE_CODE: (&str, &str) = ("الرقم المرجعي", "Reference Code");
const NATIONALITY: (&str, &str) = ("الجنسية", "Nationality");
const AGE: (&str, &str) = ("العمر", "Age");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetKind {
    Xlsx,
    Xls,
    Csv,
}

/// Picks the parser from the upload's content type, falling back to the file
/// extension when the browser sent a generic type.
pub fn detect_kind(content_type: Option<&str>, file_name: &str) -> Option<SpreadsheetKind> {
    let content_type = content_type
        .map(|ct| ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
        .unwrap_or_default();
    match content_type.as_str() {
        XLSX_MIME => return Some(SpreadsheetKind::Xlsx),
        XLS_MIME => return Some(SpreadsheetKind::Xls),
        CSV_MIME => return Some(SpreadsheetKind::Csv),
        "" | "application/octet-stream" => {}
        _ => return None,
    }
    let extension = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    match extension.as_str() {
        "xlsx" => Some(SpreadsheetKind::Xlsx),
        "xls" => Some(SpreadsheetKind::Xls),
        "csv" => Some(SpreadsheetKind::Csv),
        _ => None,
    }
}

/// First sheet of a workbook: a header row and the non-blank data rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    fn from_records(mut records: Vec<Vec<String>>) -> Self {
        if records.is_empty() {
            return Self::default();
        }
        let headers = records
            .remove(0)
            .into_iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let rows = records
            .into_iter()
            .filter(|r| r.iter().any(|c| !c.trim().is_empty()))
            .collect();
        Self { headers, rows }
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn value(&self, row: &[String], (arabic, english): (&str, &str)) -> String {
        let read = |name: &str| {
            self.column(name)
                .and_then(|i| row.get(i))
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };
        let value = read(arabic);
        if value.is_empty() {
            read(english)
        } else {
            value
        }
    }
}

pub fn parse_table(bytes: &[u8], kind: SpreadsheetKind) -> Result<Table> {
    let records = match kind {
        SpreadsheetKind::Csv => read_csv(bytes)?,
        SpreadsheetKind::Xlsx | SpreadsheetKind::Xls => read_workbook(bytes)?,
    };
    Ok(Table::from_records(records))
}

fn read_csv(bytes: &[u8]) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        records.push(record.iter().map(str::to_string).collect());
    }
    Ok(records)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn read_workbook(bytes: &[u8]) -> Result<Vec<Vec<String>>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range?,
        None => return Ok(Vec::new()),
    };
    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

fn optional(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Maps and validates every data row. Row numbers are 1-based over data rows.
pub fn parse_rows(table: &Table) -> Vec<ParsedCv> {
    table
        .rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let number = index + 1;
            let mut errors = Vec::new();

            let full_name = table.value(row, FULL_NAME);
            if full_name.is_empty() {
                errors.push(format!("Row {}: Full name is required", number));
            }

            let email = table.value(row, EMAIL);
            if !email.is_empty() && !is_plausible_email(&email) {
                errors.push(format!("Row {}: Invalid email format", number));
            }

            let age = table
                .value(row, AGE)
                .parse::<f64>()
                .ok()
                .filter(|a| (0.0..=120.0).contains(a))
                .map(|a| a as i32);

            ParsedCv {
                row: number,
                full_name,
                full_name_arabic: optional(table.value(row, ARABIC_NAME)),
                email: optional(email),
                phone: optional(table.value(row, PHONE)),
                position: optional(table.value(row, POSITION)),
                experience: optional(table.value(row, EXPERIENCE)),
                education: optional(table.value(row, EDUCATION)),
                skills: optional(table.value(row, SKILLS)),
                summary: optional(table.value(row, SUMMARY)),
                notes: optional(table.value(row, NOTES)),
                reference_code: optional(table.value(row, REFERENCE_CODE)),
                nationality: optional(table.value(row, NATIONALITY)),
                age,
                priority: optional(table.value(row, PRIORITY)).map(|p| Priority::from_keyword(&p)),
                is_valid: errors.is_empty(),
                errors,
            }
        })
        .collect()
}

pub fn preview(parsed: Vec<ParsedCv>) -> ImportPreviewResponse {
    let total = parsed.len();
    let (valid, invalid): (Vec<ParsedCv>, Vec<ParsedCv>) =
        parsed.into_iter().partition(|cv| cv.is_valid);
    ImportPreviewResponse {
        total,
        valid: valid.len(),
        invalid: invalid.len(),
        message: format!(
            "Found {} valid CVs and {} invalid entries",
            valid.len(),
            invalid.len()
        ),
        valid_cvs: valid.into_iter().take(PREVIEW_LIMIT).collect(),
        invalid_cvs: invalid,
    }
}

#[derive(Clone)]
pub struct ImportService {
    pool: PgPool,
}

impl ImportService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts every valid row in one transaction.
    pub async fn import(&self, parsed: &[ParsedCv], actor: Option<Uuid>) -> Result<Vec<Cv>> {
        let valid: Vec<&ParsedCv> = parsed.iter().filter(|cv| cv.is_valid).collect();
        if valid.is_empty() {
            return Err(Error::BadRequest("No valid CVs to import".into()));
        }

        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(valid.len());
        for cv in valid {
            let inserted = insert_cv(&mut *tx, &cv.to_payload(), "Excel Import", actor).await?;
            created.push(inserted);
        }
        tx.commit().await?;
        Ok(created)
    }
}
