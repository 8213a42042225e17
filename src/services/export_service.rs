use crate::error::Result;
use crate::models::cv::{Cv, CvStatus};
use rust_xlsxwriter::*;

pub struct ExportService;

fn status_color(status: CvStatus) -> Color {
    match status {
        CvStatus::New => Color::RGB(0x3B82F6),      // Blue
        CvStatus::Booked => Color::RGB(0xF59E0B),   // Amber
        CvStatus::Hired => Color::RGB(0x10B981),    // Emerald
        CvStatus::Rejected => Color::RGB(0xEF4444), // Red
        CvStatus::Returned => Color::RGB(0x8B5CF6), // Violet
        CvStatus::Archived => Color::RGB(0x64748B), // Slate
    }
}

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or("—")
}

impl ExportService {
    /// Generate a styled XLSX workbook from a list of CVs.
    pub fn generate_cvs_xlsx(cvs: &[Cv]) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("CVs")?;

        // ── Color palette ──
        let primary_color = Color::RGB(0x1E293B); // Slate 800
        let header_bg = Color::RGB(0x0F172A); // Slate 900
        let header_text = Color::White;
        let alt_row_1 = Color::RGB(0xF8FAFC); // Slate 50
        let alt_row_2 = Color::White;
        let border_color = Color::RGB(0xE2E8F0); // Slate 200

        let columns = [
            ("#", 8.0),
            ("Full Name", 30.0),
            ("Arabic Name", 28.0),
            ("Reference", 16.0),
            ("Position", 22.0),
            ("Nationality", 18.0),
            ("Age", 8.0),
            ("Phone", 18.0),
            ("Email", 28.0),
            ("Status", 14.0),
            ("Priority", 12.0),
            ("Source", 16.0),
            ("Contract Date", 16.0),
            ("Created", 18.0),
            ("Updated", 18.0),
        ];
        let last_col = (columns.len() - 1) as u16;

        for (i, (_, width)) in columns.iter().enumerate() {
            worksheet.set_column_width(i as u16, *width)?;
        }

        // ── Title row ──
        let title_format = Format::new()
            .set_font_size(16)
            .set_bold()
            .set_font_color(header_text)
            .set_background_color(primary_color)
            .set_align(FormatAlign::CenterAcross)
            .set_align(FormatAlign::VerticalCenter);

        worksheet.set_row_height(0, 40)?;
        worksheet.merge_range(0, 0, 0, last_col, "CV Report", &title_format)?;

        // ── Subtitle row ──
        let subtitle_format = Format::new()
            .set_font_size(10)
            .set_italic()
            .set_font_color(Color::RGB(0x94A3B8))
            .set_background_color(primary_color)
            .set_align(FormatAlign::CenterAcross)
            .set_align(FormatAlign::VerticalCenter);

        worksheet.set_row_height(1, 22)?;
        let now = chrono::Utc::now().format("%d.%m.%Y %H:%M UTC").to_string();
        let subtitle_text = format!("Exported: {}  •  Total CVs: {}", now, cvs.len());
        worksheet.merge_range(1, 0, 1, last_col, &subtitle_text, &subtitle_format)?;

        // ── Header row ──
        let header_format = Format::new()
            .set_bold()
            .set_font_size(10)
            .set_font_color(header_text)
            .set_background_color(header_bg)
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_text_wrap()
            .set_border(FormatBorder::Thin)
            .set_border_color(border_color);

        let header_row = 2;
        worksheet.set_row_height(header_row, 30)?;
        for (i, (name, _)) in columns.iter().enumerate() {
            worksheet.write_string_with_format(header_row, i as u16, *name, &header_format)?;
        }

        // ── Data rows ──
        let data_start_row = 3;
        for (idx, cv) in cvs.iter().enumerate() {
            let row = data_start_row + idx as u32;
            let bg = if idx % 2 == 0 { alt_row_1 } else { alt_row_2 };

            let base_fmt = Format::new()
                .set_font_size(10)
                .set_background_color(bg)
                .set_align(FormatAlign::VerticalCenter)
                .set_border(FormatBorder::Thin)
                .set_border_color(border_color);
            let center_fmt = base_fmt.clone().set_align(FormatAlign::Center);
            let name_fmt = base_fmt.clone().set_bold();

            worksheet.set_row_height(row, 22)?;
            worksheet.write_number_with_format(row, 0, (idx + 1) as f64, &center_fmt)?;
            worksheet.write_string_with_format(row, 1, &cv.full_name, &name_fmt)?;
            worksheet.write_string_with_format(row, 2, or_dash(cv.full_name_arabic.as_deref()), &base_fmt)?;
            worksheet.write_string_with_format(row, 3, or_dash(cv.reference_code.as_deref()), &center_fmt)?;
            worksheet.write_string_with_format(row, 4, or_dash(cv.position.as_deref()), &base_fmt)?;
            worksheet.write_string_with_format(row, 5, or_dash(cv.nationality.as_deref()), &base_fmt)?;
            match cv.age {
                Some(age) => worksheet.write_number_with_format(row, 6, age as f64, &center_fmt)?,
                None => worksheet.write_string_with_format(row, 6, "—", &center_fmt)?,
            };
            worksheet.write_string_with_format(row, 7, or_dash(cv.phone.as_deref()), &base_fmt)?;
            worksheet.write_string_with_format(row, 8, or_dash(cv.email.as_deref()), &base_fmt)?;

            // Status (colored)
            let status_fmt = Format::new()
                .set_font_size(10)
                .set_bold()
                .set_font_color(Color::White)
                .set_background_color(status_color(cv.status))
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter)
                .set_border(FormatBorder::Thin)
                .set_border_color(border_color);
            worksheet.write_string_with_format(row, 9, cv.status.label(), &status_fmt)?;

            worksheet.write_string_with_format(row, 10, cv.priority.as_str(), &center_fmt)?;
            worksheet.write_string_with_format(row, 11, or_dash(cv.source.as_deref()), &base_fmt)?;

            let contract_str = cv
                .contract_date
                .map(|d| d.format("%d.%m.%Y").to_string())
                .unwrap_or_else(|| "—".to_string());
            worksheet.write_string_with_format(row, 12, &contract_str, &center_fmt)?;
            worksheet.write_string_with_format(
                row,
                13,
                &cv.created_at.format("%d.%m.%Y %H:%M").to_string(),
                &center_fmt,
            )?;
            worksheet.write_string_with_format(
                row,
                14,
                &cv.updated_at.format("%d.%m.%Y %H:%M").to_string(),
                &center_fmt,
            )?;
        }

        // ── Summary row ──
        let total_row = data_start_row + cvs.len() as u32 + 1;
        let summary_fmt = Format::new()
            .set_bold()
            .set_font_size(10)
            .set_font_color(primary_color)
            .set_background_color(Color::RGB(0xE0E7FF)) // Indigo 100
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_border(FormatBorder::Thin)
            .set_border_color(border_color);

        worksheet.set_row_height(total_row, 26)?;
        worksheet.merge_range(total_row, 0, total_row, 1, &format!("Total: {} CVs", cvs.len()), &summary_fmt)?;
        worksheet.merge_range(total_row, 2, total_row, last_col, &status_summary(cvs), &summary_fmt)?;

        // Freeze panes (header stays visible while scrolling)
        worksheet.set_freeze_panes(3, 0)?;

        worksheet.autofilter(2, 0, (data_start_row + cvs.len() as u32).saturating_sub(1).max(2), last_col)?;

        let buffer = workbook.save_to_buffer()?;
        Ok(buffer)
    }
}

/// `New: 2 | Booked: 0 | ...` in status order.
pub fn status_summary(cvs: &[Cv]) -> String {
    CvStatus::ALL
        .iter()
        .map(|st| {
            let count = cvs.iter().filter(|c| c.status == *st).count();
            format!("{}: {}", st.label(), count)
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

/// `CVs_2026-10-18.xlsx`
pub fn xlsx_file_name(now: chrono::DateTime<chrono::Utc>) -> String {
    format!("CVs_{}.xlsx", now.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::cv::fixtures::sample_cv;
    use calamine::{open_workbook_auto_from_rs, Data, Reader};
    use chrono::TimeZone;
    use std::io::Cursor;

    #[test]
    fn workbook_has_title_header_and_rows() {
        let mut hired = sample_cv();
        hired.id = 2;
        hired.full_name = "Ana Reyes".into();
        hired.status = CvStatus::Hired;

        let bytes = ExportService::generate_cvs_xlsx(&[sample_cv(), hired]).unwrap();
        let mut book = open_workbook_auto_from_rs(Cursor::new(bytes)).unwrap();
        let range = book.worksheet_range("CVs").unwrap();

        assert_eq!(range.get_value((0, 0)), Some(&Data::String("CV Report".into())));
        assert_eq!(range.get_value((2, 1)), Some(&Data::String("Full Name".into())));
        assert_eq!(range.get_value((3, 1)), Some(&Data::String("Maria Santos".into())));
        assert_eq!(range.get_value((4, 9)), Some(&Data::String("Hired".into())));
    }

    #[test]
    fn empty_export_still_builds() {
        let bytes = ExportService::generate_cvs_xlsx(&[]).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn summary_counts_every_status() {
        let summary = status_summary(&[sample_cv()]);
        assert!(summary.starts_with("New: 1 | Booked: 0"));
        assert!(summary.ends_with("Archived: 0"));
    }

    #[test]
    fn file_name_carries_the_date() {
        let at = chrono::Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap();
        assert_eq!(xlsx_file_name(at), "CVs_2026-03-09.xlsx");
    }
}
