use printpdf::*;
use std::fs::File;

use crate::error::Result;
use crate::models::cv::{Cv, UserRef};
use crate::utils::text::{strip_html, underscore_whitespace, wrap_text};

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const LEFT: Mm = Mm(20.0);
const TOP: Mm = Mm(277.0);
const BOTTOM: Mm = Mm(25.0);
const WRAP_CHARS: usize = 90;

/// `CV_Maria_Santos.pdf`
pub fn pdf_file_name(full_name: &str) -> String {
    format!("CV_{}.pdf", underscore_whitespace(full_name))
}

struct Writer {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    y: Mm,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl Writer {
    fn ensure_room(&mut self, needed: Mm) {
        if self.y - needed < BOTTOM {
            let (page, layer) = self.doc.add_page(PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = TOP;
        }
    }

    fn text(&mut self, text: &str, size: f32, bold: bool, advance: Mm) {
        self.ensure_room(advance);
        self.y -= advance;
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, size, LEFT, self.y, font);
    }

    fn paragraph(&mut self, text: &str) {
        for line in wrap_text(text, WRAP_CHARS) {
            self.text(&line, 11.0, false, Mm(5.5));
        }
    }

    fn section(&mut self, title: &str, body: Option<&str>) {
        let Some(body) = body.map(str::trim).filter(|b| !b.is_empty()) else {
            return;
        };
        self.text(title, 14.0, true, Mm(12.0));
        self.y -= Mm(2.0);
        self.paragraph(body);
    }

    fn field(&mut self, label: &str, value: &str) {
        self.text(&format!("{}: {}", label, value), 11.0, false, Mm(6.0));
    }
}

#[derive(Clone, Debug, Default)]
pub struct PdfService {
    font_path: Option<String>,
}

impl PdfService {
    pub fn new(font_path: Option<String>) -> Self {
        Self { font_path }
    }

    /// Renders the CV as an A4 document.
    pub fn render(&self, cv: &Cv, created_by: Option<&UserRef>) -> Result<Vec<u8>> {
        let (doc, page1, layer1) =
            PdfDocument::new(format!("CV - {}", cv.full_name), PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
        let layer = doc.get_page(page1).get_layer(layer1);

        // A TrueType font is needed for non-Latin names; the builtin fonts only cover WinAnsi.
        let (regular, bold) = match &self.font_path {
            Some(path) => {
                let font = doc.add_external_font(File::open(path)?)?;
                (font.clone(), font)
            }
            None => (
                doc.add_builtin_font(BuiltinFont::Helvetica)?,
                doc.add_builtin_font(BuiltinFont::HelveticaBold)?,
            ),
        };

        let mut w = Writer {
            doc,
            layer,
            y: TOP,
            regular,
            bold,
        };

        w.text(&cv.full_name, 22.0, true, Mm(0.0));
        if self.font_path.is_some() {
            if let Some(arabic) = cv.full_name_arabic.as_deref().filter(|s| !s.is_empty()) {
                w.text(arabic, 14.0, false, Mm(8.0));
            }
        }
        if let Some(position) = cv.position.as_deref().filter(|s| !s.is_empty()) {
            w.text(position, 14.0, false, Mm(8.0));
        }

        let mut contact = Vec::new();
        if let Some(email) = cv.email.as_deref().filter(|s| !s.is_empty()) {
            contact.push(email.to_string());
        }
        if let Some(phone) = cv.phone.as_deref().filter(|s| !s.is_empty()) {
            contact.push(phone.to_string());
        }
        if let Some(exp) = cv.experience.as_deref().filter(|s| !s.is_empty()) {
            contact.push(format!("{} years of experience", exp));
        }
        if !contact.is_empty() {
            w.text(&contact.join("  |  "), 11.0, false, Mm(8.0));
        }

        let details = cv.content.as_deref().map(strip_html);
        w.section("Professional Summary", cv.summary.as_deref());
        w.section("Education", cv.education.as_deref());
        w.section("Skills", cv.skills.as_deref());
        w.section("Details", details.as_deref());
        w.section("Notes", cv.notes.as_deref());

        w.text("Additional Information", 14.0, true, Mm(14.0));
        w.y -= Mm(2.0);
        w.field("Status", cv.status.label());
        w.field("Priority", cv.priority.as_str());
        if let Some(code) = cv.reference_code.as_deref().filter(|s| !s.is_empty()) {
            w.field("Reference", code);
        }
        if let Some(nationality) = cv.nationality.as_deref().filter(|s| !s.is_empty()) {
            w.field("Nationality", nationality);
        }
        if let Some(age) = cv.age {
            w.field("Age", &age.to_string());
        }
        w.field("Created", &cv.created_at.format("%d.%m.%Y").to_string());
        if let Some(user) = created_by {
            w.field("Created by", &user.name);
        }
        if cv.updated_at != cv.created_at {
            w.field("Last updated", &cv.updated_at.format("%d.%m.%Y").to_string());
        }

        w.text(
            &format!("Exported {}", chrono::Utc::now().format("%d.%m.%Y %H:%M UTC")),
            9.0,
            false,
            Mm(14.0),
        );

        let bytes = w.doc.save_to_bytes()?;
        Ok(bytes)
    }
}
