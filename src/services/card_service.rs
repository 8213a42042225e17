use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{imageops::FilterType, DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::cv::Cv;

pub const CARD_WIDTH: u32 = 600;
pub const CARD_HEIGHT: u32 = 800;
const TILE: u32 = 120;
const MARK: i64 = 18;

/// Renders the PNG card shown in the gallery.
#[derive(Clone, Debug)]
pub struct CardService {
    uploads_dir: PathBuf,
}

fn blend(px: &mut Rgba<u8>, color: [u8; 3], alpha: f32) {
    for i in 0..3 {
        let base = px[i] as f32;
        px[i] = (base + (color[i] as f32 - base) * alpha).round() as u8;
    }
}

/// Tiled diamonds over the whole card so a cropped screenshot still carries the mark.
fn watermark(canvas: &mut RgbaImage) {
    let (w, h) = canvas.dimensions();
    for (x, y, px) in canvas.enumerate_pixels_mut() {
        let row = y / TILE;
        let offset = if row % 2 == 0 { 0 } else { TILE / 2 };
        let cx = ((x + offset) % TILE) as i64 - (TILE / 2) as i64;
        let cy = (y % TILE) as i64 - (TILE / 2) as i64;
        if cx.abs() + cy.abs() <= MARK {
            blend(px, [255, 255, 255], 0.28);
        }
        if y >= h.saturating_sub(70) && x < w {
            blend(px, [15, 23, 42], 0.55);
        }
    }
}

fn placeholder() -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(CARD_WIDTH, CARD_HEIGHT, Rgba([226, 232, 240, 255]));
    let (cx, head_cy, head_r) = (CARD_WIDTH as i64 / 2, 300_i64, 90_i64);
    let body_cy = 620_i64;
    for (x, y, px) in canvas.enumerate_pixels_mut() {
        let (dx, dy) = (x as i64 - cx, y as i64 - head_cy);
        let in_head = dx * dx + dy * dy <= head_r * head_r;
        let (bx, by) = (x as i64 - cx, y as i64 - body_cy);
        let in_body = bx * bx * 4 + by * by * 9 <= 200 * 200 * 4 && y as i64 >= 440;
        if in_head || in_body {
            *px = Rgba([148, 163, 184, 255]);
        }
    }
    canvas
}

/// Decodes `data:image/...;base64,...` into raw bytes.
pub fn decode_data_url(value: &str) -> Option<Vec<u8>> {
    let rest = value.strip_prefix("data:")?;
    let (meta, data) = rest.split_once(',')?;
    if !meta.ends_with(";base64") {
        return None;
    }
    STANDARD.decode(data.trim()).ok()
}

impl CardService {
    pub fn new(uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            uploads_dir: uploads_dir.into(),
        }
    }

    /// Only the file name of a stored path is used, so the lookup stays inside the uploads dir.
    fn upload_path(&self, stored: &str) -> Option<PathBuf> {
        let name = Path::new(stored).file_name()?;
        Some(self.uploads_dir.join(name))
    }

    /// Raw photo bytes for a CV, if its image is a data URL or an uploaded file.
    pub fn load_photo(&self, profile_image: Option<&str>) -> Option<Vec<u8>> {
        let value = profile_image.map(str::trim).filter(|v| !v.is_empty())?;
        if value.starts_with("data:") {
            return decode_data_url(value);
        }
        if value.starts_with("http://") || value.starts_with("https://") {
            return None;
        }
        let path = self.upload_path(value)?;
        match std::fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "profile image not readable");
                None
            }
        }
    }

    pub fn render(&self, cv: &Cv) -> Result<Vec<u8>> {
        let photo = self.load_photo(cv.profile_image.as_deref());
        render_card(photo.as_deref(), cv.id)
    }
}

/// Scales the photo to fill the card, or draws a placeholder, then applies the watermark.
pub fn render_card(photo: Option<&[u8]>, cv_id: i64) -> Result<Vec<u8>> {
    let mut canvas = match photo.map(image::load_from_memory) {
        Some(Ok(img)) => img
            .resize_to_fill(CARD_WIDTH, CARD_HEIGHT, FilterType::Triangle)
            .to_rgba8(),
        Some(Err(e)) => {
            tracing::warn!(cv_id, error = %e, "profile image could not be decoded");
            placeholder()
        }
        None => placeholder(),
    };
    watermark(&mut canvas);

    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(canvas).write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_png() -> Vec<u8> {
        let img = RgbaImage::from_pixel(4, 4, Rgba([200, 10, 10, 255]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn placeholder_card_has_fixed_size() {
        let bytes = render_card(None, 1).unwrap();
        let img = image::load_from_memory(&bytes).unwrap();
        assert_eq!((img.width(), img.height()), (CARD_WIDTH, CARD_HEIGHT));
    }

    #[test]
    fn photo_is_scaled_into_the_card() {
        let bytes = render_card(Some(&tiny_png()), 1).unwrap();
        let img = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (CARD_WIDTH, CARD_HEIGHT));
        // Outside the watermark marks and the footer band the photo colour survives.
        let px = img.get_pixel(CARD_WIDTH / 2 + 40, 10);
        assert_eq!(px.0, [200, 10, 10, 255]);
    }

    #[test]
    fn data_urls_decode() {
        let png = tiny_png();
        let url = format!("data:image/png;base64,{}", STANDARD.encode(&png));
        assert_eq!(decode_data_url(&url), Some(png));
        assert!(decode_data_url("data:image/png,raw").is_none());
        assert!(decode_data_url("/uploads/a.png").is_none());
    }

    #[test]
    fn upload_paths_cannot_escape_the_directory() {
        let service = CardService::new("/srv/uploads");
        assert_eq!(
            service.upload_path("../../etc/passwd"),
            Some(PathBuf::from("/srv/uploads/passwd"))
        );
        assert_eq!(
            service.upload_path("/uploads/photo.jpg"),
            Some(PathBuf::from("/srv/uploads/photo.jpg"))
        );
        assert!(service.load_photo(Some("https://cdn.example.com/a.jpg")).is_none());
        assert!(service.load_photo(None).is_none());
    }

    #[test]
    fn undecodable_photo_falls_back_to_placeholder() {
        let bytes = render_card(Some(b"not an image"), 3).unwrap();
        assert!(image::load_from_memory(&bytes).is_ok());
    }
}
