//! Conversion of OCR engine output into secondary text detections.
//!
//! The OCR engine reports lines in pixel space with a 0-100 confidence.
//! Fusion works in canvas percent with 0-1 confidence, so each kept line is
//! rescaled against the image dimensions.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Alignment, BoundingBox, FontSize, FontWeight, TextElement, TextStyle};

/// A pixel-space rectangle given by its corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl PixelBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }
}

/// One recognized line of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrLine {
    pub text: String,

    /// Engine confidence, 0-100.
    pub confidence: f64,

    pub bbox: PixelBox,
}

/// OCR output for a single image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrPage {
    /// Image width in pixels.
    pub width: f64,

    /// Image height in pixels.
    pub height: f64,

    #[serde(default)]
    pub lines: Vec<OcrLine>,
}

/// Bucket a line height into a font size category.
pub fn infer_font_size(height_px: f64, image_height: f64) -> FontSize {
    let height_percent = height_px * 100.0 / image_height;

    if height_percent > 8.0 {
        FontSize::Title
    } else if height_percent > 5.0 {
        FontSize::Large
    } else if height_percent > 3.0 {
        FontSize::Medium
    } else {
        FontSize::Small
    }
}

/// Convert OCR lines to text elements in canvas percent.
///
/// Lines at or below `min_line_confidence` (0-100) and blank lines are
/// skipped. Ids are numbered over the kept lines.
pub fn lines_to_elements(page: &OcrPage, min_line_confidence: f64) -> Result<Vec<TextElement>> {
    if !(page.width > 0.0 && page.height > 0.0) {
        return Err(Error::InvalidDimensions(format!(
            "{}x{}",
            page.width, page.height
        )));
    }

    let elements: Vec<TextElement> = page
        .lines
        .iter()
        .filter(|line| line.confidence > min_line_confidence && !line.text.trim().is_empty())
        .enumerate()
        .map(|(index, line)| {
            let b = &line.bbox;
            let bbox = BoundingBox::new(
                b.y0 * 100.0 / page.height,
                b.x0 * 100.0 / page.width,
                (b.x1 - b.x0) * 100.0 / page.width,
                b.height() * 100.0 / page.height,
            );

            let style = TextStyle {
                font_size: infer_font_size(b.height(), page.height),
                font_weight: FontWeight::Normal,
                color: "#000000".to_string(),
                alignment: Alignment::Left,
            };

            TextElement::new(format!("tesseract-{}", index), line.text.trim(), bbox)
                .with_style(style)
                .with_confidence(line.confidence / 100.0)
        })
        .collect();

    log::debug!(
        "Kept {} of {} OCR lines above confidence {}",
        elements.len(),
        page.lines.len(),
        min_line_confidence
    );

    Ok(elements)
}
