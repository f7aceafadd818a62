//! The detection pipeline: filter, deduplicate and optionally fuse.

use crate::config::DetectionSettings;
use crate::confidence::filter_by_confidence;
use crate::dedup::deduplicate_elements;
use crate::error::Result;
use crate::fusion::{count_text_elements, fuse_detections, is_secondary_result_valid, FusionResult};
use crate::geometry::{expand_box, is_valid_box};
use crate::normalize::{parse_detector_response, DetectorResponse};
use crate::ocr::{lines_to_elements, OcrPage};
use crate::types::{BoundingBox, DetectedElement, HasBox, TextElement};

/// Padding used around text when requesting background cleanup.
pub const INPAINT_PADDING: f64 = 1.0;

/// Runs detections through validation, filtering and fusion.
#[derive(Debug, Clone, Default)]
pub struct LayoutAnalyzer {
    settings: DetectionSettings,
}

impl LayoutAnalyzer {
    /// Create an analyzer with the given settings.
    pub fn new(settings: DetectionSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &DetectionSettings {
        &self.settings
    }

    /// Drop invalid and low-confidence detections, then collapse duplicates.
    pub fn analyze(&self, elements: &[DetectedElement]) -> Vec<DetectedElement> {
        let valid: Vec<DetectedElement> = elements
            .iter()
            .filter(|e| is_valid_box(e.bounding_box()))
            .cloned()
            .collect();
        let confident = filter_by_confidence(&valid, self.settings.confidence_threshold);
        let kept = deduplicate_elements(&confident, self.settings.dedup_threshold);

        log::debug!(
            "Analyzed {} detections: {} valid, {} confident, {} after dedup",
            elements.len(),
            valid.len(),
            confident.len(),
            kept.len()
        );

        kept
    }

    /// Parse a raw detector response and run it through [`Self::analyze`].
    pub fn analyze_response(&self, text: &str) -> Result<DetectorResponse> {
        let response = parse_detector_response(text)?;
        let elements = self.analyze(&response.elements);

        Ok(DetectorResponse {
            background_color: response.background_color,
            elements,
        })
    }

    /// Fuse analyzed primary detections with secondary OCR detections.
    ///
    /// Falls back to the primary detections alone when hybrid detection is
    /// off or the secondary output looks unreliable.
    pub fn fuse(&self, primary: Vec<DetectedElement>, secondary: &[TextElement]) -> FusionResult {
        if !self.settings.uses_secondary() {
            return FusionResult::primary_only(primary);
        }

        let secondary: Vec<TextElement> = secondary
            .iter()
            .filter(|e| is_valid_box(&e.bbox))
            .cloned()
            .collect();

        let primary_text_count = count_text_elements(&primary);
        if !is_secondary_result_valid(&secondary, primary_text_count) {
            log::warn!(
                "Ignoring secondary detections: {} boxes against {} primary text elements",
                secondary.len(),
                primary_text_count
            );
            let mut result = FusionResult::primary_only(primary);
            result.stats.secondary_count = secondary.len();
            return result;
        }

        fuse_detections(&primary, &secondary, self.settings.fusion_options())
    }

    /// Convert an OCR page and fuse it with the primary detections.
    pub fn fuse_with_ocr(
        &self,
        primary: Vec<DetectedElement>,
        page: &OcrPage,
    ) -> Result<FusionResult> {
        let secondary = lines_to_elements(page, self.settings.ocr_min_line_confidence)?;
        Ok(self.fuse(primary, &secondary))
    }
}

/// Padded boxes around every text element, for background cleanup requests.
pub fn inpainting_regions(elements: &[DetectedElement], padding: f64) -> Vec<BoundingBox> {
    elements
        .iter()
        .filter(|e| e.is_text())
        .map(|e| expand_box(e.bounding_box(), padding))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::DetectionSource;
    use crate::ocr::{OcrLine, PixelBox};
    use crate::types::VisualElement;

    fn bx(top: f64, left: f64, width: f64, height: f64) -> BoundingBox {
        BoundingBox::new(top, left, width, height)
    }

    fn text(id: &str, b: BoundingBox, conf: f64) -> DetectedElement {
        TextElement::new(id, id, b).with_confidence(conf).into()
    }

    fn hybrid() -> LayoutAnalyzer {
        LayoutAnalyzer::new(DetectionSettings::new().with_hybrid_detection(true))
    }

    #[test]
    fn test_analyze_filters_and_deduplicates() {
        let analyzer = LayoutAnalyzer::default();
        let elements = vec![
            text("ok", bx(10.0, 10.0, 30.0, 10.0), 0.9),
            text("dup", bx(10.0, 10.0, 30.0, 10.0), 0.95),
            text("offcanvas", bx(95.0, 10.0, 30.0, 10.0), 0.9),
            text("unsure", bx(50.0, 50.0, 10.0, 10.0), 0.4),
            VisualElement::new("logo", "Logo", bx(70.0, 70.0, 10.0, 10.0)).into(),
        ];

        let result = analyzer.analyze(&elements);
        let ids: Vec<&str> = result.iter().map(|e| e.id()).collect();

        assert_eq!(ids, vec!["ok", "logo"]);
    }

    #[test]
    fn test_analyze_response() {
        let analyzer = LayoutAnalyzer::default();
        let raw = r#"{"elements": [
            {"type": "TEXT", "content": "A", "box": [10, 10, 30, 10], "confidence": 0.9},
            {"type": "TEXT", "content": "B", "box": [10, 10, 30, 10], "confidence": 0.9},
            {"type": "VISUAL", "box": [50, 50, 20, 20]}
        ]}"#;

        let response = analyzer.analyze_response(raw).unwrap();

        // Missing confidence is clamped to 0.5, below the default threshold.
        assert_eq!(response.elements.len(), 1);
        assert_eq!(response.elements[0].as_text().unwrap().content, "A");
        assert_eq!(response.background_color, "#ffffff");
    }

    #[test]
    fn test_analyze_response_keeps_string_confidence() {
        let analyzer = LayoutAnalyzer::default();
        let raw = r#"{"elements": [
            {"type": "TEXT", "content": "A", "box": [10, 10, 30, 10], "confidence": "0.9"}
        ]}"#;

        let response = analyzer.analyze_response(raw).unwrap();

        assert_eq!(response.elements.len(), 1);
        assert_eq!(response.elements[0].as_text().unwrap().confidence, Some(0.9));
    }

    #[test]
    fn test_fuse_disabled_passes_primary_through() {
        let analyzer = LayoutAnalyzer::default();
        let primary = vec![text("g1", bx(10.0, 10.0, 30.0, 10.0), 0.9)];
        let secondary = vec![TextElement::new("t1", "x", bx(11.0, 11.0, 28.0, 8.0))];

        let result = analyzer.fuse(primary.clone(), &secondary);

        assert_eq!(result.elements, primary);
        assert_eq!(result.source, DetectionSource::Primary);
        assert_eq!(result.stats.secondary_count, 0);
    }

    #[test]
    fn test_fuse_enabled() {
        let primary = vec![text("g1", bx(10.0, 10.0, 30.0, 10.0), 0.9)];
        let secondary =
            vec![TextElement::new("t1", "x", bx(11.0, 11.0, 28.0, 8.0)).with_confidence(0.95)];

        let result = hybrid().fuse(primary, &secondary);

        assert_eq!(result.source, DetectionSource::Fused);
        assert_eq!(result.stats.matched_count, 1);
        assert_eq!(*result.elements[0].bounding_box(), bx(11.0, 11.0, 28.0, 8.0));
    }

    #[test]
    fn test_fuse_rejects_empty_secondary_when_primary_has_text() {
        let primary = vec![text("g1", bx(10.0, 10.0, 30.0, 10.0), 0.9)];

        let result = hybrid().fuse(primary.clone(), &[]);

        assert_eq!(result.elements, primary);
        assert_eq!(result.source, DetectionSource::Primary);
    }

    #[test]
    fn test_fuse_rejects_noisy_secondary() {
        let primary = vec![text("g1", bx(10.0, 10.0, 30.0, 10.0), 0.9)];
        let secondary: Vec<TextElement> = (0..11)
            .map(|i| TextElement::new(format!("t{}", i), "x", bx(i as f64 * 8.0, 60.0, 5.0, 5.0)))
            .collect();

        let result = hybrid().fuse(primary.clone(), &secondary);

        assert_eq!(result.elements, primary);
        assert_eq!(result.stats.secondary_count, 11);
        assert_eq!(result.stats.matched_count, 0);
    }

    #[test]
    fn test_fuse_drops_invalid_secondary_boxes() {
        let primary = vec![text("g1", bx(10.0, 10.0, 30.0, 10.0), 0.9)];
        let secondary = vec![
            TextElement::new("t1", "x", bx(11.0, 11.0, 28.0, 8.0)),
            TextElement::new("sliver", "x", bx(50.0, 50.0, 0.2, 10.0)),
        ];

        let result = hybrid().fuse(primary, &secondary);

        assert_eq!(result.stats.secondary_count, 1);
        assert_eq!(result.elements.len(), 1);
    }

    #[test]
    fn test_fuse_with_ocr() {
        let primary = vec![text("g1", bx(10.0, 10.0, 30.0, 10.0), 0.9)];
        let page = OcrPage {
            width: 1000.0,
            height: 1000.0,
            lines: vec![
                OcrLine {
                    text: "Title".to_string(),
                    confidence: 92.0,
                    bbox: PixelBox::new(110.0, 110.0, 390.0, 190.0),
                },
                OcrLine {
                    text: "Footer".to_string(),
                    confidence: 85.0,
                    bbox: PixelBox::new(100.0, 900.0, 300.0, 950.0),
                },
            ],
        };

        let result = hybrid().fuse_with_ocr(primary, &page).unwrap();

        assert_eq!(result.stats.matched_count, 1);
        assert_eq!(result.stats.added_from_secondary, 1);
        assert_eq!(result.elements.len(), 2);
        assert_eq!(result.elements[0].as_text().unwrap().content, "g1");
        assert_eq!(result.elements[1].as_text().unwrap().content, "Footer");
    }

    #[test]
    fn test_inpainting_regions_pad_text_only() {
        let elements = vec![
            text("t", bx(10.0, 10.0, 20.0, 20.0), 0.9),
            VisualElement::new("v", "Logo", bx(50.0, 50.0, 10.0, 10.0)).into(),
        ];

        let regions = inpainting_regions(&elements, INPAINT_PADDING);

        assert_eq!(regions, vec![bx(9.0, 9.0, 22.0, 22.0)]);
    }
}
