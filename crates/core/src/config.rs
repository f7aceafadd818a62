//! Detection settings shared by the CLI and the WASM worker.

use serde::{Deserialize, Serialize};

use crate::confidence::DEFAULT_CONFIDENCE_THRESHOLD;
use crate::dedup::DEFAULT_DEDUP_THRESHOLD;
use crate::error::{Error, Result};
use crate::fusion::{FusionOptions, DEFAULT_FUSION_IOU_THRESHOLD};

/// Lines below this OCR confidence (0-100 scale) are discarded.
pub const DEFAULT_OCR_MIN_LINE_CONFIDENCE: f64 = 60.0;

/// Settings for combining the vision model with a local OCR pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HybridDetectionSettings {
    /// Master switch for fusing a secondary detector.
    pub enabled: bool,

    /// Whether the OCR engine is consulted when hybrid detection is on.
    #[serde(alias = "useTesseract")]
    pub use_secondary: bool,

    /// Prefer the OCR engine's tighter boxes for matched text.
    pub prefer_client_boxes: bool,
}

impl Default for HybridDetectionSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            use_secondary: true,
            prefer_client_boxes: true,
        }
    }
}

/// Thresholds for the detection pipeline.
///
/// Every field has a default, so a partial JSON document is a valid
/// settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DetectionSettings {
    /// Minimum detector confidence, 0-1.
    pub confidence_threshold: f64,

    /// IoU above which two detections are merged into one.
    pub dedup_threshold: f64,

    /// IoU needed to pair a vision-model text box with an OCR box.
    pub fusion_iou_threshold: f64,

    /// Minimum OCR line confidence, on the OCR engine's 0-100 scale.
    pub ocr_min_line_confidence: f64,

    pub hybrid_detection: HybridDetectionSettings,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            dedup_threshold: DEFAULT_DEDUP_THRESHOLD,
            fusion_iou_threshold: DEFAULT_FUSION_IOU_THRESHOLD,
            ocr_min_line_confidence: DEFAULT_OCR_MIN_LINE_CONFIDENCE,
            hybrid_detection: HybridDetectionSettings::default(),
        }
    }
}

impl DetectionSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from JSON, filling missing fields with defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSettings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_fusion_iou_threshold(mut self, threshold: f64) -> Self {
        self.fusion_iou_threshold = threshold;
        self
    }

    /// Turn hybrid detection on or off.
    pub fn with_hybrid_detection(mut self, enabled: bool) -> Self {
        self.hybrid_detection.enabled = enabled;
        self
    }

    pub fn with_prefer_client_boxes(mut self, prefer: bool) -> Self {
        self.hybrid_detection.prefer_client_boxes = prefer;
        self
    }

    /// Check that every threshold is a finite number in range.
    pub fn validate(&self) -> Result<()> {
        check_unit("confidenceThreshold", self.confidence_threshold)?;
        check_unit("dedupThreshold", self.dedup_threshold)?;
        check_unit("fusionIouThreshold", self.fusion_iou_threshold)?;

        if !(0.0..=100.0).contains(&self.ocr_min_line_confidence) {
            return Err(Error::InvalidSettings(format!(
                "ocrMinLineConfidence must be within 0-100, got {}",
                self.ocr_min_line_confidence
            )));
        }

        Ok(())
    }

    /// Whether the secondary detector takes part in this run.
    pub fn uses_secondary(&self) -> bool {
        self.hybrid_detection.enabled && self.hybrid_detection.use_secondary
    }

    /// Fusion options derived from these settings.
    pub fn fusion_options(&self) -> FusionOptions {
        FusionOptions::new()
            .with_iou_threshold(self.fusion_iou_threshold)
            .with_prefer_client_boxes(self.hybrid_detection.prefer_client_boxes)
    }
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    // RangeInclusive::contains is false for NaN.
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidSettings(format!(
            "{} must be within 0-1, got {}",
            name, value
        )))
    }
}
