//! Bounding-box validation, deduplication and detector fusion for slide
//! layout analysis.
//!
//! Detections arrive from a vision model (and optionally a local OCR
//! engine) as rectangles in percentage coordinates of the slide canvas.
//! This crate validates them, drops low-confidence and duplicate boxes, and
//! fuses the two detectors into one element list for the editor.

pub mod confidence;
pub mod config;
pub mod dedup;
pub mod error;
pub mod fusion;
pub mod geometry;
pub mod normalize;
pub mod ocr;
pub mod pipeline;
pub mod types;

pub use confidence::{clamp_confidence, filter_by_confidence, DEFAULT_CONFIDENCE_THRESHOLD};
pub use config::{DetectionSettings, HybridDetectionSettings};
pub use dedup::{deduplicate_elements, DEFAULT_DEDUP_THRESHOLD};
pub use error::{Error, Result};
pub use fusion::{
    fuse_detections, is_secondary_result_valid, DetectionSource, FusionOptions, FusionResult,
    FusionStats, DEFAULT_FUSION_IOU_THRESHOLD,
};
pub use geometry::{calculate_iou, expand_box, is_valid_box, DEFAULT_BOX_PADDING};
pub use normalize::{parse_detector_response, DetectorResponse};
pub use ocr::{lines_to_elements, OcrLine, OcrPage, PixelBox};
pub use pipeline::{inpainting_regions, LayoutAnalyzer, INPAINT_PADDING};
pub use types::{
    Alignment, BoundingBox, DetectedElement, ElementKind, FontSize, FontWeight, HasBox,
    HasConfidence, TextElement, TextStyle, VisualElement,
};
