//! Fusing a semantic detector with a geometric text detector.
//!
//! The primary detector (a vision model) knows what each region is and what
//! it says, but its boxes are loose. The secondary detector (local OCR) only
//! finds text lines, with tight pixel-accurate boxes. Fusion keeps the
//! primary's classification and content and borrows the secondary's geometry.

use serde::{Deserialize, Serialize};

use crate::geometry::calculate_iou;
use crate::types::{BoundingBox, DetectedElement, HasBox, TextElement};

/// Default IoU needed to pair a primary text element with a secondary one.
pub const DEFAULT_FUSION_IOU_THRESHOLD: f64 = 0.3;

/// Confidence assumed for an unscored element when comparing across sources.
pub const FUSION_DEFAULT_CONFIDENCE: f64 = 0.8;

/// Secondary output larger than this multiple of the primary text count is noise.
const MAX_SECONDARY_RATIO: usize = 10;

/// Tuning for [`fuse_detections`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FusionOptions {
    /// Minimum IoU for a primary/secondary pair to be merged.
    pub iou_threshold: f64,

    /// Use the secondary detector's box for matched text elements.
    pub prefer_client_boxes: bool,
}

impl Default for FusionOptions {
    fn default() -> Self {
        Self {
            iou_threshold: DEFAULT_FUSION_IOU_THRESHOLD,
            prefer_client_boxes: true,
        }
    }
}

impl FusionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_iou_threshold(mut self, threshold: f64) -> Self {
        self.iou_threshold = threshold;
        self
    }

    pub fn with_prefer_client_boxes(mut self, prefer: bool) -> Self {
        self.prefer_client_boxes = prefer;
        self
    }
}

/// A bare number is shorthand for an IoU threshold with default options.
impl From<f64> for FusionOptions {
    fn from(iou_threshold: f64) -> Self {
        Self::default().with_iou_threshold(iou_threshold)
    }
}

/// Which detector the fused element set is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionSource {
    /// Only the primary (vision model) detector contributed.
    #[serde(rename = "gemini")]
    Primary,
    /// Only the secondary (OCR) detector contributed.
    #[serde(rename = "tesseract")]
    Secondary,
    /// The secondary detector refined or extended the primary output.
    #[serde(rename = "fused")]
    Fused,
}

/// Counters describing one fusion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FusionStats {
    #[serde(rename = "geminiCount")]
    pub primary_count: usize,

    #[serde(rename = "tesseractCount")]
    pub secondary_count: usize,

    #[serde(rename = "matchedCount")]
    pub matched_count: usize,

    #[serde(rename = "addedFromTesseract")]
    pub added_from_secondary: usize,
}

/// Output of [`fuse_detections`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionResult {
    pub elements: Vec<DetectedElement>,
    pub source: DetectionSource,
    pub stats: FusionStats,
}

impl FusionResult {
    /// A result that passes the primary detections through untouched.
    pub fn primary_only(primary: Vec<DetectedElement>) -> Self {
        let primary_count = primary.len();
        Self {
            elements: primary,
            source: DetectionSource::Primary,
            stats: FusionStats {
                primary_count,
                ..FusionStats::default()
            },
        }
    }
}

/// Merge primary detections with secondary text detections.
///
/// - Visual elements from `primary` pass through unchanged.
/// - Each primary text element is paired greedily, in list order, with the
///   unused secondary element of highest IoU (at least `iou_threshold`).
///   The pair keeps the primary's content and the higher of the two
///   confidences; the box comes from the secondary when
///   `prefer_client_boxes` is set.
/// - Leftover secondary elements are appended only when they overlap
///   nothing already in the output by more than `iou_threshold`.
pub fn fuse_detections(
    primary: &[DetectedElement],
    secondary: &[TextElement],
    options: impl Into<FusionOptions>,
) -> FusionResult {
    let options = options.into();
    let threshold = options.iou_threshold;

    let mut fused: Vec<DetectedElement> = Vec::with_capacity(primary.len() + secondary.len());
    let mut used = vec![false; secondary.len()];
    let mut matched_count = 0;

    for element in primary {
        let text = match element {
            DetectedElement::Visual(_) => {
                fused.push(element.clone());
                continue;
            }
            DetectedElement::Text(text) => text,
        };

        match best_unused_match(&text.bbox, secondary, &used, threshold) {
            Some(idx) => {
                used[idx] = true;
                matched_count += 1;
                fused.push(merge_text(text, &secondary[idx], options.prefer_client_boxes).into());
            }
            None => fused.push(element.clone()),
        }
    }

    let mut added_from_secondary = 0;
    for (idx, candidate) in secondary.iter().enumerate() {
        if used[idx] {
            continue;
        }

        let overlaps = fused
            .iter()
            .any(|el| calculate_iou(el.bounding_box(), &candidate.bbox) > threshold);

        if !overlaps {
            fused.push(
                TextElement {
                    id: format!("tesseract-added-{}", idx),
                    ..candidate.clone()
                }
                .into(),
            );
            added_from_secondary += 1;
        }
    }

    let source = if secondary.is_empty() {
        DetectionSource::Primary
    } else if matched_count > 0 || added_from_secondary > 0 {
        DetectionSource::Fused
    } else {
        DetectionSource::Primary
    };

    let stats = FusionStats {
        primary_count: primary.len(),
        secondary_count: secondary.len(),
        matched_count,
        added_from_secondary,
    };

    log::debug!(
        "Fused {} primary + {} secondary detections: {} matched, {} added",
        stats.primary_count,
        stats.secondary_count,
        stats.matched_count,
        stats.added_from_secondary
    );

    FusionResult {
        elements: fused,
        source,
        stats,
    }
}

/// Index of the unused secondary element with the highest IoU against
/// `target`, if any reaches `threshold`. Ties go to the earlier element.
fn best_unused_match(
    target: &BoundingBox,
    secondary: &[TextElement],
    used: &[bool],
    threshold: f64,
) -> Option<usize> {
    let mut best: Option<usize> = None;
    let mut best_iou = 0.0;

    for (idx, candidate) in secondary.iter().enumerate() {
        if used[idx] {
            continue;
        }

        let iou = calculate_iou(target, &candidate.bbox);
        if iou > best_iou && iou >= threshold {
            best_iou = iou;
            best = Some(idx);
        }
    }

    best
}

fn merge_text(
    primary: &TextElement,
    secondary: &TextElement,
    prefer_client_boxes: bool,
) -> TextElement {
    let confidence = primary
        .confidence
        .unwrap_or(FUSION_DEFAULT_CONFIDENCE)
        .max(secondary.confidence.unwrap_or(FUSION_DEFAULT_CONFIDENCE));

    let content = if primary.content.is_empty() {
        secondary.content.clone()
    } else {
        primary.content.clone()
    };

    TextElement {
        bbox: if prefer_client_boxes {
            secondary.bbox
        } else {
            primary.bbox
        },
        confidence: Some(confidence),
        content,
        ..primary.clone()
    }
}

/// Decide whether the secondary detector's output is worth fusing.
///
/// Rejects an empty result when the primary found text (the OCR engine
/// likely failed), and a result more than ten times the primary text count
/// (likely noise from a photographic background).
pub fn is_secondary_result_valid(secondary: &[TextElement], primary_text_count: usize) -> bool {
    if secondary.is_empty() && primary_text_count > 0 {
        return false;
    }

    if primary_text_count > 0 && secondary.len() > primary_text_count * MAX_SECONDARY_RATIO {
        return false;
    }

    true
}

/// Number of text elements in a detection list.
pub fn count_text_elements(elements: &[DetectedElement]) -> usize {
    elements.iter().filter(|e| e.is_text()).count()
}
