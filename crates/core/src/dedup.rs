//! Collapsing overlapping detections.

use crate::geometry::calculate_iou;
use crate::types::HasBox;

/// IoU above which two detections are considered the same region.
pub const DEFAULT_DEDUP_THRESHOLD: f64 = 0.8;

/// Drop every element that overlaps an earlier kept element by more than
/// `threshold` IoU.
///
/// First seen wins and input order is preserved, so sort beforehand if a
/// particular element should survive (e.g. highest confidence first).
pub fn deduplicate_elements<T>(elements: &[T], threshold: f64) -> Vec<T>
where
    T: HasBox + Clone,
{
    let mut kept: Vec<T> = Vec::with_capacity(elements.len());

    for element in elements {
        let duplicate = kept
            .iter()
            .any(|k| calculate_iou(element.bounding_box(), k.bounding_box()) > threshold);

        if !duplicate {
            kept.push(element.clone());
        }
    }

    kept
}
