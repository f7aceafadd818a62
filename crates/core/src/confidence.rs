//! Dropping low-confidence detections.

use crate::types::HasConfidence;

/// Default minimum confidence for a detection to be kept.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Confidence assumed for a detection that reports none. Missing scores are
/// trusted here; fusion uses its own, lower default.
pub const UNSCORED_CONFIDENCE: f64 = 1.0;

/// Keep elements whose confidence is at least `threshold`, preserving order.
pub fn filter_by_confidence<T>(elements: &[T], threshold: f64) -> Vec<T>
where
    T: HasConfidence + Clone,
{
    elements
        .iter()
        .filter(|e| e.confidence().unwrap_or(UNSCORED_CONFIDENCE) >= threshold)
        .cloned()
        .collect()
}

/// Clamp a raw detector confidence into `[0, 1]`.
///
/// Missing or non-numeric scores become 0.5 (uncertain).
pub fn clamp_confidence(value: Option<f64>) -> f64 {
    match value {
        Some(v) if !v.is_nan() => v.clamp(0.0, 1.0),
        _ => 0.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, DetectedElement, TextElement};

    fn scored(id: &str, confidence: Option<f64>) -> DetectedElement {
        let mut el = TextElement::new(id, id, BoundingBox::new(10.0, 10.0, 20.0, 20.0));
        el.confidence = confidence;
        el.into()
    }

    fn ids(elements: &[DetectedElement]) -> Vec<&str> {
        elements.iter().map(|e| e.id()).collect()
    }

    #[test]
    fn test_keeps_at_or_above_threshold() {
        let elements = vec![
            scored("1", Some(0.9)),
            scored("2", Some(0.7)),
            scored("3", Some(0.6)),
        ];
        assert_eq!(filter_by_confidence(&elements, DEFAULT_CONFIDENCE_THRESHOLD).len(), 3);
    }

    #[test]
    fn test_removes_below_threshold() {
        let elements = vec![
            scored("1", Some(0.5)),
            scored("2", Some(0.3)),
            scored("3", Some(0.59)),
        ];
        assert!(filter_by_confidence(&elements, DEFAULT_CONFIDENCE_THRESHOLD).is_empty());
    }

    #[test]
    fn test_missing_confidence_is_trusted() {
        let elements = vec![scored("1", None), scored("2", None)];
        assert_eq!(filter_by_confidence(&elements, 0.99).len(), 2);
    }

    #[test]
    fn test_mixed_preserves_order() {
        let elements = vec![
            scored("1", Some(0.95)),
            scored("2", Some(0.4)),
            scored("3", Some(0.8)),
            scored("4", Some(0.2)),
        ];
        let result = filter_by_confidence(&elements, DEFAULT_CONFIDENCE_THRESHOLD);
        assert_eq!(ids(&result), vec!["1", "3"]);
    }

    #[test]
    fn test_threshold_bounds() {
        let elements = vec![scored("1", Some(0.0)), scored("2", Some(1.0))];
        assert_eq!(filter_by_confidence(&elements, 0.0).len(), 2);
        assert_eq!(ids(&filter_by_confidence(&elements, 1.0)), vec!["2"]);
    }

    #[test]
    fn test_clamp_confidence() {
        assert_eq!(clamp_confidence(None), 0.5);
        assert_eq!(clamp_confidence(Some(f64::NAN)), 0.5);
        assert_eq!(clamp_confidence(Some(1.5)), 1.0);
        assert_eq!(clamp_confidence(Some(-0.2)), 0.0);
        assert_eq!(clamp_confidence(Some(0.42)), 0.42);
    }
}
