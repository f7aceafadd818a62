//! Box validation and overlap measures in percentage space.

use crate::types::BoundingBox;

/// Boxes whose width or height is at or below this many percent are noise.
pub const MIN_BOX_EXTENT: f64 = 0.5;

/// Default margin added around text when requesting background cleanup.
pub const DEFAULT_BOX_PADDING: f64 = 0.5;

const CANVAS_EXTENT: f64 = 100.0;

/// Check that a box lies on the canvas and is larger than a sliver.
///
/// Non-finite fields always make a box invalid.
pub fn is_valid_box(b: &BoundingBox) -> bool {
    b.is_finite()
        && (0.0..=CANVAS_EXTENT).contains(&b.top)
        && (0.0..=CANVAS_EXTENT).contains(&b.left)
        && b.width > MIN_BOX_EXTENT
        && b.width <= CANVAS_EXTENT
        && b.height > MIN_BOX_EXTENT
        && b.height <= CANVAS_EXTENT
        && b.top + b.height <= CANVAS_EXTENT
        && b.left + b.width <= CANVAS_EXTENT
}

/// Intersection over Union of two boxes, in `[0, 1]`.
///
/// Boxes that only share an edge have no intersection and score exactly 0.
pub fn calculate_iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    // f64::max/min ignore NaN operands, so guard before taking extremes.
    if !a.is_finite() || !b.is_finite() {
        return 0.0;
    }

    let x1 = a.left.max(b.left);
    let y1 = a.top.max(b.top);
    let x2 = a.right().min(b.right());
    let y2 = a.bottom().min(b.bottom());

    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }

    let intersection = (x2 - x1) * (y2 - y1);
    let union = a.area() + b.area() - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Grow a box by `padding` on every side, clamped to the canvas.
pub fn expand_box(b: &BoundingBox, padding: f64) -> BoundingBox {
    let top = (b.top - padding).max(0.0);
    let left = (b.left - padding).max(0.0);

    BoundingBox {
        top,
        left,
        width: (CANVAS_EXTENT - left).min(b.width + padding * 2.0),
        height: (CANVAS_EXTENT - top).min(b.height + padding * 2.0),
    }
}

impl BoundingBox {
    /// True when no field is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.top.is_finite()
            && self.left.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
    }

    /// See [`is_valid_box`].
    pub fn is_valid(&self) -> bool {
        is_valid_box(self)
    }

    /// See [`calculate_iou`].
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        calculate_iou(self, other)
    }
}
