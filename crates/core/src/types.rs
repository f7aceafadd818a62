//! Domain types for detected slide elements.
//!
//! All geometry is expressed in percentage coordinates (0-100) of the slide
//! canvas, so boxes are independent of the source image resolution.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle anchored at (`left`, `top`), in canvas percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Distance from the top edge of the canvas.
    pub top: f64,

    /// Distance from the left edge of the canvas.
    pub left: f64,

    /// Horizontal extent.
    pub width: f64,

    /// Vertical extent.
    pub height: f64,
}

impl BoundingBox {
    /// Create a box from its top-left corner and size.
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    /// X coordinate of the right edge.
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Y coordinate of the bottom edge.
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Discriminant of a [`DetectedElement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ElementKind {
    /// Text the editor re-renders as an editable text box.
    Text,
    /// Picture, icon or chart the editor crops out of the source image.
    Visual,
}

/// Categorical font size of a text element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
    Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// Visual style of a text element. Carried through fusion untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextStyle {
    pub font_size: FontSize,
    pub font_weight: FontWeight,

    /// Approximate hex color, e.g. `#000000`.
    pub color: String,

    pub alignment: Alignment,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: FontSize::Medium,
            font_weight: FontWeight::Normal,
            color: "#000000".to_string(),
            alignment: Alignment::Left,
        }
    }
}

/// A region of the slide containing text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextElement {
    pub id: String,

    /// Text content (may contain markdown or LaTeX).
    pub content: String,

    #[serde(rename = "box")]
    pub bbox: BoundingBox,

    #[serde(default)]
    pub style: TextStyle,

    /// Detector confidence in [0, 1]. `None` when the detector gave none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_hidden: Option<bool>,
}

impl TextElement {
    /// Create a text element with the default style and no confidence.
    pub fn new(id: impl Into<String>, content: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            bbox,
            style: TextStyle::default(),
            confidence: None,
            is_hidden: None,
        }
    }

    /// Set the detector confidence.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Set the text style.
    pub fn with_style(mut self, style: TextStyle) -> Self {
        self.style = style;
        self
    }
}

/// A non-text region of the slide (picture, icon, chart).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualElement {
    pub id: String,
    pub description: String,

    #[serde(rename = "box")]
    pub bbox: BoundingBox,

    /// Position before any manual correction, used to re-crop the source image.
    pub original_box: BoundingBox,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_hidden: Option<bool>,
}

impl VisualElement {
    /// Create a visual element whose original box equals its current box.
    pub fn new(id: impl Into<String>, description: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            bbox,
            original_box: bbox,
            confidence: None,
            is_hidden: None,
        }
    }

    /// Set the detector confidence.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// A single detection, either text or visual.
///
/// Serialized with an explicit `"type": "TEXT" | "VISUAL"` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum DetectedElement {
    Text(TextElement),
    Visual(VisualElement),
}

impl DetectedElement {
    pub fn id(&self) -> &str {
        match self {
            Self::Text(t) => &t.id,
            Self::Visual(v) => &v.id,
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Text(_) => ElementKind::Text,
            Self::Visual(_) => ElementKind::Visual,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    /// Borrow the text payload, if this is a text element.
    pub fn as_text(&self) -> Option<&TextElement> {
        match self {
            Self::Text(t) => Some(t),
            Self::Visual(_) => None,
        }
    }
}

impl From<TextElement> for DetectedElement {
    fn from(element: TextElement) -> Self {
        Self::Text(element)
    }
}

impl From<VisualElement> for DetectedElement {
    fn from(element: VisualElement) -> Self {
        Self::Visual(element)
    }
}

/// Anything that occupies a rectangle on the canvas.
pub trait HasBox {
    fn bounding_box(&self) -> &BoundingBox;
}

/// Anything that may carry a detector confidence score.
pub trait HasConfidence {
    fn confidence(&self) -> Option<f64>;
}

impl HasBox for BoundingBox {
    fn bounding_box(&self) -> &BoundingBox {
        self
    }
}

impl HasBox for TextElement {
    fn bounding_box(&self) -> &BoundingBox {
        &self.bbox
    }
}

impl HasBox for VisualElement {
    fn bounding_box(&self) -> &BoundingBox {
        &self.bbox
    }
}

impl HasBox for DetectedElement {
    fn bounding_box(&self) -> &BoundingBox {
        match self {
            Self::Text(t) => &t.bbox,
            Self::Visual(v) => &v.bbox,
        }
    }
}

impl HasConfidence for TextElement {
    fn confidence(&self) -> Option<f64> {
        self.confidence
    }
}

impl HasConfidence for VisualElement {
    fn confidence(&self) -> Option<f64> {
        self.confidence
    }
}

impl HasConfidence for DetectedElement {
    fn confidence(&self) -> Option<f64> {
        match self {
            Self::Text(t) => t.confidence,
            Self::Visual(v) => v.confidence,
        }
    }
}
