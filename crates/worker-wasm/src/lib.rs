//! WASM-compatible wrapper for slide layout fusion.
//!
//! This crate exposes box validation, deduplication and detector fusion to
//! JavaScript so the browser editor can call them directly.

use serde::{Deserialize, Serialize};
use slidefuse_core::{
    BoundingBox, DetectedElement, DetectionSettings, DetectorResponse, FusionOptions,
    FusionResult, LayoutAnalyzer, TextElement, DEFAULT_BOX_PADDING, DEFAULT_CONFIDENCE_THRESHOLD,
    DEFAULT_DEDUP_THRESHOLD,
};
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn init() {
    // Set up better panic messages in the console
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Fusion options as accepted from JavaScript: either an options object or
/// a bare number meaning the IoU threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FusionOptionsArg {
    Threshold(f64),
    Options(FusionOptions),
}

impl From<FusionOptionsArg> for FusionOptions {
    fn from(arg: FusionOptionsArg) -> Self {
        match arg {
            FusionOptionsArg::Threshold(threshold) => FusionOptions::from(threshold),
            FusionOptionsArg::Options(options) => options,
        }
    }
}

fn from_js<T: for<'de> Deserialize<'de>>(value: JsValue, what: &str) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| JsValue::from_str(&format!("Invalid {}: {}", what, e)))
}

/// Deserialize an optional argument, treating `undefined` and `null` as absent.
fn optional_from_js<T: for<'de> Deserialize<'de>>(
    value: JsValue,
    what: &str,
) -> Result<Option<T>, JsValue> {
    if value.is_undefined() || value.is_null() {
        Ok(None)
    } else {
        from_js(value, what).map(Some)
    }
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Parse a raw vision-model response and return the cleaned-up layout.
///
/// # Arguments
/// * `response_text` - The model's text output (JSON, possibly fenced)
/// * `settings` - Optional detection settings object
///
/// # Returns
/// `{ backgroundColor, elements }`, or throws on unparseable input.
#[wasm_bindgen]
pub fn analyze_layout(response_text: &str, settings: JsValue) -> Result<JsValue, JsValue> {
    let settings: Option<DetectionSettings> = optional_from_js(settings, "settings")?;
    let result = analyze_layout_impl(response_text, settings.unwrap_or_default())
        .map_err(|e| JsValue::from_str(&e))?;
    to_js(&result)
}

fn analyze_layout_impl(
    response_text: &str,
    settings: DetectionSettings,
) -> Result<DetectorResponse, String> {
    settings.validate().map_err(|e| e.to_string())?;
    LayoutAnalyzer::new(settings)
        .analyze_response(response_text)
        .map_err(|e| e.to_string())
}

/// Fuse vision-model detections with OCR text detections.
///
/// `options` may be an options object, a number (IoU threshold) or omitted.
#[wasm_bindgen]
pub fn fuse_detections(
    primary: JsValue,
    secondary: JsValue,
    options: JsValue,
) -> Result<JsValue, JsValue> {
    let primary: Vec<DetectedElement> = from_js(primary, "primary elements")?;
    let secondary: Vec<TextElement> = from_js(secondary, "secondary elements")?;
    let options: Option<FusionOptionsArg> = optional_from_js(options, "fusion options")?;

    to_js(&fuse_detections_impl(&primary, &secondary, options))
}

fn fuse_detections_impl(
    primary: &[DetectedElement],
    secondary: &[TextElement],
    options: Option<FusionOptionsArg>,
) -> FusionResult {
    let options = options.map(FusionOptions::from).unwrap_or_default();
    slidefuse_core::fuse_detections(primary, secondary, options)
}

/// Whether OCR output is trustworthy enough to fuse.
#[wasm_bindgen]
pub fn is_secondary_result_valid(
    secondary: JsValue,
    primary_text_count: usize,
) -> Result<bool, JsValue> {
    let secondary: Vec<TextElement> = from_js(secondary, "secondary elements")?;
    Ok(slidefuse_core::is_secondary_result_valid(&secondary, primary_text_count))
}

/// Remove elements overlapping an earlier element above `threshold` IoU.
#[wasm_bindgen]
pub fn deduplicate_elements(elements: JsValue, threshold: Option<f64>) -> Result<JsValue, JsValue> {
    let elements: Vec<DetectedElement> = from_js(elements, "elements")?;
    to_js(&slidefuse_core::deduplicate_elements(
        &elements,
        threshold.unwrap_or(DEFAULT_DEDUP_THRESHOLD),
    ))
}

/// Keep elements at or above `threshold` confidence.
#[wasm_bindgen]
pub fn filter_by_confidence(elements: JsValue, threshold: Option<f64>) -> Result<JsValue, JsValue> {
    let elements: Vec<DetectedElement> = from_js(elements, "elements")?;
    to_js(&slidefuse_core::filter_by_confidence(
        &elements,
        threshold.unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
    ))
}

#[wasm_bindgen]
pub fn is_valid_box(bbox: JsValue) -> Result<bool, JsValue> {
    let bbox: BoundingBox = from_js(bbox, "box")?;
    Ok(slidefuse_core::is_valid_box(&bbox))
}

#[wasm_bindgen]
pub fn calculate_iou(a: JsValue, b: JsValue) -> Result<f64, JsValue> {
    let a: BoundingBox = from_js(a, "box")?;
    let b: BoundingBox = from_js(b, "box")?;
    Ok(slidefuse_core::calculate_iou(&a, &b))
}

/// Pad a box on every side, clamped to the canvas.
#[wasm_bindgen]
pub fn expand_box(bbox: JsValue, padding: Option<f64>) -> Result<JsValue, JsValue> {
    let bbox: BoundingBox = from_js(bbox, "box")?;
    to_js(&slidefuse_core::expand_box(
        &bbox,
        padding.unwrap_or(DEFAULT_BOX_PADDING),
    ))
}
