//! Normalization of raw vision-model responses.
//!
//! Vision models return loosely structured JSON: wrapped in markdown fences,
//! truncated mid-array, with boxes as objects, arrays, `"15%"` strings or
//! 0-1 fractions. This module turns such a response into typed elements in
//! percentage space. Validation and filtering happen later in the pipeline.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

use crate::confidence::clamp_confidence;
use crate::error::{Error, Result};
use crate::types::{BoundingBox, DetectedElement, TextElement, TextStyle, VisualElement};

/// Opening fence of a ```json block.
static JSON_FENCE_OPEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```json\s*").unwrap());

/// Opening fence of an untagged ``` block.
static FENCE_OPEN_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^```\s*").unwrap());

static FENCE_CLOSE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*```$").unwrap());

/// Leading numeric literal of a coordinate string.
static LEADING_FLOAT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[-+]?(\d+\.?\d*|\.\d+)([eE][-+]?\d+)?").unwrap()
});

/// Keys checked, in order, for the element list of a response object.
const ELEMENT_ARRAY_KEYS: &[&str] = &["elements", "items", "layers"];

const DEFAULT_BACKGROUND_COLOR: &str = "#ffffff";

const PARSE_ERROR_PREVIEW_CHARS: usize = 100;

/// A detector response after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorResponse {
    /// Dominant slide background color, as reported by the detector.
    pub background_color: String,

    pub elements: Vec<DetectedElement>,
}

/// Strip markdown fences and any prose around the outermost JSON object.
pub fn clean_json_string(text: &str) -> String {
    let mut cleaned = text.trim().to_string();
    if cleaned.is_empty() {
        return "{}".to_string();
    }

    if cleaned.starts_with("```json") {
        cleaned = JSON_FENCE_OPEN_REGEX.replace(&cleaned, "").to_string();
        cleaned = FENCE_CLOSE_REGEX.replace(&cleaned, "").to_string();
    } else if cleaned.starts_with("```") {
        cleaned = FENCE_OPEN_REGEX.replace(&cleaned, "").to_string();
        cleaned = FENCE_CLOSE_REGEX.replace(&cleaned, "").to_string();
    }

    if let (Some(first_open), Some(last_close)) = (cleaned.find('{'), cleaned.rfind('}')) {
        if last_close > first_open {
            cleaned = cleaned[first_open..=last_close].to_string();
        }
    }

    cleaned
}

/// Parse JSON, attempting one repair of a truncated element array.
pub fn parse_json_lenient(text: &str) -> Result<Value> {
    let err = match serde_json::from_str(text) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    log::warn!("Detector response is not valid JSON, attempting repair: {}", err);

    let repaired = repair_truncated_json(text);
    serde_json::from_str(&repaired).map_err(|_| {
        let preview: String = text.chars().take(PARSE_ERROR_PREVIEW_CHARS).collect();
        Error::JsonError(format!("{}. Raw: {}...", err, preview))
    })
}

/// Close an element array (and its enclosing object) that was cut off.
fn repair_truncated_json(text: &str) -> String {
    let mut repaired = text.trim().to_string();

    let array_unclosed = match (repaired.rfind(']'), repaired.rfind('[')) {
        (None, _) => true,
        (Some(close), Some(open)) => close < open,
        (Some(_), None) => false,
    };

    if array_unclosed {
        if repaired.ends_with(',') {
            repaired.pop();
        }
        repaired.push_str("]}");
    } else if !repaired.contains('}') {
        repaired.push('}');
    }

    repaired
}

/// Locate the list of raw elements inside a parsed response.
pub fn find_elements_array(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::Object(map) => {
            for key in ELEMENT_ARRAY_KEYS {
                if let Some(Value::Array(items)) = map.get(*key) {
                    return items.clone();
                }
            }

            // Fall back to any array that looks like a list of elements.
            map.values()
                .find_map(|v| match v {
                    Value::Array(items) if looks_like_element(items.first()) => Some(items.clone()),
                    _ => None,
                })
                .unwrap_or_default()
        }
        _ => Vec::new(),
    }
}

fn looks_like_element(value: Option<&Value>) -> bool {
    value
        .and_then(Value::as_object)
        .map(|obj| is_present(obj.get("type")) || is_present(obj.get("box")))
        .unwrap_or(false)
}

fn is_present(value: Option<&Value>) -> bool {
    !matches!(value, None | Some(Value::Null))
}

/// Read one coordinate: numbers pass through, `"15.5%"` strings are parsed,
/// anything else is 0. Unparseable strings yield NaN and fail validation.
pub fn parse_coord(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => {
            let stripped = s.replace('%', "");
            LEADING_FLOAT_REGEX
                .find(&stripped)
                .and_then(|m| m.as_str().trim().parse::<f64>().ok())
                .unwrap_or(f64::NAN)
        }
        _ => 0.0,
    }
}

fn normalize_box(raw: Option<&Value>) -> BoundingBox {
    let mut b = match raw {
        None | Some(Value::Null) => BoundingBox::new(10.0, 10.0, 20.0, 20.0),
        Some(Value::Array(items)) if items.len() >= 4 => BoundingBox::new(
            parse_coord(items.first()),
            parse_coord(items.get(1)),
            parse_coord(items.get(2)),
            parse_coord(items.get(3)),
        ),
        Some(Value::Array(_)) => BoundingBox::new(0.0, 0.0, 10.0, 10.0),
        Some(obj) => BoundingBox::new(
            parse_coord(obj.get("top")),
            parse_coord(obj.get("left")),
            parse_coord(obj.get("width")),
            parse_coord(obj.get("height")),
        ),
    };

    // All fields within [0, 1]: the detector answered in fractions.
    let fractional = b.top <= 1.0 && b.left <= 1.0 && b.width <= 1.0 && b.height <= 1.0;
    if fractional && (b.width > 0.0 || b.height > 0.0) {
        b.top *= 100.0;
        b.left *= 100.0;
        b.width *= 100.0;
        b.height *= 100.0;
    }

    b
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Read a confidence that may arrive as a number or a numeric string.
fn parse_confidence(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn is_text_type(value: Option<&Value>) -> bool {
    value
        .and_then(Value::as_str)
        .map(|t| {
            let upper = t.to_uppercase();
            upper.contains("TEXT") || upper.contains("TXT")
        })
        .unwrap_or(false)
}

/// Convert one raw element into a typed element.
///
/// `index` is the element's position in the response, used for its id when
/// the detector supplied none.
pub fn normalize_element(raw: &Value, index: usize) -> DetectedElement {
    let bbox = normalize_box(raw.get("box"));
    let id = non_empty_str(raw.get("id")).unwrap_or_else(|| format!("el-{}", index));
    let confidence = Some(clamp_confidence(parse_confidence(raw.get("confidence"))));

    if is_text_type(raw.get("type")) {
        let style = raw
            .get("style")
            .and_then(|s| serde_json::from_value::<TextStyle>(s.clone()).ok())
            .unwrap_or_default();

        DetectedElement::Text(TextElement {
            id,
            content: non_empty_str(raw.get("content"))
                .unwrap_or_else(|| "Detected Text".to_string()),
            bbox,
            style,
            confidence,
            is_hidden: None,
        })
    } else {
        DetectedElement::Visual(VisualElement {
            id,
            description: non_empty_str(raw.get("description"))
                .unwrap_or_else(|| "Visual Element".to_string()),
            bbox,
            original_box: bbox,
            confidence,
            is_hidden: None,
        })
    }
}

/// Parse a raw detector response into typed elements.
pub fn parse_detector_response(text: &str) -> Result<DetectorResponse> {
    let cleaned = clean_json_string(text);
    let value = parse_json_lenient(&cleaned)?;

    let elements: Vec<DetectedElement> = find_elements_array(&value)
        .iter()
        .enumerate()
        .map(|(idx, raw)| normalize_element(raw, idx))
        .collect();

    let background_color = value
        .get("backgroundColor")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_BACKGROUND_COLOR)
        .to_string();

    log::debug!("Normalized {} raw detections", elements.len());

    Ok(DetectorResponse {
        background_color,
        elements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ElementKind, FontSize, HasBox, HasConfidence};
    use serde_json::json;

    #[test]
    fn test_clean_strips_json_fence() {
        let raw = "```json\n{\"elements\": []}\n```";
        assert_eq!(clean_json_string(raw), "{\"elements\": []}");
    }

    #[test]
    fn test_clean_strips_plain_fence() {
        let raw = "```\n{\"a\": 1}\n```";
        assert_eq!(clean_json_string(raw), "{\"a\": 1}");
    }

    #[test]
    fn test_clean_extracts_object_from_prose() {
        let raw = "Here is the layout: {\"a\": {\"b\": 2}} Hope this helps!";
        assert_eq!(clean_json_string(raw), "{\"a\": {\"b\": 2}}");
    }

    #[test]
    fn test_clean_empty_is_empty_object() {
        assert_eq!(clean_json_string(""), "{}");
        assert_eq!(clean_json_string("   "), "{}");
    }

    #[test]
    fn test_lenient_parse_repairs_truncated_array() {
        let value = parse_json_lenient(r#"{"elements": [{"id": "a"},"#).unwrap();
        assert_eq!(value["elements"][0]["id"], "a");

        let value = parse_json_lenient(r#"{"elements": [{"id": "a"}"#).unwrap();
        assert_eq!(value["elements"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_lenient_parse_gives_up() {
        let err = parse_json_lenient("definitely not json").unwrap_err();
        assert!(matches!(err, Error::JsonError(_)));
    }

    #[test]
    fn test_find_elements_array() {
        assert_eq!(find_elements_array(&json!([1, 2])).len(), 2);
        assert_eq!(find_elements_array(&json!({"items": [1]})).len(), 1);
        assert_eq!(find_elements_array(&json!({"layers": [1, 2, 3]})).len(), 3);
        assert_eq!(
            find_elements_array(&json!({"detections": [{"box": [1, 2, 3, 4]}]})).len(),
            1
        );
        assert!(find_elements_array(&json!({"colors": ["#fff"]})).is_empty());
        assert!(find_elements_array(&json!("text")).is_empty());
    }

    #[test]
    fn test_parse_coord() {
        assert_eq!(parse_coord(Some(&json!(15.5))), 15.5);
        assert_eq!(parse_coord(Some(&json!("15.5%"))), 15.5);
        assert_eq!(parse_coord(Some(&json!("42px"))), 42.0);
        assert!(parse_coord(Some(&json!("abc"))).is_nan());
        assert_eq!(parse_coord(Some(&json!(null))), 0.0);
        assert_eq!(parse_coord(None), 0.0);
    }

    #[test]
    fn test_normalize_text_element() {
        let raw = json!({
            "id": "title",
            "type": "text",
            "content": "Hello",
            "box": {"top": 10, "left": "20%", "width": 30, "height": 5},
            "style": {
                "fontSize": "title",
                "fontWeight": "bold",
                "color": "#ff0000",
                "alignment": "center"
            },
            "confidence": 0.9
        });

        let el = normalize_element(&raw, 0);
        let text = el.as_text().unwrap();

        assert_eq!(text.id, "title");
        assert_eq!(text.content, "Hello");
        assert_eq!(text.bbox, BoundingBox::new(10.0, 20.0, 30.0, 5.0));
        assert_eq!(text.style.font_size, FontSize::Title);
        assert_eq!(text.confidence, Some(0.9));
    }

    #[test]
    fn test_normalize_fractional_box_scales_to_percent() {
        let raw = json!({"type": "TEXT", "box": [0.25, 0.5, 0.5, 0.25]});
        let el = normalize_element(&raw, 3);

        assert_eq!(el.id(), "el-3");
        assert_eq!(*el.bounding_box(), BoundingBox::new(25.0, 50.0, 50.0, 25.0));
    }

    #[test]
    fn test_normalize_box_fallbacks() {
        let missing = normalize_element(&json!({"type": "VISUAL"}), 0);
        assert_eq!(*missing.bounding_box(), BoundingBox::new(10.0, 10.0, 20.0, 20.0));

        let short = normalize_element(&json!({"box": [5, 5]}), 0);
        assert_eq!(*short.bounding_box(), BoundingBox::new(0.0, 0.0, 10.0, 10.0));

        // A zero-sized fractional box stays zero and is left for validation to reject.
        let empty = normalize_element(&json!({"box": {"top": 0.5, "left": 0.5}}), 0);
        assert_eq!(*empty.bounding_box(), BoundingBox::new(0.5, 0.5, 0.0, 0.0));
    }

    #[test]
    fn test_normalize_defaults() {
        let visual = normalize_element(&json!({"type": "image", "box": [10, 10, 20, 20]}), 1);
        assert_eq!(visual.kind(), ElementKind::Visual);
        assert_eq!(visual.confidence(), Some(0.5));
        match &visual {
            DetectedElement::Visual(v) => {
                assert_eq!(v.description, "Visual Element");
                assert_eq!(v.original_box, v.bbox);
            }
            DetectedElement::Text(_) => panic!("expected visual"),
        }

        let raw = json!({"type": "TXT_BLOCK", "style": {"fontSize": "huge"}});
        let text = normalize_element(&raw, 2);
        let text = text.as_text().unwrap();
        assert_eq!(text.content, "Detected Text");
        assert_eq!(text.style, TextStyle::default());
    }

    #[test]
    fn test_normalize_clamps_confidence() {
        let el = normalize_element(&json!({"type": "TEXT", "confidence": 1.7}), 0);
        assert_eq!(el.confidence(), Some(1.0));
    }

    #[test]
    fn test_normalize_string_confidence() {
        let raw = json!({"type": "TEXT", "box": [10, 10, 30, 10], "confidence": "0.9"});
        assert_eq!(normalize_element(&raw, 0).confidence(), Some(0.9));

        let raw = json!({"type": "TEXT", "confidence": " 2 "});
        assert_eq!(normalize_element(&raw, 0).confidence(), Some(1.0));

        let raw = json!({"type": "TEXT", "confidence": "high"});
        assert_eq!(normalize_element(&raw, 0).confidence(), Some(0.5));
    }

    #[test]
    fn test_parse_detector_response() {
        let raw = r##"```json
{
  "backgroundColor": "#112233",
  "elements": [
    {"type": "TEXT", "content": "Title", "confidence": 0.95,
     "box": {"top": 5, "left": 10, "width": 80, "height": 10}},
    {"type": "VISUAL", "description": "Chart", "confidence": 0.8,
     "box": {"top": 30, "left": 10, "width": 50, "height": 50}}
  ]
}
```"##;

        let response = parse_detector_response(raw).unwrap();

        assert_eq!(response.background_color, "#112233");
        assert_eq!(response.elements.len(), 2);
        assert_eq!(response.elements[0].id(), "el-0");
        assert_eq!(response.elements[1].kind(), ElementKind::Visual);
    }

    #[test]
    fn test_parse_empty_response() {
        let response = parse_detector_response("").unwrap();
        assert_eq!(response.background_color, "#ffffff");
        assert!(response.elements.is_empty());
    }
}
