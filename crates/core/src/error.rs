//! Error types for slide layout analysis.
//!
//! Geometry, deduplication and fusion are total functions and never fail;
//! these errors only come from parsing detector output and loading settings.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while preparing detections for fusion.
#[derive(Error, Debug)]
pub enum Error {
    /// The detector response could not be parsed as JSON, even after repair.
    #[error("JSON parse error: {0}")]
    JsonError(String),

    /// A settings value is out of range or not a finite number.
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// Image pixel dimensions cannot be used to convert OCR boxes.
    #[error("Invalid image dimensions: {0}")]
    InvalidDimensions(String),
}
