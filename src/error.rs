use thiserror::Error;

use crate::color::RgbColor;

#[derive(Error, Debug)]
pub enum MosaicError {
    /// Malformed hex color token.
    #[error("Format error: {0}")]
    Format(String),

    /// Parameters or palette rejected before any quantization work starts.
    #[error("Invalid parameter: {0}")]
    Validation(String),

    /// A mosaic cell color is missing from the distribution computed from the
    /// same mosaic. This is a bug, not a user error; do not retry.
    #[error("Internal consistency error: color {color} at cell ({x}, {y}) is not in the distribution")]
    InternalConsistency { color: RgbColor, x: u32, y: u32 },

    #[error("Font error: {0}")]
    Font(String),

    #[error("Mosaic generation was cancelled")]
    Cancelled,

    #[error("A mosaic regeneration is already in flight")]
    Busy,

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MosaicError>;
