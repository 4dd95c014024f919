//! Color Model
//!
//! `RgbColor` is the value type every other module keys on: palettes, the
//! color distribution and overlay numbering all compare colors structurally.
//!
//! Also hosts the hex helpers used by palette text input and the distribution
//! table, the lightness test that picks overlay text color, and the Lab
//! conversion used by the clustering quantizer.

use palette::{FromColor, Lab, LinSrgb, Srgb};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MosaicError, Result};

/// An 8-bit sRGB color.
///
/// Serialized as a `#RRGGBB` string so palettes stay readable in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const BLACK: RgbColor = RgbColor::new(0, 0, 0);
    pub const WHITE: RgbColor = RgbColor::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn channels(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Six uppercase hex digits, no `#`.
    pub fn to_hex(self) -> String {
        rgb_to_hex(self)
    }

    pub fn from_hex(hex: &str) -> Result<Self> {
        hex_to_rgb(hex)
    }

    pub fn is_light(self) -> bool {
        is_light(self)
    }

    pub fn to_lab(self) -> Lab {
        let srgb: Srgb<f32> = Srgb::new(self.r, self.g, self.b).into_format();
        let linear: LinSrgb = srgb.into_linear();
        Lab::from_color(linear)
    }

    pub fn from_lab(lab: Lab) -> Self {
        let srgb: Srgb<u8> = Srgb::<f32>::from_color(lab).into_format();
        Self::new(srgb.red, srgb.green, srgb.blue)
    }

    /// Squared Euclidean distance in RGB space.
    pub fn distance_sq(self, other: RgbColor) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}

impl From<image::Rgb<u8>> for RgbColor {
    fn from(pixel: image::Rgb<u8>) -> Self {
        Self::new(pixel[0], pixel[1], pixel[2])
    }
}

impl From<RgbColor> for image::Rgb<u8> {
    fn from(color: RgbColor) -> Self {
        image::Rgb(color.channels())
    }
}

impl From<(u8, u8, u8)> for RgbColor {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self::new(r, g, b)
    }
}

impl TryFrom<String> for RgbColor {
    type Error = MosaicError;

    fn try_from(value: String) -> Result<Self> {
        hex_to_rgb(&value)
    }
}

impl From<RgbColor> for String {
    fn from(color: RgbColor) -> Self {
        color.to_string()
    }
}

// ============================================================================
// HEX CONVERSIONS
// ============================================================================

/// Format a color as `RRGGBB` (uppercase, zero padded).
pub fn rgb_to_hex(color: RgbColor) -> String {
    format!("{:02X}{:02X}{:02X}", color.r, color.g, color.b)
}

/// Parse `RRGGBB` or `#RRGGBB`, case-insensitive, surrounding whitespace ignored.
pub fn hex_to_rgb(hex: &str) -> Result<RgbColor> {
    let trimmed = hex.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);

    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(MosaicError::Format(format!("Invalid hex color: {:?}", hex)));
    }

    let channel = |i: usize| {
        u8::from_str_radix(&digits[i..i + 2], 16)
            .map_err(|e| MosaicError::Format(format!("Invalid hex color {:?}: {}", hex, e)))
    };

    Ok(RgbColor::new(channel(0)?, channel(2)?, channel(4)?))
}

// ============================================================================
// LIGHTNESS
// ============================================================================

/// Luma threshold deciding black (light background) or white (dark) text.
///
/// Squares the raw 0..255 channels without normalizing, so saturated reds and
/// greens count as light. Overlay output depends on this exact threshold.
pub fn is_light(color: RgbColor) -> bool {
    let r = color.r as f64;
    let g = color.g as f64;
    let b = color.b as f64;
    (0.299 * r * r + 0.587 * g * g + 0.114 * b * b).sqrt() > 127.5
}

// ============================================================================
// TESTS
// ============================================================================
