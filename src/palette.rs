//! Palette Extraction
//!
//! A `Palette` is an ordered, duplicate-free list of colors. Its order is the
//! numbering users see, so every constructor here is deterministic.
//!
//! Acquisition strategies:
//! - Exhaustive scan of every pixel (`from_image_exhaustive`)
//! - Reading the color table of an indexed raster (`from_indexed`)
//! - Fitting a clustering quantizer (`Quantizer::fit` in `crate::quantize`)
//! - Parsing user hex input (`from_hex_colors`, `from_hex_text`)

use image::RgbImage;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::color::{hex_to_rgb, RgbColor};
use crate::error::{MosaicError, Result};
use crate::quantize::IndexedImage;

/// Smallest palette a palette-constrained mosaic accepts.
pub const MIN_PALETTE_COLORS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<RgbColor>", into = "Vec<RgbColor>")]
pub struct Palette {
    colors: Vec<RgbColor>,
}

impl Palette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from any color sequence, keeping the first occurrence of each color.
    pub fn from_colors<I>(colors: I) -> Self
    where
        I: IntoIterator<Item = RgbColor>,
    {
        let mut palette = Self::new();
        for color in colors {
            palette.push(color);
        }
        palette
    }

    /// Append a color unless already present. Returns whether it was added.
    pub fn push(&mut self, color: RgbColor) -> bool {
        if self.colors.contains(&color) {
            return false;
        }
        self.colors.push(color);
        true
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[RgbColor] {
        &self.colors
    }

    pub fn iter(&self) -> impl Iterator<Item = &RgbColor> {
        self.colors.iter()
    }

    pub fn get(&self, index: usize) -> Option<RgbColor> {
        self.colors.get(index).copied()
    }

    /// Zero-based position of `color`.
    pub fn position(&self, color: RgbColor) -> Option<usize> {
        self.colors.iter().position(|&c| c == color)
    }

    pub fn contains(&self, color: RgbColor) -> bool {
        self.colors.contains(&color)
    }

    /// Reject palettes too small to drive a palette-constrained mosaic.
    pub fn validate_for_mosaic(&self) -> Result<()> {
        if self.colors.len() < MIN_PALETTE_COLORS {
            return Err(MosaicError::Validation(format!(
                "A palette needs at least {} colors, got {}",
                MIN_PALETTE_COLORS,
                self.colors.len()
            )));
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Extraction strategies
    // ------------------------------------------------------------------------

    /// Every distinct color of the image, in row-major first-seen order.
    pub fn from_image_exhaustive(image: &RgbImage) -> Self {
        let distinct: IndexSet<RgbColor> = image.pixels().map(|&p| RgbColor::from(p)).collect();
        Self {
            colors: distinct.into_iter().collect(),
        }
    }

    /// The color table of an indexed raster, in table order.
    pub fn from_indexed(image: &IndexedImage) -> Self {
        image.palette().clone()
    }

    /// Parse hex tokens (`"FF0000"`, `"#00ff00"`). Every token must be valid
    /// and at least two distinct colors must result.
    pub fn from_hex_colors<S: AsRef<str>>(hex_colors: &[S]) -> Result<Self> {
        let colors = hex_colors
            .iter()
            .map(|hex| hex_to_rgb(hex.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let palette = Self::from_colors(colors);
        palette.validate_for_mosaic()?;
        Ok(palette)
    }

    /// Parse free-form text such as `"#FF0000 #00FF00\n#0000FF"`.
    ///
    /// The text is split on `#`, tokens are trimmed and empty ones dropped.
    pub fn from_hex_text(text: &str) -> Result<Self> {
        let tokens: Vec<&str> = text
            .split('#')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .collect();
        Self::from_hex_colors(&tokens)
    }

    /// Build from a flat `[r, g, b, r, g, b, ...]` channel list.
    pub fn from_flat(flat: &[u8]) -> Result<Self> {
        if flat.len() % 3 != 0 {
            return Err(MosaicError::Validation(format!(
                "Flat palette length must be a multiple of 3, got {}",
                flat.len()
            )));
        }
        Ok(Self::from_colors(
            flat.chunks_exact(3).map(|c| RgbColor::new(c[0], c[1], c[2])),
        ))
    }

    pub fn to_flat(&self) -> Vec<u8> {
        self.colors.iter().flat_map(|c| c.channels()).collect()
    }
}

impl From<Vec<RgbColor>> for Palette {
    fn from(colors: Vec<RgbColor>) -> Self {
        Self::from_colors(colors)
    }
}

impl From<Palette> for Vec<RgbColor> {
    fn from(palette: Palette) -> Self {
        palette.colors
    }
}

impl FromIterator<RgbColor> for Palette {
    fn from_iter<I: IntoIterator<Item = RgbColor>>(iter: I) -> Self {
        Self::from_colors(iter)
    }
}

// ============================================================================
// TESTS
// ============================================================================
