//! Color quantization
//!
//! The `Quantizer` capability reduces an image to a small palette:
//! - `fit` chooses the palette (or accepts a fixed one)
//! - `transform` maps every pixel to its nearest palette entry
//!
//! Two implementations ship with the crate:
//! - `MedianCutQuantizer` - automatic quantization for the count-based strategies
//! - `KmeansQuantizer` - the clustering quantizer used by the pixelation strategies
//!
//! Quantizer output is an `IndexedImage`, a raster of palette indices.

pub mod kmeans;
pub mod median_cut;

use image::RgbImage;
use palette::Lab;
use rayon::prelude::*;
use std::collections::HashMap;

use crate::cancel::CancellationToken;
use crate::color::RgbColor;
use crate::error::{MosaicError, Result};
use crate::palette::Palette;

pub use kmeans::{ColorSpace, KmeansQuantizer, KmeansSettings};
pub use median_cut::MedianCutQuantizer;

/// Indexed rasters store `u8` indices.
pub const MAX_PALETTE_SIZE: usize = 256;

// ============================================================================
// INDEXED IMAGE
// ============================================================================

/// A raster of indices into a color table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedImage {
    width: u32,
    height: u32,
    palette: Palette,
    indices: Vec<u8>,
}

impl IndexedImage {
    pub fn new(width: u32, height: u32, palette: Palette, indices: Vec<u8>) -> Result<Self> {
        if indices.len() != (width as usize) * (height as usize) {
            return Err(MosaicError::Processing(format!(
                "Indexed image {}x{} needs {} indices, got {}",
                width,
                height,
                width as usize * height as usize,
                indices.len()
            )));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= palette.len()) {
            return Err(MosaicError::Processing(format!(
                "Index {} out of range for a {}-color table",
                bad,
                palette.len()
            )));
        }
        Ok(Self {
            width,
            height,
            palette,
            indices,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn indices(&self) -> &[u8] {
        &self.indices
    }

    pub fn index_at(&self, x: u32, y: u32) -> u8 {
        self.indices[(y * self.width + x) as usize]
    }

    pub fn color_at(&self, x: u32, y: u32) -> RgbColor {
        self.palette.colors()[self.index_at(x, y) as usize]
    }

    /// Expand indices back to an RGB raster.
    pub fn to_rgb(&self) -> RgbImage {
        let colors = self.palette.colors();
        let raw: Vec<u8> = self
            .indices
            .iter()
            .flat_map(|&i| colors[i as usize].channels())
            .collect();
        // Length is width * height * 3 by construction
        RgbImage::from_raw(self.width, self.height, raw)
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }
}

// ============================================================================
// QUANTIZER CAPABILITY
// ============================================================================

/// What a quantizer should fit to.
#[derive(Debug, Clone, PartialEq)]
pub enum PaletteTarget {
    /// Choose up to this many representative colors.
    Count(usize),
    /// Use exactly these colors.
    Fixed(Palette),
}

impl PaletteTarget {
    fn validate(&self) -> Result<()> {
        let size = match self {
            PaletteTarget::Count(count) => *count,
            PaletteTarget::Fixed(palette) => palette.len(),
        };
        if size == 0 || size > MAX_PALETTE_SIZE {
            return Err(MosaicError::Validation(format!(
                "Palette size must be between 1 and {}, got {}",
                MAX_PALETTE_SIZE, size
            )));
        }
        Ok(())
    }
}

pub trait Quantizer: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Choose a palette for `image`. A `Fixed` target is returned unchanged.
    fn fit(
        &self,
        image: &RgbImage,
        target: &PaletteTarget,
        cancel: &CancellationToken,
    ) -> Result<Palette>;

    /// Map every pixel of `image` to its nearest entry of `palette`.
    fn transform(&self, image: &RgbImage, palette: &Palette) -> Result<IndexedImage>;

    fn quantize(
        &self,
        image: &RgbImage,
        target: &PaletteTarget,
        cancel: &CancellationToken,
    ) -> Result<IndexedImage> {
        let palette = self.fit(image, target, cancel)?;
        cancel.check()?;
        self.transform(image, &palette)
    }
}

// ============================================================================
// NEAREST-COLOR REMAPPING
// ============================================================================

/// Distance used when matching pixels to palette entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMetric {
    Rgb,
    Lab,
}

fn lab_distance_sq(a: &Lab, b: &Lab) -> f32 {
    let dl = a.l - b.l;
    let da = a.a - b.a;
    let db = a.b - b.b;
    dl * dl + da * da + db * db
}

/// Index of the nearest palette color; ties keep the lowest index.
fn nearest_index(color: RgbColor, palette: &[RgbColor], labs: &[Lab], metric: ColorMetric) -> u8 {
    let mut best = 0usize;
    match metric {
        ColorMetric::Rgb => {
            let mut best_distance = u32::MAX;
            for (i, &candidate) in palette.iter().enumerate() {
                let distance = color.distance_sq(candidate);
                if distance < best_distance {
                    best_distance = distance;
                    best = i;
                    if distance == 0 {
                        break;
                    }
                }
            }
        }
        ColorMetric::Lab => {
            let lab = color.to_lab();
            let mut best_distance = f32::MAX;
            for (i, candidate) in labs.iter().enumerate() {
                let distance = lab_distance_sq(&lab, candidate);
                if distance < best_distance {
                    best_distance = distance;
                    best = i;
                }
            }
        }
    }
    best as u8
}

/// Map every pixel to the nearest palette color, rows in parallel with a
/// per-row cache of already matched colors.
pub fn remap_nearest(image: &RgbImage, palette: &Palette, metric: ColorMetric) -> Result<IndexedImage> {
    if palette.is_empty() || palette.len() > MAX_PALETTE_SIZE {
        return Err(MosaicError::Validation(format!(
            "Cannot remap onto a {}-color palette",
            palette.len()
        )));
    }

    let (width, height) = image.dimensions();
    let colors = palette.colors();
    let labs: Vec<Lab> = match metric {
        ColorMetric::Lab => colors.iter().map(|c| c.to_lab()).collect(),
        ColorMetric::Rgb => Vec::new(),
    };

    let rows: Vec<Vec<u8>> = (0..height)
        .into_par_iter()
        .map(|y| {
            let mut cache: HashMap<RgbColor, u8> = HashMap::new();
            (0..width)
                .map(|x| {
                    let color = RgbColor::from(*image.get_pixel(x, y));
                    *cache
                        .entry(color)
                        .or_insert_with(|| nearest_index(color, colors, &labs, metric))
                })
                .collect()
        })
        .collect();

    IndexedImage::new(width, height, palette.clone(), rows.concat())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn two_color_palette() -> Palette {
        Palette::from_colors([RgbColor::BLACK, RgbColor::WHITE])
    }

    #[test]
    fn test_remap_rgb_picks_nearest() {
        let mut img = RgbImage::from_pixel(2, 2, Rgb([10, 10, 10]));
        img.put_pixel(1, 1, Rgb([240, 250, 200]));

        let indexed = remap_nearest(&img, &two_color_palette(), ColorMetric::Rgb).unwrap();
        assert_eq!(indexed.indices(), &[0, 0, 0, 1]);
        assert_eq!(indexed.color_at(1, 1), RgbColor::WHITE);
    }

    #[test]
    fn test_remap_lab_picks_nearest() {
        let palette = Palette::from_colors([RgbColor::new(255, 0, 0), RgbColor::new(0, 0, 255)]);
        let img = RgbImage::from_pixel(1, 1, Rgb([200, 30, 40]));
        let indexed = remap_nearest(&img, &palette, ColorMetric::Lab).unwrap();
        assert_eq!(indexed.indices(), &[0]);
    }

    #[test]
    fn test_indexed_to_rgb() {
        let indexed = IndexedImage::new(2, 1, two_color_palette(), vec![1, 0]).unwrap();
        let rgb = indexed.to_rgb();
        assert_eq!(*rgb.get_pixel(0, 0), Rgb([255, 255, 255]));
        assert_eq!(*rgb.get_pixel(1, 0), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_indexed_rejects_bad_indices() {
        assert!(IndexedImage::new(2, 1, two_color_palette(), vec![0]).is_err());
        assert!(IndexedImage::new(1, 1, two_color_palette(), vec![2]).is_err());
    }

    #[test]
    fn test_palette_target_bounds() {
        assert!(PaletteTarget::Count(0).validate().is_err());
        assert!(PaletteTarget::Count(257).validate().is_err());
        assert!(PaletteTarget::Count(8).validate().is_ok());
    }
}
