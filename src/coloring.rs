//! Coloring strategies
//!
//! Five interchangeable ways to turn a source photo into a block mosaic of
//! `cell_width * multiplier` by `cell_height * multiplier` pixels:
//!
//! | Method | Colors | Pipeline |
//! |---|---|---|
//! | `QuantizeThenResize` | count | median cut -> majority downscale -> magnify |
//! | `ResizeThenQuantize` | count | box downscale -> median cut -> magnify |
//! | `ClusterPixelate` | count | clustering quantizer (downscale + fit + assign) -> magnify |
//! | `PaletteDirect` | palette | nearest color on padded table -> majority downscale -> magnify |
//! | `PaletteClustering` | palette | clustering quantizer with fixed palette -> magnify |
//!
//! Quantizing before downscaling lets dominant colors survive; downscaling
//! first blends neighbours before the quantizer sees them.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::color::RgbColor;
use crate::error::{MosaicError, Result};
use crate::palette::Palette;
use crate::params::{CellGrid, ColorSpec};
use crate::quantize::{MedianCutQuantizer, PaletteTarget, Quantizer};
use crate::resample::{box_downscale, magnify, majority_downscale};

/// Size of the indexed color table a fixed palette is padded to.
pub const INDEXED_TABLE_SIZE: usize = 255;

/// Collaborators a strategy may call into.
pub struct ColoringContext<'a> {
    /// Clustering quantizer for the pixelation strategies.
    pub quantizer: &'a dyn Quantizer,
    pub cancel: &'a CancellationToken,
}

pub trait ColoringStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn colorize(
        &self,
        ctx: &ColoringContext<'_>,
        image: &RgbImage,
        colors: &ColorSpec,
        grid: CellGrid,
    ) -> Result<RgbImage>;
}

/// Selector stored in `MosaicParameters`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColoringMethod {
    QuantizeThenResize,
    ResizeThenQuantize,
    ClusterPixelate,
    PaletteDirect,
    PaletteClustering,
}

impl ColoringMethod {
    pub const ALL: [ColoringMethod; 5] = [
        ColoringMethod::QuantizeThenResize,
        ColoringMethod::ResizeThenQuantize,
        ColoringMethod::ClusterPixelate,
        ColoringMethod::PaletteDirect,
        ColoringMethod::PaletteClustering,
    ];

    /// Whether the method takes an explicit palette rather than a color count.
    pub fn uses_palette(self) -> bool {
        matches!(self, ColoringMethod::PaletteDirect | ColoringMethod::PaletteClustering)
    }

    pub fn strategy(self) -> &'static dyn ColoringStrategy {
        match self {
            ColoringMethod::QuantizeThenResize => &QuantizeThenResize,
            ColoringMethod::ResizeThenQuantize => &ResizeThenQuantize,
            ColoringMethod::ClusterPixelate => &ClusterPixelate,
            ColoringMethod::PaletteDirect => &PaletteDirect,
            ColoringMethod::PaletteClustering => &PaletteClustering,
        }
    }
}

fn expect_count(colors: &ColorSpec, strategy: &str) -> Result<usize> {
    match colors {
        ColorSpec::Count(count) => Ok(*count),
        ColorSpec::Palette(_) => Err(MosaicError::Validation(format!(
            "{} takes a color count, not a palette",
            strategy
        ))),
    }
}

fn expect_palette<'c>(colors: &'c ColorSpec, strategy: &str) -> Result<&'c Palette> {
    match colors {
        ColorSpec::Palette(palette) => {
            palette.validate_for_mosaic()?;
            Ok(palette)
        }
        ColorSpec::Count(_) => Err(MosaicError::Validation(format!(
            "{} takes an explicit palette, not a color count",
            strategy
        ))),
    }
}

/// Indexed-color table seeded with `palette` and padded with black up to
/// `INDEXED_TABLE_SIZE` entries. Padding entries are real candidates during
/// quantization, so black is always reachable for short palettes.
pub fn indexed_template(palette: &Palette) -> Palette {
    let mut table = palette.clone();
    if table.len() < INDEXED_TABLE_SIZE {
        table.push(RgbColor::BLACK);
    }
    table
}

// ============================================================================
// COUNT-BASED STRATEGIES
// ============================================================================

pub struct QuantizeThenResize;

impl ColoringStrategy for QuantizeThenResize {
    fn name(&self) -> &'static str {
        "quantize-then-resize"
    }

    fn colorize(
        &self,
        ctx: &ColoringContext<'_>,
        image: &RgbImage,
        colors: &ColorSpec,
        grid: CellGrid,
    ) -> Result<RgbImage> {
        let count = expect_count(colors, self.name())?;
        let quantized = MedianCutQuantizer.quantize(image, &PaletteTarget::Count(count), ctx.cancel)?;
        ctx.cancel.check()?;
        let cells = majority_downscale(&quantized, grid.cell_width, grid.cell_height)?;
        magnify(&cells.to_rgb(), grid.multiplier)
    }
}

pub struct ResizeThenQuantize;

impl ColoringStrategy for ResizeThenQuantize {
    fn name(&self) -> &'static str {
        "resize-then-quantize"
    }

    fn colorize(
        &self,
        ctx: &ColoringContext<'_>,
        image: &RgbImage,
        colors: &ColorSpec,
        grid: CellGrid,
    ) -> Result<RgbImage> {
        let count = expect_count(colors, self.name())?;
        let small = box_downscale(image, grid.cell_width, grid.cell_height)?;
        ctx.cancel.check()?;
        let quantized = MedianCutQuantizer.quantize(&small, &PaletteTarget::Count(count), ctx.cancel)?;
        magnify(&quantized.to_rgb(), grid.multiplier)
    }
}

/// Downscale, fit and assign through the clustering quantizer in one pass.
fn cluster_pixelate(
    ctx: &ColoringContext<'_>,
    image: &RgbImage,
    target: &PaletteTarget,
    grid: CellGrid,
) -> Result<RgbImage> {
    let small = box_downscale(image, grid.cell_width, grid.cell_height)?;
    ctx.cancel.check()?;
    log::debug!(
        "{} quantizer on {}x{} cells",
        ctx.quantizer.name(),
        grid.cell_width,
        grid.cell_height
    );
    let quantized = ctx.quantizer.quantize(&small, target, ctx.cancel)?;
    magnify(&quantized.to_rgb(), grid.multiplier)
}

pub struct ClusterPixelate;

impl ColoringStrategy for ClusterPixelate {
    fn name(&self) -> &'static str {
        "cluster-pixelate"
    }

    fn colorize(
        &self,
        ctx: &ColoringContext<'_>,
        image: &RgbImage,
        colors: &ColorSpec,
        grid: CellGrid,
    ) -> Result<RgbImage> {
        let count = expect_count(colors, self.name())?;
        cluster_pixelate(ctx, image, &PaletteTarget::Count(count), grid)
    }
}

// ============================================================================
// PALETTE-CONSTRAINED STRATEGIES
// ============================================================================

pub struct PaletteDirect;

impl ColoringStrategy for PaletteDirect {
    fn name(&self) -> &'static str {
        "palette-direct"
    }

    fn colorize(
        &self,
        ctx: &ColoringContext<'_>,
        image: &RgbImage,
        colors: &ColorSpec,
        grid: CellGrid,
    ) -> Result<RgbImage> {
        let palette = expect_palette(colors, self.name())?;
        let template = indexed_template(palette);
        ctx.cancel.check()?;
        let quantized = MedianCutQuantizer.transform(image, &template)?;
        ctx.cancel.check()?;
        let cells = majority_downscale(&quantized, grid.cell_width, grid.cell_height)?;
        magnify(&cells.to_rgb(), grid.multiplier)
    }
}

pub struct PaletteClustering;

impl ColoringStrategy for PaletteClustering {
    fn name(&self) -> &'static str {
        "palette-clustering"
    }

    fn colorize(
        &self,
        ctx: &ColoringContext<'_>,
        image: &RgbImage,
        colors: &ColorSpec,
        grid: CellGrid,
    ) -> Result<RgbImage> {
        let palette = expect_palette(colors, self.name())?;
        cluster_pixelate(ctx, image, &PaletteTarget::Fixed(palette.clone()), grid)
    }
}

// ============================================================================
// TESTS
// ============================================================================
