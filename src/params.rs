//! Mosaic parameters
//!
//! `MosaicParameters` is validated once, at construction or deserialization,
//! and never mutated afterwards. Two parameter sets are interchangeable when
//! they compare equal, which is what the session uses to skip redundant
//! regenerations.

use serde::{Deserialize, Serialize};

use crate::coloring::ColoringMethod;
use crate::error::{MosaicError, Result};
use crate::overlay::OverlayKind;
use crate::palette::Palette;
use crate::quantize::MAX_PALETTE_SIZE;

/// Font size used for numbers when a numbers overlay does not specify one.
pub const DEFAULT_NUMBERS_SIZE: u32 = 12;

// ============================================================================
// CELL GRID
// ============================================================================

/// Logical mosaic size in cells and the magnification of each cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellGrid {
    pub cell_width: u32,
    pub cell_height: u32,
    pub multiplier: u32,
}

impl CellGrid {
    pub fn new(cell_width: u32, cell_height: u32, multiplier: u32) -> Result<Self> {
        let grid = Self {
            cell_width,
            cell_height,
            multiplier,
        };
        grid.validate()?;
        Ok(grid)
    }

    fn validate(&self) -> Result<()> {
        if self.cell_width == 0 || self.cell_height == 0 {
            return Err(MosaicError::Validation(format!(
                "Cell grid must be at least 1x1, got {}x{}",
                self.cell_width, self.cell_height
            )));
        }
        if self.multiplier == 0 {
            return Err(MosaicError::Validation("Multiplier must be at least 1".to_string()));
        }
        self.output_size()
            .map(|_| ())
            .ok_or_else(|| MosaicError::Validation("Mosaic dimensions overflow".to_string()))
    }

    fn output_size(&self) -> Option<(u32, u32)> {
        Some((
            self.cell_width.checked_mul(self.multiplier)?,
            self.cell_height.checked_mul(self.multiplier)?,
        ))
    }

    /// Pixel size of the finished mosaic.
    pub fn mosaic_size(&self) -> (u32, u32) {
        (self.cell_width * self.multiplier, self.cell_height * self.multiplier)
    }
}

impl Default for CellGrid {
    fn default() -> Self {
        Self {
            cell_width: 25,
            cell_height: 25,
            multiplier: 20,
        }
    }
}

// ============================================================================
// COLOR SPEC
// ============================================================================

/// Either an automatic color count or an explicit palette, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorSpec {
    Count(usize),
    Palette(Palette),
}

impl ColorSpec {
    pub fn is_palette(&self) -> bool {
        matches!(self, ColorSpec::Palette(_))
    }

    fn validate(&self) -> Result<()> {
        match self {
            ColorSpec::Count(count) => {
                if *count == 0 || *count > MAX_PALETTE_SIZE {
                    return Err(MosaicError::Validation(format!(
                        "Color count must be between 1 and {}, got {}",
                        MAX_PALETTE_SIZE, count
                    )));
                }
                Ok(())
            }
            ColorSpec::Palette(palette) => {
                palette.validate_for_mosaic()?;
                if palette.len() > MAX_PALETTE_SIZE {
                    return Err(MosaicError::Validation(format!(
                        "A palette holds at most {} colors, got {}",
                        MAX_PALETTE_SIZE,
                        palette.len()
                    )));
                }
                Ok(())
            }
        }
    }
}

// ============================================================================
// PARAMETERS
// ============================================================================

/// Unvalidated field set, the serialized form of `MosaicParameters`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMosaicParameters {
    #[serde(flatten)]
    pub grid: CellGrid,
    pub colors: ColorSpec,
    pub method: ColoringMethod,
    #[serde(default)]
    pub overlay: OverlayKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numbers_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMosaicParameters", into = "RawMosaicParameters")]
pub struct MosaicParameters {
    grid: CellGrid,
    colors: ColorSpec,
    method: ColoringMethod,
    overlay: OverlayKind,
    numbers_size: Option<u32>,
}

impl MosaicParameters {
    /// Validate and build a parameter set.
    ///
    /// - the method must match the color spec (count methods take a count,
    ///   palette methods take a palette of 2..=256 colors)
    /// - a numbers overlay gets `numbers_size` or `DEFAULT_NUMBERS_SIZE`;
    ///   overlays without numbers drop any size given
    pub fn new(
        grid: CellGrid,
        colors: ColorSpec,
        method: ColoringMethod,
        overlay: OverlayKind,
        numbers_size: Option<u32>,
    ) -> Result<Self> {
        grid.validate()?;
        colors.validate()?;

        if method.uses_palette() != colors.is_palette() {
            let expected = if method.uses_palette() { "an explicit palette" } else { "a color count" };
            return Err(MosaicError::Validation(format!(
                "Coloring method {:?} requires {}",
                method, expected
            )));
        }

        let numbers_size = if overlay.draws_numbers() {
            let size = numbers_size.unwrap_or(DEFAULT_NUMBERS_SIZE);
            if size == 0 {
                return Err(MosaicError::Validation("Numbers size must be at least 1".to_string()));
            }
            Some(size)
        } else {
            None
        };

        Ok(Self {
            grid,
            colors,
            method,
            overlay,
            numbers_size,
        })
    }

    pub fn builder() -> MosaicParametersBuilder {
        MosaicParametersBuilder::default()
    }

    /// Builder seeded with this parameter set, for deriving a variant.
    pub fn to_builder(&self) -> MosaicParametersBuilder {
        MosaicParametersBuilder {
            grid: self.grid,
            colors: self.colors.clone(),
            method: self.method,
            overlay: self.overlay,
            numbers_size: self.numbers_size,
        }
    }

    pub fn grid(&self) -> CellGrid {
        self.grid
    }

    pub fn cell_width(&self) -> u32 {
        self.grid.cell_width
    }

    pub fn cell_height(&self) -> u32 {
        self.grid.cell_height
    }

    pub fn multiplier(&self) -> u32 {
        self.grid.multiplier
    }

    pub fn colors(&self) -> &ColorSpec {
        &self.colors
    }

    pub fn method(&self) -> ColoringMethod {
        self.method
    }

    pub fn overlay(&self) -> OverlayKind {
        self.overlay
    }

    /// Present exactly when the overlay draws numbers.
    pub fn numbers_size(&self) -> Option<u32> {
        self.numbers_size
    }
}

impl Default for MosaicParameters {
    fn default() -> Self {
        Self {
            grid: CellGrid::default(),
            colors: ColorSpec::Count(6),
            method: ColoringMethod::QuantizeThenResize,
            overlay: OverlayKind::None,
            numbers_size: None,
        }
    }
}

impl TryFrom<RawMosaicParameters> for MosaicParameters {
    type Error = MosaicError;

    fn try_from(raw: RawMosaicParameters) -> Result<Self> {
        Self::new(raw.grid, raw.colors, raw.method, raw.overlay, raw.numbers_size)
    }
}

impl From<MosaicParameters> for RawMosaicParameters {
    fn from(params: MosaicParameters) -> Self {
        Self {
            grid: params.grid,
            colors: params.colors,
            method: params.method,
            overlay: params.overlay,
            numbers_size: params.numbers_size,
        }
    }
}

// ============================================================================
// BUILDER
// ============================================================================

#[derive(Debug, Clone)]
pub struct MosaicParametersBuilder {
    grid: CellGrid,
    colors: ColorSpec,
    method: ColoringMethod,
    overlay: OverlayKind,
    numbers_size: Option<u32>,
}

impl Default for MosaicParametersBuilder {
    fn default() -> Self {
        MosaicParameters::default().to_builder()
    }
}

impl MosaicParametersBuilder {
    pub fn cells(mut self, cell_width: u32, cell_height: u32) -> Self {
        self.grid.cell_width = cell_width;
        self.grid.cell_height = cell_height;
        self
    }

    pub fn multiplier(mut self, multiplier: u32) -> Self {
        self.grid.multiplier = multiplier;
        self
    }

    pub fn color_count(mut self, count: usize) -> Self {
        self.colors = ColorSpec::Count(count);
        self
    }

    pub fn palette(mut self, palette: Palette) -> Self {
        self.colors = ColorSpec::Palette(palette);
        self
    }

    pub fn method(mut self, method: ColoringMethod) -> Self {
        self.method = method;
        self
    }

    pub fn overlay(mut self, overlay: OverlayKind) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn numbers_size(mut self, size: Option<u32>) -> Self {
        self.numbers_size = size;
        self
    }

    pub fn build(self) -> Result<MosaicParameters> {
        MosaicParameters::new(self.grid, self.colors, self.method, self.overlay, self.numbers_size)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::RgbColor;

    fn two_colors() -> Palette {
        Palette::from_colors([RgbColor::BLACK, RgbColor::WHITE])
    }

    #[test]
    fn test_default_is_valid() {
        let params = MosaicParameters::builder().build().unwrap();
        assert_eq!(params, MosaicParameters::default());
        assert_eq!(params.grid().mosaic_size(), (500, 500));
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        for (w, h, m) in [(0, 2, 1), (2, 0, 1), (2, 2, 0)] {
            let result = MosaicParameters::builder().cells(w, h).multiplier(m).build();
            assert!(matches!(result, Err(MosaicError::Validation(_))));
        }
    }

    #[test]
    fn test_method_must_match_color_spec() {
        let result = MosaicParameters::builder()
            .palette(two_colors())
            .method(ColoringMethod::QuantizeThenResize)
            .build();
        assert!(matches!(result, Err(MosaicError::Validation(_))));

        let result = MosaicParameters::builder()
            .color_count(4)
            .method(ColoringMethod::PaletteDirect)
            .build();
        assert!(matches!(result, Err(MosaicError::Validation(_))));

        let ok = MosaicParameters::builder()
            .palette(two_colors())
            .method(ColoringMethod::PaletteClustering)
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn test_single_color_palette_rejected() {
        let result = MosaicParameters::builder()
            .palette(Palette::from_colors([RgbColor::BLACK]))
            .method(ColoringMethod::PaletteDirect)
            .build();
        assert!(matches!(result, Err(MosaicError::Validation(_))));
    }

    #[test]
    fn test_numbers_size_defaults_and_drops() {
        let numbers = MosaicParameters::builder()
            .overlay(OverlayKind::Numbers)
            .build()
            .unwrap();
        assert_eq!(numbers.numbers_size(), Some(DEFAULT_NUMBERS_SIZE));

        let grid = MosaicParameters::builder()
            .overlay(OverlayKind::Grid)
            .numbers_size(Some(30))
            .build()
            .unwrap();
        assert_eq!(grid.numbers_size(), None);
    }

    #[test]
    fn test_value_equality() {
        let a = MosaicParameters::builder().cells(10, 12).build().unwrap();
        let b = MosaicParameters::builder().cells(10, 12).build().unwrap();
        let c = a.to_builder().multiplier(3).build().unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_serde_roundtrip_validates() {
        let params = MosaicParameters::builder()
            .palette(two_colors())
            .method(ColoringMethod::PaletteDirect)
            .overlay(OverlayKind::GridAndNumbers)
            .numbers_size(Some(9))
            .build()
            .unwrap();
        let json = serde_json::to_string(&params).unwrap();
        let back: MosaicParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(params, back);

        let invalid = r#"{"cell_width": 4, "cell_height": 4, "multiplier": 0,
                          "colors": {"count": 3}, "method": "quantize_then_resize"}"#;
        assert!(serde_json::from_str::<MosaicParameters>(invalid).is_err());
    }
}
