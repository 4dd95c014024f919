//! Overlays drawn on top of a finished mosaic
//!
//! - Grid: 1px black outline around every cell
//! - Numbers: each cell labelled with its color's number in the distribution
//! - Grid + numbers: grid first, numbers on top
//! - Print layout: grid and black numbers on a white canvas, for painting by
//!   number
//!
//! Cell colors are always read from the untouched mosaic, so drawing the grid
//! first never changes which number a cell gets.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};

use crate::color::RgbColor;
use crate::distribution::ColorDistribution;
use crate::error::{MosaicError, Result};
use crate::params::DEFAULT_NUMBERS_SIZE;
use crate::text::TextRenderer;

const OUTLINE: Rgb<u8> = Rgb([0, 0, 0]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayKind {
    #[default]
    None,
    Grid,
    Numbers,
    GridAndNumbers,
    GridAndNumbersNoColor,
}

impl OverlayKind {
    pub const ALL: [OverlayKind; 5] = [
        OverlayKind::None,
        OverlayKind::Grid,
        OverlayKind::Numbers,
        OverlayKind::GridAndNumbers,
        OverlayKind::GridAndNumbersNoColor,
    ];

    pub fn draws_numbers(self) -> bool {
        matches!(
            self,
            OverlayKind::Numbers | OverlayKind::GridAndNumbers | OverlayKind::GridAndNumbersNoColor
        )
    }

    /// `None` for the plain mosaic.
    pub fn strategy(self) -> Option<&'static dyn OverlayStrategy> {
        match self {
            OverlayKind::None => None,
            OverlayKind::Grid => Some(&GridOverlay),
            OverlayKind::Numbers => Some(&NumbersOverlay),
            OverlayKind::GridAndNumbers => Some(&GridAndNumbersOverlay),
            OverlayKind::GridAndNumbersNoColor => Some(&PrintLayoutOverlay),
        }
    }
}

pub trait OverlayStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(
        &self,
        mosaic: &RgbImage,
        distribution: &ColorDistribution,
        multiplier: u32,
        numbers_size: Option<u32>,
        text: &dyn TextRenderer,
    ) -> Result<RgbImage>;
}

// ============================================================================
// CELL GEOMETRY
// ============================================================================

/// A labelled cell: top-left corner and 1-based color number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellLabel {
    pub x: u32,
    pub y: u32,
    pub number: usize,
    pub color: RgbColor,
}

fn check_multiplier(multiplier: u32) -> Result<usize> {
    if multiplier == 0 {
        return Err(MosaicError::Validation("Multiplier must be at least 1".to_string()));
    }
    Ok(multiplier as usize)
}

/// Outline every cell. Interior edges are shared by neighbours; the outer
/// right and bottom edges are pulled in by one pixel so they stay on canvas.
pub fn draw_grid(canvas: &mut RgbImage, multiplier: u32) -> Result<()> {
    let step = check_multiplier(multiplier)?;
    let (width, height) = canvas.dimensions();

    for x in (0..width).step_by(step) {
        let rect_width = if x + multiplier >= width { multiplier } else { multiplier + 1 };
        for y in (0..height).step_by(step) {
            let rect_height = if y + multiplier >= height { multiplier } else { multiplier + 1 };
            let rect = Rect::at(x as i32, y as i32).of_size(rect_width, rect_height);
            draw_hollow_rect_mut(canvas, rect, OUTLINE);
        }
    }
    Ok(())
}

/// Number every cell of `mosaic` from `distribution`.
///
/// Fails with `InternalConsistency` when a cell color is missing, which only
/// happens if the distribution was computed from a different image.
pub fn cell_labels(
    mosaic: &RgbImage,
    distribution: &ColorDistribution,
    multiplier: u32,
) -> Result<Vec<CellLabel>> {
    let step = check_multiplier(multiplier)?;
    let (width, height) = mosaic.dimensions();

    let mut labels = Vec::new();
    for x in (0..width).step_by(step) {
        for y in (0..height).step_by(step) {
            let color = RgbColor::from(*mosaic.get_pixel(x, y));
            let number = match distribution.index_of(color) {
                Some(number) => number,
                None => {
                    log::error!(
                        "Cell ({}, {}) color {} is missing from a distribution of {} colors",
                        x,
                        y,
                        color,
                        distribution.len()
                    );
                    return Err(MosaicError::InternalConsistency { color, x, y });
                }
            };
            labels.push(CellLabel { x, y, number, color });
        }
    }
    Ok(labels)
}

fn draw_numbers(
    canvas: &mut RgbImage,
    labels: &[CellLabel],
    multiplier: u32,
    size: u32,
    text: &dyn TextRenderer,
    fixed_color: Option<Rgb<u8>>,
) {
    let half = multiplier as f32 / 2.0;
    for label in labels {
        let color = fixed_color.unwrap_or(if label.color.is_light() {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        });
        let center = (label.x as f32 + half, label.y as f32 + half);
        text.draw_centered(canvas, &label.number.to_string(), center, size, color);
    }
}

// ============================================================================
// STRATEGIES
// ============================================================================

pub struct GridOverlay;

impl OverlayStrategy for GridOverlay {
    fn name(&self) -> &'static str {
        "grid"
    }

    fn apply(
        &self,
        mosaic: &RgbImage,
        _distribution: &ColorDistribution,
        multiplier: u32,
        _numbers_size: Option<u32>,
        _text: &dyn TextRenderer,
    ) -> Result<RgbImage> {
        let mut canvas = mosaic.clone();
        draw_grid(&mut canvas, multiplier)?;
        Ok(canvas)
    }
}

pub struct NumbersOverlay;

impl OverlayStrategy for NumbersOverlay {
    fn name(&self) -> &'static str {
        "numbers"
    }

    fn apply(
        &self,
        mosaic: &RgbImage,
        distribution: &ColorDistribution,
        multiplier: u32,
        numbers_size: Option<u32>,
        text: &dyn TextRenderer,
    ) -> Result<RgbImage> {
        let labels = cell_labels(mosaic, distribution, multiplier)?;
        let mut canvas = mosaic.clone();
        let size = numbers_size.unwrap_or(DEFAULT_NUMBERS_SIZE);
        draw_numbers(&mut canvas, &labels, multiplier, size, text, None);
        Ok(canvas)
    }
}

pub struct GridAndNumbersOverlay;

impl OverlayStrategy for GridAndNumbersOverlay {
    fn name(&self) -> &'static str {
        "grid-and-numbers"
    }

    fn apply(
        &self,
        mosaic: &RgbImage,
        distribution: &ColorDistribution,
        multiplier: u32,
        numbers_size: Option<u32>,
        text: &dyn TextRenderer,
    ) -> Result<RgbImage> {
        let labels = cell_labels(mosaic, distribution, multiplier)?;
        let mut canvas = mosaic.clone();
        draw_grid(&mut canvas, multiplier)?;
        let size = numbers_size.unwrap_or(DEFAULT_NUMBERS_SIZE);
        draw_numbers(&mut canvas, &labels, multiplier, size, text, None);
        Ok(canvas)
    }
}

/// Grid and black numbers on white, the colors left to the painter.
pub struct PrintLayoutOverlay;

impl OverlayStrategy for PrintLayoutOverlay {
    fn name(&self) -> &'static str {
        "print-layout"
    }

    fn apply(
        &self,
        mosaic: &RgbImage,
        distribution: &ColorDistribution,
        multiplier: u32,
        numbers_size: Option<u32>,
        text: &dyn TextRenderer,
    ) -> Result<RgbImage> {
        let labels = cell_labels(mosaic, distribution, multiplier)?;
        let (width, height) = mosaic.dimensions();
        let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
        draw_grid(&mut canvas, multiplier)?;
        let size = numbers_size.unwrap_or(DEFAULT_NUMBERS_SIZE);
        draw_numbers(&mut canvas, &labels, multiplier, size, text, Some(Rgb([0, 0, 0])));
        Ok(canvas)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resample::magnify;
    use crate::text::BitmapDigits;

    const RED: Rgb<u8> = Rgb([255, 0, 0]);
    const NAVY: Rgb<u8> = Rgb([0, 0, 100]);
    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

    /// 2x2 cells at multiplier 10: red, navy on top, navy, red below.
    fn checker() -> RgbImage {
        let cells = RgbImage::from_fn(2, 2, |x, y| if (x + y) % 2 == 0 { RED } else { NAVY });
        magnify(&cells, 10).unwrap()
    }

    fn apply(kind: OverlayKind, mosaic: &RgbImage) -> Result<RgbImage> {
        let distribution = ColorDistribution::compute(mosaic, 10)?;
        kind.strategy()
            .unwrap()
            .apply(mosaic, &distribution, 10, Some(12), &BitmapDigits)
    }

    #[test]
    fn test_grid_outlines() {
        let mosaic = checker();
        let out = apply(OverlayKind::Grid, &mosaic).unwrap();
        assert_eq!(out.dimensions(), (20, 20));

        // Shared interior edge at x = 10, outer edges at 0 and 19
        for y in 0..20 {
            assert_eq!(*out.get_pixel(0, y), OUTLINE);
            assert_eq!(*out.get_pixel(10, y), OUTLINE);
            assert_eq!(*out.get_pixel(19, y), OUTLINE);
        }
        // Interior of a cell keeps its color
        assert_eq!(*out.get_pixel(5, 5), RED);
        assert_eq!(*out.get_pixel(15, 5), NAVY);
    }

    #[test]
    fn test_last_cell_is_inset() {
        // Bottom-right cell spans 10..20; its outline ends on 19, not 20
        let mosaic = checker();
        let out = apply(OverlayKind::Grid, &mosaic).unwrap();
        assert_eq!(*out.get_pixel(19, 19), OUTLINE);
        assert_eq!(*out.get_pixel(18, 18), RED);
    }

    #[test]
    fn test_corner_pixel_single_outline() {
        let mut canvas = RgbImage::from_pixel(30, 30, WHITE);
        draw_grid(&mut canvas, 10).unwrap();
        // Row 1 only crosses vertical edges: 0, 10, 20 and the inset 29
        let dark: Vec<u32> = (0..30).filter(|&x| *canvas.get_pixel(x, 1) == OUTLINE).collect();
        assert_eq!(dark, vec![0, 10, 20, 29]);
    }

    #[test]
    fn test_numbers_match_distribution() {
        let mosaic = checker();
        let distribution = ColorDistribution::compute(&mosaic, 10).unwrap();
        let labels = cell_labels(&mosaic, &distribution, 10).unwrap();

        assert_eq!(labels.len(), 4);
        for label in &labels {
            assert!(label.number >= 1 && label.number <= distribution.len());
            assert_eq!(Some(label.number), distribution.index_of(label.color));
        }
        // Red is seen first at (0, 0)
        assert_eq!(labels[0].number, 1);
        assert_eq!(labels[1], CellLabel { x: 0, y: 10, number: 2, color: RgbColor::from(NAVY) });
    }

    #[test]
    fn test_number_text_contrast() {
        let mosaic = checker();
        let out = apply(OverlayKind::Numbers, &mosaic).unwrap();
        // Red is light: black text inside the red cell, no white
        let red_cell: Vec<Rgb<u8>> = (0..10).flat_map(|y| (0..10).map(move |x| (x, y)))
            .map(|(x, y)| *out.get_pixel(x, y))
            .collect();
        assert!(red_cell.contains(&Rgb([0, 0, 0])));
        assert!(!red_cell.contains(&WHITE));
        // Navy is dark: white text
        let navy_cell: Vec<Rgb<u8>> = (0..10).flat_map(|y| (10..20).map(move |x| (x, y)))
            .map(|(x, y)| *out.get_pixel(x, y))
            .collect();
        assert!(navy_cell.contains(&WHITE));
    }

    #[test]
    fn test_print_layout_is_white() {
        let mosaic = checker();
        let out = apply(OverlayKind::GridAndNumbersNoColor, &mosaic).unwrap();
        assert!(out.pixels().all(|p| *p == WHITE || *p == OUTLINE));
        assert_eq!(*out.get_pixel(10, 3), OUTLINE);
    }

    #[test]
    fn test_missing_color_is_consistency_error() {
        let mosaic = checker();
        let other = RgbImage::from_pixel(20, 20, RED);
        let distribution = ColorDistribution::compute(&other, 10).unwrap();
        let result = NumbersOverlay.apply(&mosaic, &distribution, 10, None, &BitmapDigits);
        match result {
            Err(MosaicError::InternalConsistency { color, x, y }) => {
                assert_eq!(color, RgbColor::from(NAVY));
                assert_eq!((x, y), (0, 10));
            }
            other => panic!("expected consistency error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_none_has_no_strategy() {
        assert!(OverlayKind::None.strategy().is_none());
        assert!(!OverlayKind::Grid.draws_numbers());
        assert!(OverlayKind::GridAndNumbersNoColor.draws_numbers());
    }
}
