//! Text rendering for the numbers overlays
//!
//! - `BitmapDigits` - built-in 3x5 digit glyphs, needs no font files
//! - `TrueTypeText` - a TTF/OTF font loaded with `ab_glyph`
//!
//! Both draw a string centered on a point; the overlay decides where and in
//! which color.

use ab_glyph::{point, Font, FontVec, GlyphId, PxScale, Rect as GlyphRect, ScaleFont};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::Path;

use crate::error::{MosaicError, Result};

/// Draws short labels onto a mosaic.
pub trait TextRenderer: Send + Sync {
    /// Draw `text` centered on `center`; `size` is the nominal pixel height.
    fn draw_centered(&self, canvas: &mut RgbImage, text: &str, center: (f32, f32), size: u32, color: Rgb<u8>);
}

// ============================================================================
// BITMAP DIGITS
// ============================================================================

const GLYPH_WIDTH: u32 = 3;
const GLYPH_HEIGHT: u32 = 5;

/// Rows of each digit, most significant bit is the left column.
const DIGIT_GLYPHS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111], // 0
    [0b010, 0b110, 0b010, 0b010, 0b111], // 1
    [0b111, 0b001, 0b111, 0b100, 0b111], // 2
    [0b111, 0b001, 0b111, 0b001, 0b111], // 3
    [0b101, 0b101, 0b111, 0b001, 0b001], // 4
    [0b111, 0b100, 0b111, 0b001, 0b111], // 5
    [0b111, 0b100, 0b111, 0b101, 0b111], // 6
    [0b111, 0b001, 0b010, 0b010, 0b010], // 7
    [0b111, 0b101, 0b111, 0b101, 0b111], // 8
    [0b111, 0b101, 0b111, 0b001, 0b111], // 9
];

/// Blocky digits scaled in whole pixels. Characters other than `0-9` are
/// skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitmapDigits;

impl BitmapDigits {
    /// Pixel size of one glyph unit for a nominal font size.
    fn unit(size: u32) -> u32 {
        (size / 6).max(1)
    }

    /// Width and height of `digits` glyphs at `unit`, with a 1-unit gap.
    fn extent(digits: u32, unit: u32) -> (u32, u32) {
        if digits == 0 {
            return (0, 0);
        }
        let width = digits * GLYPH_WIDTH + (digits - 1);
        (width * unit, GLYPH_HEIGHT * unit)
    }
}

impl TextRenderer for BitmapDigits {
    fn draw_centered(&self, canvas: &mut RgbImage, text: &str, center: (f32, f32), size: u32, color: Rgb<u8>) {
        let glyphs: Vec<&[u8; 5]> = text
            .chars()
            .filter_map(|c| c.to_digit(10))
            .map(|d| &DIGIT_GLYPHS[d as usize])
            .collect();

        let unit = Self::unit(size);
        let (width, height) = Self::extent(glyphs.len() as u32, unit);
        if width == 0 {
            return;
        }
        let left = (center.0 - width as f32 / 2.0).round() as i32;
        let top = (center.1 - height as f32 / 2.0).round() as i32;

        for (i, glyph) in glyphs.iter().enumerate() {
            let glyph_left = left + (i as u32 * (GLYPH_WIDTH + 1) * unit) as i32;
            for (row, bits) in glyph.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if (*bits >> (GLYPH_WIDTH - 1 - col)) & 1 == 0 {
                        continue;
                    }
                    let x = glyph_left + (col * unit) as i32;
                    let y = top + (row as u32 * unit) as i32;
                    draw_filled_rect_mut(canvas, Rect::at(x, y).of_size(unit, unit), color);
                }
            }
        }
    }
}

// ============================================================================
// TRUETYPE
// ============================================================================

/// Text drawn with a TrueType/OpenType font.
pub struct TrueTypeText {
    font: FontVec,
}

impl TrueTypeText {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| {
            MosaicError::Font(format!("Cannot read font file {}: {}", path.display(), e))
        })?;
        let font = FontVec::try_from_vec(data).map_err(|e| {
            MosaicError::Font(format!("Invalid font file {}: {}", path.display(), e))
        })?;
        Ok(Self { font })
    }

    /// Union of the glyph ink boxes relative to the draw origin, laid out
    /// the way `draw_text_mut` lays them out (baseline at the ascent line).
    fn ink_bounds(&self, scale: PxScale, text: &str) -> Option<GlyphRect> {
        let font = self.font.as_scaled(scale);
        let mut caret = 0f32;
        let mut last: Option<GlyphId> = None;
        let mut bounds: Option<GlyphRect> = None;

        for c in text.chars() {
            let id = font.glyph_id(c);
            let glyph = id.with_scale_and_position(scale, point(caret, font.ascent()));
            caret += font.h_advance(id);
            let Some(outline) = font.outline_glyph(glyph) else {
                continue;
            };
            if let Some(last) = last {
                caret += font.kern(id, last);
            }
            last = Some(id);

            let bb = outline.px_bounds();
            bounds = Some(match bounds {
                Some(acc) => GlyphRect {
                    min: point(acc.min.x.min(bb.min.x), acc.min.y.min(bb.min.y)),
                    max: point(acc.max.x.max(bb.max.x), acc.max.y.max(bb.max.y)),
                },
                None => bb,
            });
        }
        bounds
    }

    /// Draw origin that puts the middle of the ink box on `center`.
    fn origin_for(&self, scale: PxScale, text: &str, center: (f32, f32)) -> Option<(i32, i32)> {
        let bb = self.ink_bounds(scale, text)?;
        let x = center.0 - (bb.min.x + bb.max.x) / 2.0;
        let y = center.1 - (bb.min.y + bb.max.y) / 2.0;
        Some((x.round() as i32, y.round() as i32))
    }
}

impl TextRenderer for TrueTypeText {
    fn draw_centered(&self, canvas: &mut RgbImage, text: &str, center: (f32, f32), size: u32, color: Rgb<u8>) {
        let scale = PxScale::from(size as f32);
        // Nothing to draw when no character has an outline
        if let Some((x, y)) = self.origin_for(scale, text, center) {
            draw_text_mut(canvas, color, x, y, scale, &self.font, text);
        }
    }
}

/// Renderer for an optional font path: the font when given, digits otherwise.
pub fn renderer_for(font_path: Option<&Path>) -> Result<Box<dyn TextRenderer>> {
    match font_path {
        Some(path) => {
            log::debug!("Loading font {}", path.display());
            Ok(Box::new(TrueTypeText::load(path)?))
        }
        None => Ok(Box::new(BitmapDigits)),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

    fn painted(canvas: &RgbImage) -> Vec<(u32, u32)> {
        canvas
            .enumerate_pixels()
            .filter(|(_, _, p)| **p == BLACK)
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    #[test]
    fn test_digit_is_centered() {
        let mut canvas = RgbImage::from_pixel(20, 20, WHITE);
        // size 12 -> unit 2 -> glyph is 6x10
        BitmapDigits.draw_centered(&mut canvas, "8", (10.0, 10.0), 12, BLACK);

        let pixels = painted(&canvas);
        let min_x = pixels.iter().map(|p| p.0).min().unwrap();
        let max_x = pixels.iter().map(|p| p.0).max().unwrap();
        let min_y = pixels.iter().map(|p| p.1).min().unwrap();
        let max_y = pixels.iter().map(|p| p.1).max().unwrap();
        assert_eq!((min_x, max_x), (7, 12));
        assert_eq!((min_y, max_y), (5, 14));
    }

    #[test]
    fn test_digits_differ() {
        let mut one = RgbImage::from_pixel(12, 12, WHITE);
        let mut seven = RgbImage::from_pixel(12, 12, WHITE);
        BitmapDigits.draw_centered(&mut one, "1", (6.0, 6.0), 6, BLACK);
        BitmapDigits.draw_centered(&mut seven, "7", (6.0, 6.0), 6, BLACK);
        assert_ne!(painted(&one), painted(&seven));
    }

    #[test]
    fn test_clipped_at_canvas_edge() {
        // Text larger than the canvas must not panic
        let mut canvas = RgbImage::from_pixel(4, 4, WHITE);
        BitmapDigits.draw_centered(&mut canvas, "123", (0.0, 0.0), 48, BLACK);
        assert!(!painted(&canvas).is_empty());
    }

    #[test]
    fn test_non_digits_skipped() {
        let mut canvas = RgbImage::from_pixel(8, 8, WHITE);
        BitmapDigits.draw_centered(&mut canvas, "ab", (4.0, 4.0), 6, BLACK);
        assert!(painted(&canvas).is_empty());
    }

    #[test]
    fn test_missing_font_is_font_error() {
        let result = TrueTypeText::load(Path::new("/nonexistent/font.ttf"));
        assert!(matches!(result, Err(MosaicError::Font(ref msg)) if msg.contains("/nonexistent/font.ttf")));
    }

    #[test]
    fn test_invalid_font_is_font_error() {
        let path = std::env::temp_dir().join("pixel_mosaic_not_a_font.ttf");
        std::fs::write(&path, b"definitely not a font").unwrap();
        let result = TrueTypeText::load(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(MosaicError::Font(_))));
    }

    const FONT_CANDIDATES: [&str; 4] = [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/Library/Fonts/Arial.ttf",
    ];

    fn system_font() -> Option<TrueTypeText> {
        FONT_CANDIDATES
            .iter()
            .find_map(|path| TrueTypeText::load(Path::new(path)).ok())
    }

    /// Center of the dark-pixel bounding box, in continuous coordinates.
    fn ink_center(canvas: &RgbImage) -> (f32, f32) {
        let ink: Vec<(u32, u32)> = canvas
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] < 128)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert!(!ink.is_empty(), "nothing was drawn");
        let min_x = ink.iter().map(|p| p.0).min().unwrap() as f32;
        let max_x = ink.iter().map(|p| p.0).max().unwrap() as f32;
        let min_y = ink.iter().map(|p| p.1).min().unwrap() as f32;
        let max_y = ink.iter().map(|p| p.1).max().unwrap() as f32;
        ((min_x + max_x + 1.0) / 2.0, (min_y + max_y + 1.0) / 2.0)
    }

    #[test]
    fn test_truetype_ink_is_centered() {
        let Some(font) = system_font() else {
            eprintln!("no system font found, skipping");
            return;
        };
        for (text, size) in [("8", 24), ("10", 24), ("7", 12)] {
            let mut canvas = RgbImage::from_pixel(60, 60, WHITE);
            font.draw_centered(&mut canvas, text, (30.0, 30.0), size, BLACK);
            let (cx, cy) = ink_center(&canvas);
            assert!((cx - 30.0).abs() <= 1.0, "{:?} at {}: ink center x {}", text, size, cx);
            assert!((cy - 30.0).abs() <= 1.0, "{:?} at {}: ink center y {}", text, size, cy);
        }
    }

    #[test]
    fn test_truetype_blank_text_draws_nothing() {
        let Some(font) = system_font() else {
            return;
        };
        let mut canvas = RgbImage::from_pixel(20, 20, WHITE);
        font.draw_centered(&mut canvas, " ", (10.0, 10.0), 12, BLACK);
        assert!(painted(&canvas).is_empty());
    }

    #[test]
    fn test_renderer_without_font() {
        assert!(renderer_for(None).is_ok());
    }
}
