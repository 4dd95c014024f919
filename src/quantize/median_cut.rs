//! Median cut quantizer
//!
//! Automatic palette selection for the count-based strategies. Boxes of the
//! RGB histogram are split at the pixel-weighted median of their widest
//! channel until the requested number of colors is reached; each box
//! contributes its weighted average color.

use image::RgbImage;
use std::collections::HashMap;

use super::{remap_nearest, ColorMetric, IndexedImage, PaletteTarget, Quantizer};
use crate::cancel::CancellationToken;
use crate::color::RgbColor;
use crate::error::{MosaicError, Result};
use crate::palette::Palette;

/// A box in RGB color space containing a range of colors.
#[derive(Clone)]
struct ColorBox {
    colors: Vec<(RgbColor, u32)>, // Color and pixel count.
    min: [u8; 3],
    max: [u8; 3],
}

impl ColorBox {
    fn new(colors: Vec<(RgbColor, u32)>) -> Self {
        let mut min = [255u8; 3];
        let mut max = [0u8; 3];

        for (color, _) in &colors {
            for (channel, value) in color.channels().into_iter().enumerate() {
                min[channel] = min[channel].min(value);
                max[channel] = max[channel].max(value);
            }
        }

        Self { colors, min, max }
    }

    fn ranges(&self) -> [u8; 3] {
        [
            self.max[0].saturating_sub(self.min[0]),
            self.max[1].saturating_sub(self.min[1]),
            self.max[2].saturating_sub(self.min[2]),
        ]
    }

    fn total_range(&self) -> u32 {
        self.ranges().iter().map(|&r| r as u32).sum()
    }

    fn widest_channel(&self) -> usize {
        let [r, g, b] = self.ranges();
        if r >= g && r >= b {
            0
        } else if g >= b {
            1
        } else {
            2
        }
    }

    /// Split along the widest channel at the pixel-weighted median.
    fn split(&mut self) -> Option<ColorBox> {
        if self.colors.len() < 2 {
            return None;
        }

        let channel = self.widest_channel();
        self.colors
            .sort_by_key(|&(color, _)| (color.channels()[channel], color));

        let total: u64 = self.colors.iter().map(|&(_, n)| n as u64).sum();
        let mut running = 0u64;
        let mut mid = self.colors.len() / 2;
        for (i, &(_, n)) in self.colors.iter().enumerate() {
            running += n as u64;
            if running * 2 >= total {
                mid = i + 1;
                break;
            }
        }
        // Both halves must keep at least one color
        let mid = mid.clamp(1, self.colors.len() - 1);

        let right = self.colors.split_off(mid);
        *self = ColorBox::new(std::mem::take(&mut self.colors));
        Some(ColorBox::new(right))
    }

    fn average_color(&self) -> RgbColor {
        let mut sums = [0u64; 3];
        let mut total = 0u64;

        for &(color, count) in &self.colors {
            for (sum, value) in sums.iter_mut().zip(color.channels()) {
                *sum += value as u64 * count as u64;
            }
            total += count as u64;
        }

        if total == 0 {
            return RgbColor::BLACK;
        }

        let channel = |sum: u64| ((sum + total / 2) / total) as u8;
        RgbColor::new(channel(sums[0]), channel(sums[1]), channel(sums[2]))
    }
}

/// Histogram of the image, sorted by color so splitting is deterministic.
fn histogram(image: &RgbImage) -> Vec<(RgbColor, u32)> {
    let mut counts: HashMap<RgbColor, u32> = HashMap::new();
    for pixel in image.pixels() {
        *counts.entry(RgbColor::from(*pixel)).or_insert(0) += 1;
    }
    let mut colors: Vec<(RgbColor, u32)> = counts.into_iter().collect();
    colors.sort_unstable();
    colors
}

/// Palette of at most `max_colors` colors by median cut.
pub fn median_cut_palette(image: &RgbImage, max_colors: usize) -> Result<Palette> {
    if max_colors == 0 {
        return Err(MosaicError::Validation(
            "Median cut needs at least one color".to_string(),
        ));
    }
    let colors = histogram(image);
    if colors.is_empty() {
        return Err(MosaicError::Validation(
            "Cannot quantize an empty image".to_string(),
        ));
    }

    let mut boxes = vec![ColorBox::new(colors)];

    while boxes.len() < max_colors {
        // Split the box with the largest range; ties go to the earliest box
        let mut largest_idx = 0usize;
        let mut largest_range = 0u32;
        for (i, color_box) in boxes.iter().enumerate() {
            let range = color_box.total_range();
            if range > largest_range {
                largest_range = range;
                largest_idx = i;
            }
        }

        if largest_range == 0 {
            break; // Every box holds a single color.
        }

        match boxes[largest_idx].split() {
            Some(new_box) => boxes.push(new_box),
            None => break,
        }
    }

    Ok(boxes.iter().map(ColorBox::average_color).collect())
}

/// Automatic quantizer used by the quantize/resize strategies.
#[derive(Debug, Clone, Copy, Default)]
pub struct MedianCutQuantizer;

impl Quantizer for MedianCutQuantizer {
    fn name(&self) -> &'static str {
        "median-cut"
    }

    fn fit(
        &self,
        image: &RgbImage,
        target: &PaletteTarget,
        cancel: &CancellationToken,
    ) -> Result<Palette> {
        target.validate()?;
        cancel.check()?;
        match target {
            PaletteTarget::Count(count) => median_cut_palette(image, *count),
            PaletteTarget::Fixed(palette) => Ok(palette.clone()),
        }
    }

    fn transform(&self, image: &RgbImage, palette: &Palette) -> Result<IndexedImage> {
        remap_nearest(image, palette, ColorMetric::Rgb)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn quadrants() -> RgbImage {
        RgbImage::from_fn(4, 4, |x, y| match (x < 2, y < 2) {
            (true, true) => Rgb([255, 0, 0]),
            (false, true) => Rgb([0, 255, 0]),
            (true, false) => Rgb([0, 0, 255]),
            (false, false) => Rgb([250, 250, 250]),
        })
    }

    #[test]
    fn test_solid_image_single_color() {
        let img = RgbImage::from_pixel(4, 4, Rgb([255, 0, 0]));
        let palette = median_cut_palette(&img, 1).unwrap();
        assert_eq!(palette.colors(), &[RgbColor::new(255, 0, 0)]);

        // Asking for more colors than exist yields the distinct colors only
        let palette = median_cut_palette(&img, 8).unwrap();
        assert_eq!(palette.len(), 1);
    }

    #[test]
    fn test_exact_colors_recovered() {
        let palette = median_cut_palette(&quadrants(), 4).unwrap();
        assert_eq!(palette.len(), 4);
        for color in [
            RgbColor::new(255, 0, 0),
            RgbColor::new(0, 255, 0),
            RgbColor::new(0, 0, 255),
            RgbColor::new(250, 250, 250),
        ] {
            assert!(palette.contains(color), "missing {}", color);
        }
    }

    #[test]
    fn test_palette_size_bounded() {
        let gradient = RgbImage::from_fn(64, 4, |x, y| Rgb([(x * 4) as u8, (y * 60) as u8, 128]));
        for count in [1, 2, 5, 16] {
            let palette = median_cut_palette(&gradient, count).unwrap();
            assert!(palette.len() <= count);
            assert!(!palette.is_empty());
        }
    }

    #[test]
    fn test_deterministic() {
        let gradient = RgbImage::from_fn(32, 32, |x, y| Rgb([(x * 8) as u8, (y * 8) as u8, ((x + y) * 4) as u8]));
        let a = median_cut_palette(&gradient, 6).unwrap();
        let b = median_cut_palette(&gradient, 6).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_quantize_maps_onto_palette() {
        let quantizer = MedianCutQuantizer;
        let indexed = quantizer
            .quantize(&quadrants(), &PaletteTarget::Count(2), &CancellationToken::new())
            .unwrap();
        assert_eq!(indexed.palette().len(), 2);
        assert_eq!(indexed.dimensions(), (4, 4));
    }

    #[test]
    fn test_zero_colors_rejected() {
        let img = RgbImage::from_pixel(2, 2, Rgb([1, 2, 3]));
        assert!(matches!(
            median_cut_palette(&img, 0),
            Err(MosaicError::Validation(_))
        ));
    }

    #[test]
    fn test_cancelled_fit() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = MedianCutQuantizer.fit(&quadrants(), &PaletteTarget::Count(2), &cancel);
        assert!(matches!(result, Err(MosaicError::Cancelled)));
    }
}
