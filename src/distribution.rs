//! Color Distribution
//!
//! Counts how many cells of a finished mosaic use each color. The key order
//! (first seen while scanning) is the numbering used by overlays and by the
//! exported palette table, so the scan order is fixed: columns left to right,
//! and within a column cells top to bottom.

use image::RgbImage;
use indexmap::IndexMap;
use std::fmt::Write as _;
use std::io::Write;

use crate::color::RgbColor;
use crate::error::{MosaicError, Result};
use crate::palette::Palette;

/// Header line of the exported palette table.
pub const TABLE_HEADER: &str = "№     #RRGGBB   Count";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColorDistribution {
    counts: IndexMap<RgbColor, usize>,
}

impl ColorDistribution {
    /// Sample the top-left pixel of every `multiplier`-sized cell.
    pub fn compute(mosaic: &RgbImage, multiplier: u32) -> Result<Self> {
        if multiplier == 0 {
            return Err(MosaicError::Validation("Multiplier must be at least 1".to_string()));
        }
        let (width, height) = mosaic.dimensions();
        let step = multiplier as usize;

        let mut counts: IndexMap<RgbColor, usize> = IndexMap::new();
        for x in (0..width).step_by(step) {
            for y in (0..height).step_by(step) {
                let color = RgbColor::from(*mosaic.get_pixel(x, y));
                *counts.entry(color).or_insert(0) += 1;
            }
        }

        Ok(Self { counts })
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn count(&self, color: RgbColor) -> usize {
        self.counts.get(&color).copied().unwrap_or(0)
    }

    /// 1-based number shown for `color` in overlays.
    pub fn index_of(&self, color: RgbColor) -> Option<usize> {
        self.counts.get_index_of(&color).map(|i| i + 1)
    }

    /// Number of sampled cells.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RgbColor, usize)> + '_ {
        self.counts.iter().map(|(&color, &count)| (color, count))
    }

    /// The distribution's colors as a palette, in numbering order.
    pub fn palette(&self) -> Palette {
        self.counts.keys().copied().collect()
    }

    // ------------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------------

    /// Plain-text table: header, then `{n:<5} #RRGGBB   {count}` per color.
    pub fn to_table(&self) -> String {
        let mut table = String::new();
        table.push_str(TABLE_HEADER);
        table.push('\n');
        for (number, (color, count)) in self.iter().enumerate() {
            // Writing to a String cannot fail
            let _ = writeln!(table, "{:<5} #{}   {}", number + 1, color.to_hex(), count);
        }
        table
    }

    pub fn write_table<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(self.to_table().as_bytes())?;
        Ok(())
    }

    /// One solid swatch per color, named `"{n} {RRGGBB} {count}"`.
    pub fn swatches(&self, width: u32, height: u32) -> Vec<(String, RgbImage)> {
        self.iter()
            .enumerate()
            .map(|(number, (color, count))| {
                let name = format!("{} {} {}", number + 1, color.to_hex(), count);
                (name, RgbImage::from_pixel(width, height, color.into()))
            })
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resample::magnify;
    use image::Rgb;
    use proptest::prelude::*;

    const RED: Rgb<u8> = Rgb([255, 0, 0]);
    const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

    #[test]
    fn test_solid_mosaic() {
        let mosaic = RgbImage::from_pixel(20, 20, RED);
        let distribution = ColorDistribution::compute(&mosaic, 10).unwrap();
        assert_eq!(distribution.len(), 1);
        assert_eq!(distribution.count(RgbColor::new(255, 0, 0)), 4);
    }

    #[test]
    fn test_first_seen_order_is_column_major() {
        // Cells: (0,0) red, (1,0) blue, (0,1) white
        let mut cells = RgbImage::from_pixel(2, 2, RED);
        cells.put_pixel(1, 0, BLUE);
        cells.put_pixel(0, 1, Rgb([255, 255, 255]));
        let mosaic = magnify(&cells, 3).unwrap();

        let distribution = ColorDistribution::compute(&mosaic, 3).unwrap();
        let order: Vec<RgbColor> = distribution.iter().map(|(c, _)| c).collect();
        assert_eq!(
            order,
            vec![RgbColor::new(255, 0, 0), RgbColor::WHITE, RgbColor::new(0, 0, 255)]
        );
        assert_eq!(distribution.index_of(RgbColor::WHITE), Some(2));
        assert_eq!(distribution.index_of(RgbColor::BLACK), None);
        assert_eq!(distribution.count(RgbColor::new(255, 0, 0)), 2);
    }

    #[test]
    fn test_table_format() {
        let mut cells = RgbImage::from_pixel(3, 1, RED);
        cells.put_pixel(2, 0, Rgb([10, 171, 255]));
        let distribution = ColorDistribution::compute(&cells, 1).unwrap();

        let table = distribution.to_table();
        assert_eq!(
            table,
            "№     #RRGGBB   Count\n1     #FF0000   2\n2     #0AABFF   1\n"
        );

        let mut buffer = Vec::new();
        distribution.write_table(&mut buffer).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), table);
    }

    #[test]
    fn test_swatches() {
        let cells = RgbImage::from_pixel(2, 1, BLUE);
        let distribution = ColorDistribution::compute(&cells, 1).unwrap();
        let swatches = distribution.swatches(4, 3);
        assert_eq!(swatches.len(), 1);
        assert_eq!(swatches[0].0, "1 0000FF 2");
        assert_eq!(swatches[0].1.dimensions(), (4, 3));
        assert_eq!(*swatches[0].1.get_pixel(3, 2), BLUE);
    }

    #[test]
    fn test_zero_multiplier_rejected() {
        let mosaic = RgbImage::new(2, 2);
        assert!(ColorDistribution::compute(&mosaic, 0).is_err());
    }

    proptest! {
        #[test]
        fn prop_counts_sum_to_cells(
            cells_w in 1u32..8,
            cells_h in 1u32..8,
            multiplier in 1u32..6,
            seed in any::<u64>(),
        ) {
            let cells = RgbImage::from_fn(cells_w, cells_h, |x, y| {
                let v = seed.wrapping_mul(31).wrapping_add((x * 7 + y * 13) as u64) % 4;
                Rgb([(v * 60) as u8, 0, 0])
            });
            let mosaic = magnify(&cells, multiplier).unwrap();
            let distribution = ColorDistribution::compute(&mosaic, multiplier).unwrap();
            prop_assert_eq!(distribution.total(), (cells_w * cells_h) as usize);
            prop_assert!(distribution.len() <= 4);
        }
    }
}
