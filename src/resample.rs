//! Resampling between source, cell grid and display sizes
//!
//! - `box_downscale` - area-average filter for continuous-tone images
//! - `majority_downscale` - area rule for indexed images that keeps every
//!   output pixel on the palette
//! - `magnify` - block replication, every cell becomes a crisp square

use fast_image_resize as fr;
use image::RgbImage;

use crate::error::{MosaicError, Result};
use crate::quantize::IndexedImage;

/// Downscale with a box filter (averages each source area).
pub fn box_downscale(image: &RgbImage, width: u32, height: u32) -> Result<RgbImage> {
    if width == 0 || height == 0 {
        return Err(MosaicError::Validation(format!(
            "Cannot resize to {}x{}",
            width, height
        )));
    }
    let (src_width, src_height) = image.dimensions();
    if (src_width, src_height) == (width, height) {
        return Ok(image.clone());
    }

    let src_image = fr::images::Image::from_vec_u8(
        src_width,
        src_height,
        image.as_raw().clone(),
        fr::PixelType::U8x3,
    )
    .map_err(|e| MosaicError::Processing(format!("Failed to wrap source image: {}", e)))?;

    let mut dst_image = fr::images::Image::new(width, height, fr::PixelType::U8x3);

    let mut resizer = fr::Resizer::new();
    let options = fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Box));

    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| MosaicError::Processing(format!("Box resize failed: {}", e)))?;

    RgbImage::from_raw(width, height, dst_image.into_vec())
        .ok_or_else(|| MosaicError::Processing("Resized buffer has unexpected length".to_string()))
}

/// Source span `[start, end)` covered by output coordinate `i` of `out_len`.
fn source_span(i: u32, out_len: u32, src_len: u32) -> (u32, u32) {
    let start = ((i as u64 * src_len as u64) / out_len as u64) as u32;
    let end = (((i as u64 + 1) * src_len as u64) / out_len as u64) as u32;
    let start = start.min(src_len - 1);
    (start, end.max(start + 1).min(src_len))
}

/// Downscale an indexed image: each output pixel takes the most frequent
/// index of the source area it covers (ties keep the lowest index).
pub fn majority_downscale(image: &IndexedImage, width: u32, height: u32) -> Result<IndexedImage> {
    let (src_width, src_height) = image.dimensions();
    if width == 0 || height == 0 || src_width == 0 || src_height == 0 {
        return Err(MosaicError::Validation(format!(
            "Cannot resize {}x{} to {}x{}",
            src_width, src_height, width, height
        )));
    }

    let palette_len = image.palette().len();
    let mut counts = vec![0u32; palette_len];
    let mut indices = Vec::with_capacity(width as usize * height as usize);

    for y in 0..height {
        let (y_start, y_end) = source_span(y, height, src_height);
        for x in 0..width {
            let (x_start, x_end) = source_span(x, width, src_width);

            counts.iter_mut().for_each(|c| *c = 0);
            for y_orig in y_start..y_end {
                for x_orig in x_start..x_end {
                    counts[image.index_at(x_orig, y_orig) as usize] += 1;
                }
            }

            let mut index_max = 0usize;
            for (index, &count) in counts.iter().enumerate() {
                if count > counts[index_max] {
                    index_max = index;
                }
            }
            indices.push(index_max as u8);
        }
    }

    IndexedImage::new(width, height, image.palette().clone(), indices)
}

/// Block-replicate every pixel into a `multiplier` x `multiplier` square.
pub fn magnify(image: &RgbImage, multiplier: u32) -> Result<RgbImage> {
    if multiplier == 0 {
        return Err(MosaicError::Validation("Multiplier must be at least 1".to_string()));
    }
    let (width, height) = image.dimensions();
    let out_width = width
        .checked_mul(multiplier)
        .ok_or_else(|| MosaicError::Validation("Mosaic width overflows".to_string()))?;
    let out_height = height
        .checked_mul(multiplier)
        .ok_or_else(|| MosaicError::Validation("Mosaic height overflows".to_string()))?;

    Ok(RgbImage::from_fn(out_width, out_height, |x, y| {
        *image.get_pixel(x / multiplier, y / multiplier)
    }))
}

// ============================================================================
// TESTS
// ============================================================================
