//! Mosaic generation pipeline
//!
//! source photo -> coloring strategy -> color distribution -> overlay
//!
//! The generator owns its collaborators (clustering quantizer, text renderer)
//! and is otherwise stateless, so one instance can serve any number of
//! generations, including concurrent ones.

use image::RgbImage;
use std::time::Instant;

use crate::cancel::CancellationToken;
use crate::coloring::ColoringContext;
use crate::distribution::ColorDistribution;
use crate::error::{MosaicError, Result};
use crate::params::MosaicParameters;
use crate::quantize::{KmeansQuantizer, Quantizer};
use crate::text::{BitmapDigits, TextRenderer};

/// A finished mosaic and the distribution its numbers refer to.
#[derive(Debug, Clone, PartialEq)]
pub struct Mosaic {
    /// Final image, overlay included.
    pub image: RgbImage,
    /// Cell colors of the mosaic before any overlay was drawn.
    pub distribution: ColorDistribution,
    pub parameters: MosaicParameters,
}

pub struct MosaicGenerator {
    quantizer: Box<dyn Quantizer>,
    text: Box<dyn TextRenderer>,
}

impl Default for MosaicGenerator {
    fn default() -> Self {
        Self {
            quantizer: Box::new(KmeansQuantizer::default()),
            text: Box::new(BitmapDigits),
        }
    }
}

impl MosaicGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the clustering quantizer used by the pixelation methods.
    pub fn with_quantizer(mut self, quantizer: Box<dyn Quantizer>) -> Self {
        self.quantizer = quantizer;
        self
    }

    pub fn with_text_renderer(mut self, text: Box<dyn TextRenderer>) -> Self {
        self.text = text;
        self
    }

    pub fn quantizer(&self) -> &dyn Quantizer {
        self.quantizer.as_ref()
    }

    pub fn generate(&self, source: &RgbImage, params: &MosaicParameters) -> Result<Mosaic> {
        self.generate_with_cancel(source, params, &CancellationToken::new())
    }

    /// Run the pipeline, checking `cancel` between stages.
    pub fn generate_with_cancel(
        &self,
        source: &RgbImage,
        params: &MosaicParameters,
        cancel: &CancellationToken,
    ) -> Result<Mosaic> {
        let (src_width, src_height) = source.dimensions();
        if src_width == 0 || src_height == 0 {
            return Err(MosaicError::Validation("Source image is empty".to_string()));
        }
        let started = Instant::now();
        let grid = params.grid();

        // Step 1: Color the cell grid
        let strategy = params.method().strategy();
        let ctx = ColoringContext {
            quantizer: self.quantizer.as_ref(),
            cancel,
        };
        let mosaic = strategy.colorize(&ctx, source, params.colors(), grid)?;
        log::debug!(
            "{}: {}x{} -> {}x{} in {:?}",
            strategy.name(),
            src_width,
            src_height,
            mosaic.width(),
            mosaic.height(),
            started.elapsed()
        );
        if mosaic.dimensions() != grid.mosaic_size() {
            return Err(MosaicError::Processing(format!(
                "{} produced {}x{}, expected {}x{}",
                strategy.name(),
                mosaic.width(),
                mosaic.height(),
                grid.mosaic_size().0,
                grid.mosaic_size().1
            )));
        }
        cancel.check()?;

        // Step 2: Count cell colors
        let distribution = ColorDistribution::compute(&mosaic, grid.multiplier)?;
        cancel.check()?;

        // Step 3: Overlay
        let image = match params.overlay().strategy() {
            Some(overlay) => {
                let overlay_start = Instant::now();
                let image = overlay.apply(
                    &mosaic,
                    &distribution,
                    grid.multiplier,
                    params.numbers_size(),
                    self.text.as_ref(),
                )?;
                log::debug!("{} overlay in {:?}", overlay.name(), overlay_start.elapsed());
                image
            }
            None => mosaic,
        };

        log::info!(
            "Generated {}x{} mosaic with {} colors in {:?}",
            image.width(),
            image.height(),
            distribution.len(),
            started.elapsed()
        );

        Ok(Mosaic {
            image,
            distribution,
            parameters: params.clone(),
        })
    }
}

/// Generate a mosaic with the default quantizer and text renderer.
pub fn generate_mosaic(source: &RgbImage, params: &MosaicParameters) -> Result<RgbImage> {
    MosaicGenerator::default()
        .generate(source, params)
        .map(|mosaic| mosaic.image)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::RgbColor;
    use crate::coloring::ColoringMethod;
    use crate::overlay::OverlayKind;
    use crate::quantize::MedianCutQuantizer;
    use image::Rgb;

    fn gradient() -> RgbImage {
        RgbImage::from_fn(32, 24, |x, y| Rgb([(x * 8) as u8, (y * 10) as u8, 128]))
    }

    #[test]
    fn test_solid_red() {
        let source = RgbImage::from_pixel(4, 4, Rgb([255, 0, 0]));
        let params = MosaicParameters::builder()
            .cells(2, 2)
            .multiplier(10)
            .color_count(1)
            .build()
            .unwrap();
        let mosaic = MosaicGenerator::default().generate(&source, &params).unwrap();
        assert_eq!(mosaic.image.dimensions(), (20, 20));
        assert!(mosaic.image.pixels().all(|p| *p == Rgb([255, 0, 0])));
        assert_eq!(mosaic.distribution.len(), 1);
        assert_eq!(mosaic.distribution.count(RgbColor::new(255, 0, 0)), 4);
    }

    #[test]
    fn test_every_method_and_overlay() {
        let palette = crate::palette::Palette::from_colors([
            RgbColor::new(200, 30, 30),
            RgbColor::new(30, 200, 30),
            RgbColor::new(30, 30, 200),
        ]);
        let generator = MosaicGenerator::default();
        for method in ColoringMethod::ALL {
            for overlay in OverlayKind::ALL {
                let builder = MosaicParameters::builder()
                    .cells(6, 4)
                    .multiplier(8)
                    .method(method)
                    .overlay(overlay);
                let builder = if method.uses_palette() {
                    builder.palette(palette.clone())
                } else {
                    builder.color_count(3)
                };
                let params = builder.build().unwrap();
                let mosaic = generator.generate(&gradient(), &params).unwrap();
                assert_eq!(mosaic.image.dimensions(), (48, 32), "{:?}/{:?}", method, overlay);
                assert_eq!(mosaic.distribution.total(), 24);
            }
        }
    }

    #[test]
    fn test_injected_quantizer() {
        let params = MosaicParameters::builder()
            .cells(4, 4)
            .multiplier(2)
            .method(ColoringMethod::ClusterPixelate)
            .color_count(2)
            .build()
            .unwrap();
        let generator = MosaicGenerator::new().with_quantizer(Box::new(MedianCutQuantizer));
        assert_eq!(generator.quantizer().name(), MedianCutQuantizer.name());
        let mosaic = generator.generate(&gradient(), &params).unwrap();
        assert!(mosaic.distribution.len() <= 2);
    }

    #[test]
    fn test_empty_source_rejected() {
        let params = MosaicParameters::default();
        let result = generate_mosaic(&RgbImage::new(0, 0), &params);
        assert!(matches!(result, Err(MosaicError::Validation(_))));
    }

    #[test]
    fn test_cancelled_generation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = MosaicGenerator::default().generate_with_cancel(&gradient(), &MosaicParameters::default(), &cancel);
        assert!(matches!(result, Err(MosaicError::Cancelled)));
    }
}
