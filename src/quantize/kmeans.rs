//! K-means clustering quantizer
//!
//! The clustering quantizer behind the pixelation strategies. Pixels are
//! clustered in Lab (or sRGB) with `kmeans_colors`; the best of several
//! seeded runs wins, so the result is reproducible for identical input.

use image::RgbImage;
use kmeans_colors::{get_kmeans, Kmeans};
use palette::{IntoColor, Lab, Srgb};
use serde::{Deserialize, Serialize};

use super::{remap_nearest, ColorMetric, IndexedImage, PaletteTarget, Quantizer};
use crate::cancel::CancellationToken;
use crate::color::RgbColor;
use crate::error::{MosaicError, Result};
use crate::palette::Palette;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpace {
    Lab,
    Rgb,
}

/// Settings for the k-means quantizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KmeansSettings {
    /// Independent runs; the lowest-score run is kept (default: 3)
    pub runs: u32,
    /// Iteration cap per run (default: 20)
    pub max_iter: usize,
    /// Convergence threshold; `None` picks 5.0 for Lab and 0.0025 for RGB
    pub converge: Option<f32>,
    /// Seed of the first run, later runs use `seed + run` (default: 42)
    pub seed: u64,
    /// Space the clustering happens in (default: lab)
    pub color_space: ColorSpace,
}

impl Default for KmeansSettings {
    fn default() -> Self {
        Self {
            runs: 3,
            max_iter: 20,
            converge: None,
            seed: 42,
            color_space: ColorSpace::Lab,
        }
    }
}

impl KmeansSettings {
    fn converge(&self) -> f32 {
        self.converge.unwrap_or(match self.color_space {
            ColorSpace::Lab => 5.0,
            ColorSpace::Rgb => 0.0025,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct KmeansQuantizer {
    settings: KmeansSettings,
}

impl KmeansQuantizer {
    pub fn new(settings: KmeansSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &KmeansSettings {
        &self.settings
    }

    fn cluster_lab(&self, image: &RgbImage, k: usize, cancel: &CancellationToken) -> Result<Vec<RgbColor>> {
        let lab_vec: Vec<Lab> = image
            .pixels()
            .map(|pixel| {
                let rgb_color: Srgb<f32> = Srgb::new(pixel[0], pixel[1], pixel[2]).into_format();
                let lab_color: Lab = rgb_color.into_linear().into_color();
                lab_color
            })
            .collect();

        let best = self.best_run(&lab_vec, k, cancel)?;
        Ok(best
            .centroids
            .iter()
            .map(|&centroid| RgbColor::from_lab(centroid))
            .collect())
    }

    fn cluster_rgb(&self, image: &RgbImage, k: usize, cancel: &CancellationToken) -> Result<Vec<RgbColor>> {
        let rgb_vec: Vec<Srgb> = image
            .pixels()
            .map(|pixel| Srgb::new(pixel[0], pixel[1], pixel[2]).into_format())
            .collect();

        let best = self.best_run(&rgb_vec, k, cancel)?;
        Ok(best
            .centroids
            .iter()
            .map(|centroid| {
                let rgb: Srgb<u8> = centroid.into_format();
                RgbColor::new(rgb.red, rgb.green, rgb.blue)
            })
            .collect())
    }

    fn best_run<C>(&self, buffer: &[C], k: usize, cancel: &CancellationToken) -> Result<Kmeans<C>>
    where
        C: kmeans_colors::Calculate + Clone,
    {
        let mut result: Option<Kmeans<C>> = None;
        for run in 0..self.settings.runs.max(1) {
            cancel.check()?;
            let run_result = get_kmeans(
                k,
                self.settings.max_iter,
                self.settings.converge(),
                false,
                buffer,
                self.settings.seed.wrapping_add(run as u64),
            );
            log::debug!("k-means run {} score {:.3}", run, run_result.score);
            let better = match &result {
                Some(best) => run_result.score < best.score,
                None => true,
            };
            if better {
                result = Some(run_result);
            }
        }
        result.ok_or_else(|| MosaicError::Processing("k-means produced no run".to_string()))
    }
}

impl Quantizer for KmeansQuantizer {
    fn name(&self) -> &'static str {
        "k-means"
    }

    fn fit(
        &self,
        image: &RgbImage,
        target: &PaletteTarget,
        cancel: &CancellationToken,
    ) -> Result<Palette> {
        target.validate()?;
        let k = match target {
            PaletteTarget::Fixed(palette) => return Ok(palette.clone()),
            PaletteTarget::Count(k) => *k,
        };
        if image.width() == 0 || image.height() == 0 {
            return Err(MosaicError::Validation(
                "Cannot cluster an empty image".to_string(),
            ));
        }

        let centroids = match self.settings.color_space {
            ColorSpace::Lab => self.cluster_lab(image, k, cancel)?,
            ColorSpace::Rgb => self.cluster_rgb(image, k, cancel)?,
        };

        let palette = Palette::from_colors(centroids);
        if palette.len() < k {
            log::warn!(
                "k-means asked for {} colors, found {} distinct centroids",
                k,
                palette.len()
            );
        }
        Ok(palette)
    }

    fn transform(&self, image: &RgbImage, palette: &Palette) -> Result<IndexedImage> {
        let metric = match self.settings.color_space {
            ColorSpace::Lab => ColorMetric::Lab,
            ColorSpace::Rgb => ColorMetric::Rgb,
        };
        remap_nearest(image, palette, metric)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn two_tone() -> RgbImage {
        RgbImage::from_fn(8, 8, |x, _| if x < 4 { Rgb([220, 20, 20]) } else { Rgb([20, 20, 220]) })
    }

    #[test]
    fn test_fit_two_clusters() {
        let quantizer = KmeansQuantizer::default();
        let palette = quantizer
            .fit(&two_tone(), &PaletteTarget::Count(2), &CancellationToken::new())
            .unwrap();
        assert_eq!(palette.len(), 2);
        // Centroids land on (or right next to) the two source colors
        for source in [RgbColor::new(220, 20, 20), RgbColor::new(20, 20, 220)] {
            assert!(palette.iter().any(|c| c.distance_sq(source) <= 12), "no centroid near {}", source);
        }
    }

    #[test]
    fn test_fit_is_deterministic() {
        let img = RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 16) as u8, (y * 16) as u8, 90]));
        let quantizer = KmeansQuantizer::default();
        let cancel = CancellationToken::new();
        let a = quantizer.fit(&img, &PaletteTarget::Count(4), &cancel).unwrap();
        let b = quantizer.fit(&img, &PaletteTarget::Count(4), &cancel).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fixed_palette_passthrough() {
        let fixed = Palette::from_colors([RgbColor::BLACK, RgbColor::WHITE]);
        let quantizer = KmeansQuantizer::default();
        let fitted = quantizer
            .fit(&two_tone(), &PaletteTarget::Fixed(fixed.clone()), &CancellationToken::new())
            .unwrap();
        assert_eq!(fitted, fixed);
    }

    #[test]
    fn test_rgb_space() {
        let quantizer = KmeansQuantizer::new(KmeansSettings {
            color_space: ColorSpace::Rgb,
            ..Default::default()
        });
        let indexed = quantizer
            .quantize(&two_tone(), &PaletteTarget::Count(2), &CancellationToken::new())
            .unwrap();
        assert_ne!(indexed.index_at(0, 0), indexed.index_at(7, 0));
    }

    #[test]
    fn test_cancelled_before_first_run() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = KmeansQuantizer::default().fit(&two_tone(), &PaletteTarget::Count(2), &cancel);
        assert!(matches!(result, Err(MosaicError::Cancelled)));
    }

    #[test]
    fn test_settings_from_partial_json() {
        let settings: KmeansSettings = serde_json::from_str(r#"{"runs": 5, "color_space": "rgb"}"#).unwrap();
        assert_eq!(settings.runs, 5);
        assert_eq!(settings.max_iter, 20);
        assert_eq!(settings.color_space, ColorSpace::Rgb);
        assert_eq!(settings.converge(), 0.0025);
    }
}
