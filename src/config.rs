//! JSON configuration for the mosaic generator
//!
//! ```json
//! {
//!   "parameters": {
//!     "cell_width": 40, "cell_height": 30, "multiplier": 20,
//!     "colors": { "count": 12 },
//!     "method": "cluster_pixelate",
//!     "overlay": "grid_and_numbers",
//!     "numbers_size": 10
//!   },
//!   "kmeans": { "runs": 3, "color_space": "lab" },
//!   "font_path": null
//! }
//! ```
//!
//! Every section is optional; missing ones fall back to their defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::params::MosaicParameters;
use crate::pipeline::MosaicGenerator;
use crate::quantize::{KmeansQuantizer, KmeansSettings};
use crate::text::renderer_for;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MosaicConfig {
    /// Parameters of the next generation (validated on load)
    pub parameters: MosaicParameters,
    /// Clustering quantizer used by the pixelation methods
    pub kmeans: KmeansSettings,
    /// TTF/OTF font for numbers; built-in digits when absent
    pub font_path: Option<PathBuf>,
}

impl MosaicConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Generator wired with the configured quantizer and text renderer.
    pub fn build_generator(&self) -> Result<MosaicGenerator> {
        let text = renderer_for(self.font_path.as_deref())?;
        Ok(MosaicGenerator::new()
            .with_quantizer(Box::new(KmeansQuantizer::new(self.kmeans.clone())))
            .with_text_renderer(text))
    }
}

// ============================================================================
// TESTS
// ============================================================================
