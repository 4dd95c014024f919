//! Mosaic and paint-by-number generation
//!
//! Turns a photo into a grid of flat-colored cells, optionally outlined and
//! numbered, plus the table of colors used.
//!
//! - `pipeline` - `MosaicGenerator` and `generate_mosaic`
//! - `coloring` - the five coloring strategies
//! - `quantize` - median-cut and k-means quantizers
//! - `overlay` - grid and number overlays
//! - `distribution` - per-color cell counts and the exported table
//! - `session` - single-flight regeneration for interactive hosts

pub mod cancel;
pub mod color;
pub mod coloring;
pub mod config;
pub mod distribution;
pub mod error;
pub mod overlay;
pub mod palette;
pub mod params;
pub mod pipeline;
pub mod quantize;
pub mod resample;
pub mod session;
pub mod text;

pub use crate::cancel::CancellationToken;
pub use crate::color::{hex_to_rgb, is_light, rgb_to_hex, RgbColor};
pub use crate::coloring::ColoringMethod;
pub use crate::config::MosaicConfig;
pub use crate::distribution::ColorDistribution;
pub use crate::error::{MosaicError, Result};
pub use crate::overlay::OverlayKind;
pub use crate::palette::Palette;
pub use crate::params::{CellGrid, ColorSpec, MosaicParameters};
pub use crate::pipeline::{generate_mosaic, Mosaic, MosaicGenerator};
pub use crate::quantize::{IndexedImage, KmeansQuantizer, MedianCutQuantizer, Quantizer};
pub use crate::session::{MosaicSession, Regeneration};
pub use crate::text::{BitmapDigits, TextRenderer, TrueTypeText};
