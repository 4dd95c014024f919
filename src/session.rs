//! Regeneration session
//!
//! Holds one source photo and the most recent mosaic made from it, the way an
//! interactive host does while the user tweaks parameters:
//! - regenerating with parameters equal to the last ones is a no-op
//! - only one regeneration runs at a time; a second caller gets `Busy`
//! - the (mosaic, distribution) pair is replaced as a whole, and a failed
//!   regeneration leaves the previous pair in place
//! - work can be cancelled through a `CancellationToken` and offloaded to
//!   tokio's blocking pool with `generate_async`

use image::RgbImage;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::cancel::CancellationToken;
use crate::error::{MosaicError, Result};
use crate::params::MosaicParameters;
use crate::pipeline::{Mosaic, MosaicGenerator};

/// Outcome of a regeneration request.
#[derive(Debug, Clone)]
pub enum Regeneration {
    /// Parameters matched the current mosaic; nothing was recomputed.
    Unchanged(Arc<Mosaic>),
    Generated(Arc<Mosaic>),
}

impl Regeneration {
    pub fn mosaic(&self) -> &Arc<Mosaic> {
        match self {
            Regeneration::Unchanged(mosaic) | Regeneration::Generated(mosaic) => mosaic,
        }
    }

    pub fn was_generated(&self) -> bool {
        matches!(self, Regeneration::Generated(_))
    }
}

/// SHA-256 of the raw pixel bytes, hex encoded.
pub fn hash_pixels(image: &RgbImage) -> String {
    let mut hasher = Sha256::new();
    hasher.update(image.width().to_le_bytes());
    hasher.update(image.height().to_le_bytes());
    hasher.update(image.as_raw());
    format!("{:x}", hasher.finalize())
}

pub struct MosaicSession {
    source: Arc<RgbImage>,
    source_digest: String,
    generator: MosaicGenerator,
    current: Mutex<Option<Arc<Mosaic>>>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when a regeneration ends, however it ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl MosaicSession {
    pub fn new(source: Arc<RgbImage>) -> Self {
        Self::with_generator(source, MosaicGenerator::default())
    }

    pub fn with_generator(source: Arc<RgbImage>, generator: MosaicGenerator) -> Self {
        let source_digest = hash_pixels(&source);
        log::debug!(
            "Session for {}x{} source {}",
            source.width(),
            source.height(),
            &source_digest[..12]
        );
        Self {
            source,
            source_digest,
            generator,
            current: Mutex::new(None),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn source(&self) -> &Arc<RgbImage> {
        &self.source
    }

    pub fn source_digest(&self) -> &str {
        &self.source_digest
    }

    pub fn current(&self) -> Result<Option<Arc<Mosaic>>> {
        Ok(self.lock_current()?.clone())
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn lock_current(&self) -> Result<MutexGuard<'_, Option<Arc<Mosaic>>>> {
        self.current
            .lock()
            .map_err(|e| MosaicError::Processing(format!("Session state poisoned: {}", e)))
    }

    /// Regenerate the mosaic for `params` unless it is already current.
    pub fn regenerate(&self, params: &MosaicParameters, cancel: &CancellationToken) -> Result<Regeneration> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(MosaicError::Busy);
        }
        let _guard = InFlightGuard(&self.in_flight);

        if let Some(current) = self.lock_current()?.as_ref() {
            if current.parameters == *params {
                log::debug!("Parameters unchanged, keeping current mosaic");
                return Ok(Regeneration::Unchanged(Arc::clone(current)));
            }
        }

        let mosaic = match self.generator.generate_with_cancel(&self.source, params, cancel) {
            Ok(mosaic) => Arc::new(mosaic),
            Err(e) => {
                log::warn!("Regeneration for source {} failed: {}", &self.source_digest[..12], e);
                return Err(e);
            }
        };

        *self.lock_current()? = Some(Arc::clone(&mosaic));
        Ok(Regeneration::Generated(mosaic))
    }

    /// `regenerate` on tokio's blocking pool.
    pub async fn generate_async(
        self: &Arc<Self>,
        params: MosaicParameters,
        cancel: CancellationToken,
    ) -> Result<Regeneration> {
        let session = Arc::clone(self);
        tokio::task::spawn_blocking(move || session.regenerate(&params, &cancel))
            .await
            .map_err(|e| MosaicError::Processing(format!("Task join error: {}", e)))?
    }
}

// ============================================================================
// TESTS
// ============================================================================
