use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{MosaicError, Result};

/// Cooperative cancellation flag shared between a host and a running pipeline.
///
/// Checked between pipeline stages and between quantizer runs; a long k-means
/// run finishes its current iteration batch before noticing.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once `cancel` has been called on any clone.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(MosaicError::Cancelled);
        }
        Ok(())
    }
}
