/// Collaborator traits for Mixdown
use crate::error::Result;
use crate::types::{AssetBytes, PcmBuffer};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

/// PCM decoder trait
///
/// Implementers turn an opaque audio file into multichannel floating-point PCM
/// at its native sample rate.
///
/// The input bytes are shared and must not be modified; callers decode the
/// same bytes repeatedly (original vs. gain-staged analysis, export).
#[async_trait]
pub trait PcmDecoder: Send + Sync {
    /// Decode a complete audio file
    ///
    /// # Errors
    /// Returns `MixError::Decode` if the data is malformed or the format unsupported
    async fn decode(&self, bytes: AssetBytes) -> Result<PcmBuffer>;
}

/// Live gain handle inside the external real-time audio graph
///
/// The mixer only writes linear gain values to it; the node's lifecycle
/// belongs to the playback graph.
pub trait GainNode: Send + Sync {
    /// Set the linear gain multiplier
    fn set_gain(&self, linear: f64);

    /// Current linear gain multiplier
    fn gain(&self) -> f64;
}

/// Lock-free `GainNode` that simply stores the last written value
///
/// Useful for headless sessions and tests; a real playback graph reads
/// `gain()` from its audio callback.
#[derive(Debug)]
pub struct AtomicGainNode {
    bits: AtomicU64,
}

impl AtomicGainNode {
    /// Create a node at unity gain
    pub fn new() -> Self {
        Self {
            bits: AtomicU64::new(1.0_f64.to_bits()),
        }
    }
}

impl Default for AtomicGainNode {
    fn default() -> Self {
        Self::new()
    }
}

impl GainNode for AtomicGainNode {
    fn set_gain(&self, linear: f64) {
        self.bits.store(linear.to_bits(), Ordering::Release);
    }

    fn gain(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }
}
