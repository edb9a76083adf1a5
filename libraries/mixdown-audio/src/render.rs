//! Offline gain rendering
//!
//! A non-realtime render pass: the source buffer is pulled through a scalar
//! gain stage block by block (like an offline audio graph) and written to a
//! fresh destination buffer. There is no ramping; the gain is constant for the
//! whole pass, so the same input and gain always produce identical output.

use crate::error::{AudioError, Result};
use mixdown_core::PcmBuffer;

/// Default render quantum in frames
pub const DEFAULT_RENDER_QUANTUM: usize = 128;

/// Offline (faster than real time) gain renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfflineRenderer {
    quantum: usize,
}

impl OfflineRenderer {
    /// Create a renderer that processes `quantum` frames per block
    ///
    /// # Errors
    /// Returns an error if `quantum` is zero
    pub fn new(quantum: usize) -> Result<Self> {
        if quantum == 0 {
            return Err(AudioError::RenderError(
                "Render quantum must be at least one frame".to_string(),
            ));
        }
        Ok(Self { quantum })
    }

    /// Frames per render block
    pub fn quantum(&self) -> usize {
        self.quantum
    }

    /// Render `pcm` through a constant linear gain into a new buffer
    ///
    /// The output has the same channel count, frame count and sample rate.
    ///
    /// # Errors
    /// Returns an error if `linear_gain` is negative, NaN or infinite
    pub fn render(&self, pcm: &PcmBuffer, linear_gain: f64) -> Result<PcmBuffer> {
        if !linear_gain.is_finite() || linear_gain < 0.0 {
            return Err(AudioError::RenderError(format!(
                "Invalid linear gain: {}",
                linear_gain
            )));
        }

        let gain = linear_gain as f32;
        let frames = pcm.frames();
        let mut destination: Vec<Vec<f32>> = (0..pcm.channel_count())
            .map(|_| Vec::with_capacity(frames))
            .collect();

        let mut start = 0;
        while start < frames {
            let end = (start + self.quantum).min(frames);
            for (source, out) in pcm.channels().iter().zip(destination.iter_mut()) {
                out.extend(source[start..end].iter().map(|s| s * gain));
            }
            start = end;
        }

        Ok(PcmBuffer::new(destination, pcm.sample_rate())?)
    }
}

impl Default for OfflineRenderer {
    fn default() -> Self {
        Self {
            quantum: DEFAULT_RENDER_QUANTUM,
        }
    }
}

/// Render `pcm` with a constant linear gain using the default quantum
///
/// # Errors
/// Returns an error if `linear_gain` is not a finite, non-negative number
pub fn render_with_gain(pcm: &PcmBuffer, linear_gain: f64) -> Result<PcmBuffer> {
    OfflineRenderer::default().render(pcm, linear_gain)
}
