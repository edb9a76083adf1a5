/// Audio-related types
use crate::error::{MixError, Result};
use serde::{Deserialize, Serialize};

/// Sample rate in Hz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleRate(pub u32);

impl SampleRate {
    /// 44.1 kHz
    pub const CD_QUALITY: Self = Self(44_100);

    /// Create a new sample rate
    #[must_use]
    pub fn new(hz: u32) -> Self {
        Self(hz)
    }

    /// Get the sample rate as Hz
    pub fn as_hz(&self) -> u32 {
        self.0
    }
}

/// Decoded multichannel PCM at its native sample rate
///
/// Samples are stored planar (one `Vec<f32>` per channel), nominally in
/// `[-1.0, 1.0]`. Every channel has the same number of frames.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: SampleRate,
}

impl PcmBuffer {
    /// Create a buffer from planar channel data
    ///
    /// # Errors
    /// Returns an error if there are no channels or the channels differ in length
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: SampleRate) -> Result<Self> {
        let Some(first) = channels.first() else {
            return Err(MixError::invalid_input("PCM buffer needs at least one channel"));
        };
        let frames = first.len();
        if let Some(bad) = channels.iter().position(|ch| ch.len() != frames) {
            return Err(MixError::invalid_input(format!(
                "channel {} has {} frames, expected {}",
                bad,
                channels[bad].len(),
                frames
            )));
        }
        if sample_rate.as_hz() == 0 {
            return Err(MixError::invalid_input("sample rate must be non-zero"));
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Create a buffer of digital silence
    pub fn silent(channel_count: usize, frames: usize, sample_rate: SampleRate) -> Self {
        Self {
            channels: vec![vec![0.0; frames]; channel_count.max(1)],
            sample_rate,
        }
    }

    /// Create a buffer from interleaved samples (`[L, R, L, R, ...]`)
    ///
    /// # Errors
    /// Returns an error if the sample count is not divisible by the channel count
    pub fn from_interleaved(
        samples: &[f32],
        channel_count: usize,
        sample_rate: SampleRate,
    ) -> Result<Self> {
        if channel_count == 0 || samples.len() % channel_count != 0 {
            return Err(MixError::invalid_input(format!(
                "Sample count {} is not divisible by channel count {}",
                samples.len(),
                channel_count
            )));
        }
        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (ch, sample) in channels.iter_mut().zip(frame) {
                ch.push(*sample);
            }
        }
        Self::new(channels, sample_rate)
    }

    /// Number of channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Sample rate of the buffer
    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate.as_hz() as f64
    }

    /// Check if the buffer holds no frames
    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Samples of one channel
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// All channels, planar
    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Mutable access to all channels (lengths cannot change)
    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        self.channels.iter_mut().map(Vec::as_mut_slice)
    }

    /// Take the planar channel data out of the buffer
    pub fn into_channels(self) -> Vec<Vec<f32>> {
        self.channels
    }

    /// Interleave into a single `[L, R, L, R, ...]` vector
    pub fn interleaved(&self) -> Vec<f32> {
        let frames = self.frames();
        let mut out = Vec::with_capacity(frames * self.channel_count());
        for i in 0..frames {
            for ch in &self.channels {
                out.push(ch[i]);
            }
        }
        out
    }
}
