//! Mixdown Core
//!
//! Platform-agnostic core types, collaborator traits, and error handling for Mixdown.
//!
//! This crate provides the building blocks shared by the analysis engine and the
//! mixer session:
//! - **Domain Types**: `AudioAsset`, `PcmBuffer`, `SampleRate`, `TrackIndex`
//! - **Collaborator Traits**: `PcmDecoder`, `GainNode`, `KeyValueStore`
//! - **Error Handling**: Unified `MixError` and `Result` types
//!
//! The live playback graph, file picking and persistence backends are external;
//! they plug in through the traits defined here.
//!
//! # Example
//!
//! ```rust
//! use mixdown_core::{AudioAsset, PcmBuffer, SampleRate};
//!
//! let asset = AudioAsset::new("drums.wav", vec![0u8; 16]);
//! assert_eq!(asset.content_hash().as_str().len(), 64);
//!
//! let pcm = PcmBuffer::silent(2, 44_100, SampleRate::CD_QUALITY);
//! assert_eq!(pcm.frames(), 44_100);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod storage;
pub mod traits;
pub mod types;

pub use error::{MixError, Result};
pub use storage::{KeyValueStore, MemoryStore, StoreChange};
pub use traits::{AtomicGainNode, GainNode, PcmDecoder};
pub use types::{AssetBytes, AudioAsset, ContentHash, PcmBuffer, SampleRate, TrackIndex};

/// Convert a gain in decibels to a linear multiplier (`10^(dB/20)`)
pub fn db_to_linear(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Convert a linear multiplier to decibels (`20 * log10(gain)`)
///
/// Returns `-inf` for a zero gain.
pub fn linear_to_db(gain: f64) -> f64 {
    if gain > 0.0 {
        20.0 * gain.log10()
    } else {
        f64::NEG_INFINITY
    }
}
