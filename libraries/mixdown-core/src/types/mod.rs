//! Core domain types for Mixdown

pub mod asset;
pub mod audio;
pub mod ids;

pub use asset::{AssetBytes, AudioAsset, ContentHash};
pub use audio::{PcmBuffer, SampleRate};
pub use ids::TrackIndex;
