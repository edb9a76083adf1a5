//! Mixdown Audio
//!
//! PCM decoding, offline gain rendering, and WAV export for Mixdown.
//!
//! This crate provides:
//! - In-memory decoding via Symphonia (MP3, FLAC, OGG, WAV, AAC), keeping the
//!   native channel layout and sample rate
//! - An offline (non-realtime) gain renderer
//! - A render worker: an async request/response boundary for offline renders
//! - WAV encoding of rendered buffers via hound
//!
//! # Example: Render and export
//!
//! ```rust
//! use mixdown_audio::{export_wav, OfflineRenderer, WavSampleFormat};
//! use mixdown_core::{PcmBuffer, SampleRate};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pcm = PcmBuffer::silent(2, 4410, SampleRate::CD_QUALITY);
//! let wav = export_wav(&OfflineRenderer::default(), &pcm, 0.5, WavSampleFormat::Int16)?;
//! assert_eq!(&wav[0..4], b"RIFF");
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

mod decoder;
mod error;
mod export;
mod render;
mod worker;

pub use decoder::SymphoniaDecoder;
pub use error::{AudioError, Result};
pub use export::{encode_wav, export_wav, WavSampleFormat};
pub use render::{render_with_gain, OfflineRenderer, DEFAULT_RENDER_QUANTUM};
pub use worker::{RenderRequest, RenderWorker};
