//! Mixdown Session
//!
//! The mixer session: every loaded track's composable gain, its
//! normalization state, and the commands that act on all tracks at once.
//!
//! The [`Mixer`] owns every track. Analysis runs on the shared
//! [`AnalysisScheduler`](mixdown_analysis::AnalysisScheduler); results come
//! back through [`Mixer::apply_result`], which drops anything that no longer
//! matches the track.
//!
//! # Example
//!
//! ```rust,no_run
//! use mixdown_analysis::MixerConfig;
//! use mixdown_audio::SymphoniaDecoder;
//! use mixdown_core::{AtomicGainNode, AudioAsset, MemoryStore};
//! use mixdown_session::{Mixer, MixerCommand};
//! use std::sync::Arc;
//!
//! # async fn example(drums: Vec<u8>, bass: Vec<u8>) -> mixdown_session::Result<()> {
//! let mut mixer = Mixer::new(
//!     MixerConfig::load(None)?,
//!     Arc::new(SymphoniaDecoder::new()),
//!     Arc::new(MemoryStore::new()),
//! )?;
//!
//! mixer.add_track(AudioAsset::new("drums.wav", drums), Arc::new(AtomicGainNode::new()));
//! mixer.add_track(AudioAsset::new("bass.wav", bass), Arc::new(AtomicGainNode::new()));
//!
//! for outcome in mixer.dispatch(MixerCommand::NormalizeAll).await? {
//!     println!("{:?}", outcome);
//! }
//!
//! let files = mixer.export_all().await?;
//! # let _ = files;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

mod commands;
mod error;
mod gain;
mod mixer;
pub mod persistence;
mod state;
mod track;

pub use commands::{ApplyOutcome, MixerCommand};
pub use error::{Result, SessionError};
pub use gain::{
    apply_equalization, format_gain_db, AlwaysConfirm, BoostConfirmation, GainModifiers,
    GainSnapshot, TrackGain, EQUALIZATION_MODIFIER, NORMALIZATION_MODIFIER, POLICY_MODIFIERS,
};
pub use mixer::{export_file_name, Mixer};
pub use state::NormalizationState;
pub use track::Track;
