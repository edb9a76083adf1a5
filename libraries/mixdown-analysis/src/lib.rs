//! Mixdown Analysis
//!
//! The loudness analysis engine: schedules "measure track X at gain G" jobs,
//! runs the heavy pipeline (decode, offline render, measure) under a global
//! concurrency cap, and memoizes results by content hash and gain.
//!
//! # Architecture
//!
//! ```text
//! AnalysisJob ──► AnalysisScheduler ──► ResultCache hit? ──► LoudnessResult
//!                   │ (context cap)            │ miss
//!                   ▼                          ▼
//!             PcmDecoder ──► RenderWorker ──► LoudnessMeter ──► ResultCache
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use mixdown_analysis::{AnalysisJob, AnalysisScheduler, MixerConfig, ResultCache};
//! use mixdown_audio::SymphoniaDecoder;
//! use mixdown_core::{AudioAsset, TrackIndex};
//! use std::sync::Arc;
//!
//! # async fn example(bytes: Vec<u8>) -> mixdown_analysis::Result<()> {
//! let config = MixerConfig::load(None)?;
//! let scheduler = AnalysisScheduler::new(
//!     Arc::new(SymphoniaDecoder::new()),
//!     &config.analysis,
//!     Arc::new(ResultCache::new()),
//! )?;
//!
//! let job = AnalysisJob::new(TrackIndex::new(0), AudioAsset::new("drums.wav", bytes), 1.0);
//! let result = scheduler.analyze(job).await?;
//! println!("{} LUFS", result.integrated_lufs);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

mod cache;
mod error;
mod job;
mod scheduler;
mod settings;

pub use cache::{CacheKey, CacheStats, ResultCache};
pub use error::{AnalysisError, Result};
pub use job::{AnalysisJob, JobGain, JobHandle, JobTicket, LoudnessResult};
pub use scheduler::AnalysisScheduler;
pub use settings::{
    AnalysisSettings, ExportSettings, GainSettings, MixerConfig, NormalizationSettings, ENV_PREFIX,
};
