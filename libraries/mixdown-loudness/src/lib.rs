//! Loudness metering and normalization for Mixdown
//!
//! This crate provides:
//! - EBU R128 / ITU-R BS.1770 loudness measurement (momentary, short-term,
//!   integrated) as a lazy sequence of readings
//! - Live metering for playing tracks, with reset
//! - Display helpers (silence displays as `0`, one decimal)
//! - The normalization policy: per-track reduction, relative normalization
//!   and bulk equalization
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌────────────────────┐
//! │ PcmBuffer   │ ──► │ LoudnessMeter│ ──► │ LoudnessReading(s) │
//! └─────────────┘     └──────────────┘     └────────────────────┘
//!                                                   │ integrated
//!                                                   ▼
//!                                          ┌────────────────────┐
//!                                          │ NormalizationPolicy│ ──► dB modifier
//!                                          └────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use mixdown_core::{PcmBuffer, SampleRate};
//! use mixdown_loudness::{format_lufs, gain_reduction_db, LoudnessMeter};
//!
//! # fn example() -> mixdown_loudness::Result<()> {
//! let pcm = PcmBuffer::silent(2, 44_100, SampleRate::CD_QUALITY);
//! let lufs = LoudnessMeter::new().measure_integrated(&pcm)?;
//! assert_eq!(format_lufs(lufs), "0.0");
//!
//! assert_eq!(gain_reduction_db(-20.0, -14.0)?, 6.0);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

#![deny(unsafe_code)]

mod error;
mod meter;
mod normalization;

pub use error::{LoudnessError, Result};
pub use meter::{
    display_lufs, format_lufs, LiveMeter, LoudnessMeter, LoudnessReading, MeterMode, MeterPanel,
    Readings,
};
pub use normalization::{
    equalize_db, gain_reduction_db, relative_adjustment_db, NormalizationMode,
    NormalizationPolicy, DEFAULT_TARGET_LUFS, EBU_R128_BROADCAST_LUFS, EBU_R128_STREAMING_LUFS,
};
