//! Error types for loudness metering and normalization

use thiserror::Error;

/// Result type for loudness operations
pub type Result<T> = std::result::Result<T, LoudnessError>;

/// Errors that can occur during loudness measurement or normalization
#[derive(Error, Debug)]
pub enum LoudnessError {
    /// EBU R128 analysis error
    #[error("EBU R128 analysis failed: {0}")]
    AnalysisError(String),

    /// A chunk did not match the meter's channel layout
    #[error("Channel count mismatch: meter has {expected}, chunk has {actual}")]
    ChannelMismatch {
        /// Channels the meter was created for
        expected: usize,
        /// Channels in the offered chunk
        actual: usize,
    },

    /// Audio is completely silent; a reduction would be +inf dB
    #[error("Audio is silent (no loudness data available)")]
    SilentAudio,

    /// Measurement is NaN or +inf
    #[error("Invalid loudness measurement: {0}")]
    InvalidMeasurement(f64),

    /// Normalization target is not a finite LUFS value
    #[error("Invalid normalization target: {0} LUFS")]
    InvalidTarget(f64),

    /// Relative normalization was asked for with no tracks
    #[error("No measurements to normalize")]
    NoMeasurements,
}

impl From<ebur128::Error> for LoudnessError {
    fn from(err: ebur128::Error) -> Self {
        Self::AnalysisError(format!("{:?}", err))
    }
}
