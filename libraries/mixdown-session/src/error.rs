//! Error types for the mixer session

use mixdown_analysis::AnalysisError;
use mixdown_core::{MixError, TrackIndex};
use mixdown_loudness::LoudnessError;
use thiserror::Error;

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Session errors
#[derive(Error, Debug)]
pub enum SessionError {
    /// Decode, render or measurement failure of an analysis job
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// The measurement could not be turned into a gain (e.g. silence)
    #[error(transparent)]
    Loudness(#[from] LoudnessError),

    /// No track with this index
    #[error("Track not found: {0}")]
    TrackNotFound(TrackIndex),

    /// Gain value is NaN or infinite
    #[error("Invalid gain: {0} dB")]
    InvalidGain(f64),

    /// A boost above the confirmation threshold was declined
    #[error("Boost of {gain_db} dB on '{track}' was not confirmed")]
    BoostRejected {
        /// Track name
        track: String,
        /// Requested base gain
        gain_db: f64,
    },

    /// Persistence failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl SessionError {
    /// True if the error comes from the track's audio data
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Analysis(e) if e.is_decode())
    }
}

impl From<MixError> for SessionError {
    fn from(err: MixError) -> Self {
        Self::Storage(err.to_string())
    }
}
