//! Error types for the analysis pipeline

use mixdown_audio::AudioError;
use mixdown_core::MixError;
use mixdown_loudness::LoudnessError;
use thiserror::Error;

/// Result type for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Typed failure of an analysis job or of the engine setup
///
/// Cloneable so a failed track can keep its error as state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Malformed or unsupported audio bytes
    #[error("Decode error: {0}")]
    Decode(String),

    /// Offline render failure
    #[error("Render error: {0}")]
    Render(String),

    /// Loudness measurement failure
    #[error("Measurement error: {0}")]
    Measure(String),

    /// The job's task ended without producing a result
    #[error("Analysis job aborted: {0}")]
    Aborted(String),

    /// Persistence failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AnalysisError {
    /// True for errors caused by the audio data itself
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

impl From<AudioError> for AnalysisError {
    fn from(err: AudioError) -> Self {
        match err {
            AudioError::UnsupportedFormat(_) | AudioError::DecodeError(_) | AudioError::Io(_) => {
                Self::Decode(err.to_string())
            }
            AudioError::RenderError(_)
            | AudioError::ExportError(_)
            | AudioError::InvalidBuffer(_)
            | AudioError::WorkerStopped => Self::Render(err.to_string()),
        }
    }
}

impl From<MixError> for AnalysisError {
    fn from(err: MixError) -> Self {
        match err {
            MixError::Decode(msg) => Self::Decode(msg),
            MixError::Render(msg) => Self::Render(msg),
            MixError::Storage(msg) => Self::Storage(msg),
            MixError::Serialization(e) => Self::Storage(e.to_string()),
            MixError::Io(e) => Self::Decode(e.to_string()),
            MixError::InvalidInput(msg) => Self::Render(msg),
        }
    }
}

impl From<LoudnessError> for AnalysisError {
    fn from(err: LoudnessError) -> Self {
        Self::Measure(err.to_string())
    }
}

impl From<config::ConfigError> for AnalysisError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
