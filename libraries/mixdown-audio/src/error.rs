/// Audio-specific errors
use thiserror::Error;

/// Result type alias using `AudioError`
pub type Result<T> = std::result::Result<T, AudioError>;

/// Audio error types
#[derive(Error, Debug)]
pub enum AudioError {
    /// Unsupported or unrecognised container/codec
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Decoding error
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Offline render failure
    #[error("Render error: {0}")]
    RenderError(String),

    /// WAV encoding failure
    #[error("Export error: {0}")]
    ExportError(String),

    /// Invalid audio buffer
    #[error("Invalid audio buffer: {0}")]
    InvalidBuffer(String),

    /// The render worker is gone
    #[error("Render worker stopped")]
    WorkerStopped,

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<hound::Error> for AudioError {
    fn from(err: hound::Error) -> Self {
        Self::ExportError(err.to_string())
    }
}

impl From<mixdown_core::MixError> for AudioError {
    fn from(err: mixdown_core::MixError) -> Self {
        match err {
            mixdown_core::MixError::Decode(msg) => Self::DecodeError(msg),
            mixdown_core::MixError::Render(msg) => Self::RenderError(msg),
            other => Self::InvalidBuffer(other.to_string()),
        }
    }
}

impl From<AudioError> for mixdown_core::MixError {
    fn from(err: AudioError) -> Self {
        match err {
            AudioError::UnsupportedFormat(_) | AudioError::DecodeError(_) => {
                mixdown_core::MixError::decode(err.to_string())
            }
            AudioError::Io(e) => mixdown_core::MixError::Io(e),
            _ => mixdown_core::MixError::render(err.to_string()),
        }
    }
}
