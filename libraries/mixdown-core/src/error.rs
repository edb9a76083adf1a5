/// Core error types for Mixdown
use thiserror::Error;

/// Result type alias using `MixError`
pub type Result<T> = std::result::Result<T, MixError>;

/// Core error type for Mixdown
#[derive(Error, Debug)]
pub enum MixError {
    /// Audio bytes could not be decoded into PCM
    #[error("Decode error: {0}")]
    Decode(String),

    /// Offline render pipeline failure
    #[error("Render error: {0}")]
    Render(String),

    /// Persistence collaborator errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MixError {
    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a render error
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
