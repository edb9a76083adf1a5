/// ID types for Mixdown entities
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable ordinal of a track in the mixer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackIndex(pub usize);

impl TrackIndex {
    /// Create a new track index
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Get the index as `usize`
    pub fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for TrackIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<usize> for TrackIndex {
    fn from(index: usize) -> Self {
        Self(index)
    }
}
