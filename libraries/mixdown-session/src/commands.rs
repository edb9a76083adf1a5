//! Typed mixer commands
//!
//! Cross-track operations are dispatched as commands to the [`Mixer`], which
//! owns every track's gain model.
//!
//! [`Mixer`]: crate::Mixer

use crate::error::SessionError;
use mixdown_core::TrackIndex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Command applied to all tracks at once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixerCommand {
    /// Reset every slider to 0 dB, drop every modifier and switch
    /// normalization off
    UndoAllGains,
    /// Measure and normalize every track, with the configured mode
    NormalizeAll,
    /// Normalize every track one after another, then equalize downward to
    /// the highest-gain track
    AutoEqualize,
}

/// What happened to one analysis result
#[derive(Debug, Clone)]
pub enum ApplyOutcome {
    /// The `Normalization` modifier was set
    Applied {
        /// Track
        track: TrackIndex,
        /// Modifier value
        gain_reduction_db: f64,
    },
    /// The result no longer matched the track and was dropped
    Stale {
        /// Track
        track: TrackIndex,
    },
    /// Analysis or policy failed; the track shows the error
    Failed {
        /// Track
        track: TrackIndex,
        /// Failure
        error: Arc<SessionError>,
    },
}

impl ApplyOutcome {
    /// Track the outcome is for
    pub fn track(&self) -> TrackIndex {
        match self {
            Self::Applied { track, .. } | Self::Stale { track } | Self::Failed { track, .. } => {
                *track
            }
        }
    }

    /// True for `Applied`
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// True for `Stale`
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }
}
