//! Per-track normalization state machine
//!
//! ```text
//! Idle ──activate──► Loading ──result──► Measured
//!                      │  ▲
//!               failure│  │activate
//!                      ▼  │
//!                    Errored
//! ```
//!
//! Deactivating from any state returns to `Idle`.

use crate::error::SessionError;
use mixdown_analysis::JobTicket;
use std::sync::Arc;

/// Normalization state of one track
#[derive(Debug, Clone, Default)]
pub enum NormalizationState {
    /// Normalization off
    #[default]
    Idle,
    /// An analysis job is pending; only its result is accepted
    Loading {
        /// The pending submission
        ticket: JobTicket,
    },
    /// Normalization applied
    Measured {
        /// Integrated loudness at the analysis gain
        measured_lufs: f64,
        /// Value of the `Normalization` modifier
        gain_reduction_db: f64,
    },
    /// The last analysis failed; activating again retries
    Errored {
        /// Failure shown on the track
        error: Arc<SessionError>,
    },
}

impl NormalizationState {
    /// Normalization is switched on (any state but `Idle`)
    pub fn force_gain(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    /// An analysis is pending
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    /// Last failure, if any
    pub fn error(&self) -> Option<&Arc<SessionError>> {
        match self {
            Self::Errored { error } => Some(error),
            _ => None,
        }
    }

    /// Measured integrated loudness, if normalized
    pub fn measured_lufs(&self) -> Option<f64> {
        match self {
            Self::Measured { measured_lufs, .. } => Some(*measured_lufs),
            _ => None,
        }
    }

    /// Applied reduction, if normalized
    pub fn gain_reduction_db(&self) -> Option<f64> {
        match self {
            Self::Measured {
                gain_reduction_db, ..
            } => Some(*gain_reduction_db),
            _ => None,
        }
    }

    /// Pending submission, if loading
    pub fn pending(&self) -> Option<&JobTicket> {
        match self {
            Self::Loading { ticket } => Some(ticket),
            _ => None,
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading { .. } => "loading",
            Self::Measured { .. } => "measured",
            Self::Errored { .. } => "errored",
        }
    }
}
