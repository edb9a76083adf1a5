//! A loaded track

use crate::gain::TrackGain;
use crate::state::NormalizationState;
use mixdown_analysis::AnalysisError;
use mixdown_core::{AudioAsset, TrackIndex};
use mixdown_loudness::MeterPanel;

/// One asset bound to a live gain node
#[derive(Debug)]
pub struct Track {
    pub(crate) index: TrackIndex,
    pub(crate) asset: AudioAsset,
    pub(crate) gain: TrackGain,
    pub(crate) normalization: NormalizationState,
    pub(crate) inert: Option<AnalysisError>,
    pub(crate) meter: MeterPanel,
}

impl Track {
    pub(crate) fn new(index: TrackIndex, asset: AudioAsset, gain: TrackGain) -> Self {
        Self {
            index,
            asset,
            gain,
            normalization: NormalizationState::Idle,
            inert: None,
            meter: MeterPanel::new(),
        }
    }

    /// Stable ordinal
    pub fn index(&self) -> TrackIndex {
        self.index
    }

    /// Display name (the file name)
    pub fn name(&self) -> &str {
        self.asset.name()
    }

    /// Raw audio
    pub fn asset(&self) -> &AudioAsset {
        &self.asset
    }

    /// Gain model
    pub fn gain(&self) -> &TrackGain {
        &self.gain
    }

    /// Normalization state
    pub fn normalization(&self) -> &NormalizationState {
        &self.normalization
    }

    /// Loudness display values
    pub fn meter(&self) -> &MeterPanel {
        &self.meter
    }

    /// Decode failure that made the track inert
    pub fn inert_error(&self) -> Option<&AnalysisError> {
        self.inert.as_ref()
    }

    /// The track's audio could not be decoded
    pub fn is_inert(&self) -> bool {
        self.inert.is_some()
    }
}
