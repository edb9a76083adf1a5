//! Loudness normalization policy
//!
//! Pure functions turning measured integrated loudness into gain adjustments:
//! - Per-track: each track is moved to the target (`target - L`)
//! - Relative: every track receives the smallest per-track adjustment, so no
//!   track ends above the target and the balance between tracks is kept
//! - Equalize: after normalization, pull every track down to the level of the
//!   highest-gain track (never raises a track)

use crate::error::{LoudnessError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// EBU R128 broadcast reference level (-23 LUFS)
pub const EBU_R128_BROADCAST_LUFS: f64 = -23.0;

/// Streaming reference level (-14 LUFS, common for streaming platforms)
pub const EBU_R128_STREAMING_LUFS: f64 = -14.0;

/// Default normalization target
pub const DEFAULT_TARGET_LUFS: f64 = EBU_R128_STREAMING_LUFS;

/// How measured loudness is turned into per-track adjustments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationMode {
    /// Every track is moved to the target independently
    #[default]
    PerTrack,
    /// All tracks share the quietest-needed adjustment
    Relative,
}

impl NormalizationMode {
    /// Convert to string for settings persistence
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PerTrack => "per_track",
            Self::Relative => "relative",
        }
    }
}

impl fmt::Display for NormalizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NormalizationMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "per_track" | "track" => Ok(Self::PerTrack),
            "relative" | "album" => Ok(Self::Relative),
            other => Err(format!("Unknown normalization mode: {}", other)),
        }
    }
}

fn check_target(target_lufs: f64) -> Result<()> {
    if target_lufs.is_finite() {
        Ok(())
    } else {
        Err(LoudnessError::InvalidTarget(target_lufs))
    }
}

/// Gain in dB that moves a track measured at `measured_lufs` to `target_lufs`
///
/// Exactly `target_lufs - measured_lufs`.
///
/// # Errors
/// Returns `SilentAudio` for a `-inf` measurement (the reduction would be
/// `+inf` dB), `InvalidMeasurement` for NaN or `+inf`, and `InvalidTarget`
/// for a non-finite target
pub fn gain_reduction_db(measured_lufs: f64, target_lufs: f64) -> Result<f64> {
    check_target(target_lufs)?;
    if measured_lufs == f64::NEG_INFINITY {
        return Err(LoudnessError::SilentAudio);
    }
    if !measured_lufs.is_finite() {
        return Err(LoudnessError::InvalidMeasurement(measured_lufs));
    }
    Ok(target_lufs - measured_lufs)
}

/// Shared adjustment for relative normalization: `min_i(target - L_i)`
///
/// Silent measurements are skipped; they cannot be normalized.
///
/// # Errors
/// Returns `NoMeasurements` for an empty slice, `SilentAudio` if every
/// measurement is silent, or the error of an invalid measurement
pub fn relative_adjustment_db(measured_lufs: &[f64], target_lufs: f64) -> Result<f64> {
    check_target(target_lufs)?;
    if measured_lufs.is_empty() {
        return Err(LoudnessError::NoMeasurements);
    }

    let mut adjustment: Option<f64> = None;
    for &measured in measured_lufs {
        match gain_reduction_db(measured, target_lufs) {
            Ok(reduction) => {
                adjustment = Some(adjustment.map_or(reduction, |a| a.min(reduction)));
            }
            Err(LoudnessError::SilentAudio) => {}
            Err(e) => return Err(e),
        }
    }

    adjustment.ok_or(LoudnessError::SilentAudio)
}

/// Equalization modifiers for a set of post-normalization gains (dB)
///
/// With `max = max(gains)`, track `i` receives `-(max - gains[i])`. The
/// highest-gain track gets `0`; every value is `<= 0`, so no track's gain
/// increases.
pub fn equalize_db(normalized_gains_db: &[f64]) -> Vec<f64> {
    let max_gain = normalized_gains_db
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);

    normalized_gains_db
        .iter()
        .map(|&gain| {
            let adjustment = -(max_gain - gain);
            // -0.0 reads oddly in the UI
            if adjustment == 0.0 {
                0.0
            } else {
                adjustment
            }
        })
        .collect()
}

/// Target and mode, as configured for a mixer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizationPolicy {
    /// Reference loudness in LUFS
    pub target_lufs: f64,
    /// Per-track or relative
    pub mode: NormalizationMode,
}

impl NormalizationPolicy {
    /// Create a policy
    pub fn new(target_lufs: f64, mode: NormalizationMode) -> Self {
        Self { target_lufs, mode }
    }

    /// Adjustment for one track measured at `measured_lufs`
    ///
    /// # Errors
    /// See [`gain_reduction_db`]
    pub fn reduction_db(&self, measured_lufs: f64) -> Result<f64> {
        gain_reduction_db(measured_lufs, self.target_lufs)
    }

    /// Adjustments for a set of tracks, one per measurement
    ///
    /// In per-track mode each entry is that track's own reduction (silent
    /// tracks yield `SilentAudio`). In relative mode every entry is the
    /// shared adjustment.
    ///
    /// # Errors
    /// In relative mode, returns the error of [`relative_adjustment_db`]
    pub fn adjustments_db(&self, measured_lufs: &[f64]) -> Result<Vec<Result<f64>>> {
        match self.mode {
            NormalizationMode::PerTrack => Ok(measured_lufs
                .iter()
                .map(|&measured| self.reduction_db(measured))
                .collect()),
            NormalizationMode::Relative => {
                let shared = relative_adjustment_db(measured_lufs, self.target_lufs)?;
                Ok(measured_lufs.iter().map(|_| Ok(shared)).collect())
            }
        }
    }
}

impl Default for NormalizationPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_LUFS, NormalizationMode::PerTrack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_track_scenario() {
        assert_eq!(gain_reduction_db(-20.0, -14.0).unwrap(), 6.0);
        assert_eq!(gain_reduction_db(-10.0, -14.0).unwrap(), -4.0);
    }

    #[test]
    fn silence_is_rejected_not_applied() {
        assert!(matches!(
            gain_reduction_db(f64::NEG_INFINITY, -14.0),
            Err(LoudnessError::SilentAudio)
        ));
        assert!(matches!(
            gain_reduction_db(f64::NAN, -14.0),
            Err(LoudnessError::InvalidMeasurement(_))
        ));
        assert!(matches!(
            gain_reduction_db(-20.0, f64::INFINITY),
            Err(LoudnessError::InvalidTarget(_))
        ));
    }

    #[test]
    fn relative_uses_smallest_adjustment() {
        // A needs +6, B needs -4: both get -4
        assert_eq!(relative_adjustment_db(&[-20.0, -10.0], -14.0).unwrap(), -4.0);
        assert_eq!(
            relative_adjustment_db(&[-20.0, f64::NEG_INFINITY], -14.0).unwrap(),
            6.0
        );
        assert!(matches!(
            relative_adjustment_db(&[], -14.0),
            Err(LoudnessError::NoMeasurements)
        ));
        assert!(matches!(
            relative_adjustment_db(&[f64::NEG_INFINITY], -14.0),
            Err(LoudnessError::SilentAudio)
        ));
    }

    #[test]
    fn equalize_pulls_down_to_highest_gain() {
        let adjustments = equalize_db(&[6.0, -4.0, 1.5]);
        assert_eq!(adjustments, vec![0.0, -10.0, -4.5]);
        assert!(equalize_db(&[]).is_empty());
    }

    #[test]
    fn policy_modes() {
        let per_track = NormalizationPolicy::default();
        let out = per_track.adjustments_db(&[-20.0, -10.0]).unwrap();
        assert_eq!(out[0].as_ref().unwrap(), &6.0);
        assert_eq!(out[1].as_ref().unwrap(), &-4.0);

        let relative = NormalizationPolicy::new(-14.0, NormalizationMode::Relative);
        let out = relative.adjustments_db(&[-20.0, -10.0]).unwrap();
        assert!(out.iter().all(|a| *a.as_ref().unwrap() == -4.0));
    }

    #[test]
    fn mode_string_round_trip() {
        for mode in [NormalizationMode::PerTrack, NormalizationMode::Relative] {
            assert_eq!(mode.as_str().parse::<NormalizationMode>().unwrap(), mode);
        }
        assert!("loudest".parse::<NormalizationMode>().is_err());
    }
}
