//! Per-track composable gain
//!
//! A track's gain is a user-set base value plus named modifiers, all in dB:
//!
//! ```text
//! effective_db     = base_gain_db + Σ modifiers
//! effective_linear = 10^(effective_db / 20)
//! ```
//!
//! Every mutation pushes the recomputed linear gain to the track's live gain
//! node before returning, so the node never drifts from the model.

use crate::error::{Result, SessionError};
use mixdown_core::{db_to_linear, AtomicGainNode, GainNode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Modifier set by loudness normalization
pub const NORMALIZATION_MODIFIER: &str = "Normalization";

/// Modifier set by the bulk equalize pass
pub const EQUALIZATION_MODIFIER: &str = "Equalization";

/// Modifiers owned by the normalization policy
///
/// Analysis measures a track with these excluded, so re-normalizing never
/// compounds a previous result.
pub const POLICY_MODIFIERS: [&str; 2] = [NORMALIZATION_MODIFIER, EQUALIZATION_MODIFIER];

/// Named dB deltas, unique by name
pub type GainModifiers = BTreeMap<String, f64>;

/// Asks the user before accepting a large boost
pub trait BoostConfirmation: Send + Sync {
    /// Return true to accept `gain_db` on `track_name`
    fn confirm_boost(&self, track_name: &str, gain_db: f64) -> bool;
}

impl<F> BoostConfirmation for F
where
    F: Fn(&str, f64) -> bool + Send + Sync,
{
    fn confirm_boost(&self, track_name: &str, gain_db: f64) -> bool {
        self(track_name, gain_db)
    }
}

/// Accepts every boost
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl BoostConfirmation for AlwaysConfirm {
    fn confirm_boost(&self, _track_name: &str, _gain_db: f64) -> bool {
        true
    }
}

/// Serializable snapshot of a track's gain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GainSnapshot {
    /// Slider value in dB
    pub base_gain_db: f64,
    /// Named modifiers in dB
    pub modifiers: GainModifiers,
}

/// Gain model of one track, bound to its live gain node
pub struct TrackGain {
    base_gain_db: f64,
    modifiers: GainModifiers,
    node: Arc<dyn GainNode>,
    analysis: Arc<AtomicGainNode>,
}

fn check_db(db: f64) -> Result<f64> {
    if db.is_finite() {
        Ok(db)
    } else {
        Err(SessionError::InvalidGain(db))
    }
}

impl TrackGain {
    /// Create a unity gain and push it to `node`
    pub fn new(node: Arc<dyn GainNode>) -> Self {
        Self::restore(node, GainSnapshot::default())
    }

    /// Recreate a gain from a snapshot and push it to `node`
    ///
    /// Non-finite values in the snapshot are dropped.
    pub fn restore(node: Arc<dyn GainNode>, snapshot: GainSnapshot) -> Self {
        let base_gain_db = check_db(snapshot.base_gain_db).unwrap_or(0.0);
        let modifiers = snapshot
            .modifiers
            .into_iter()
            .filter(|(_, db)| db.is_finite())
            .collect();

        let gain = Self {
            base_gain_db,
            modifiers,
            node,
            analysis: Arc::new(AtomicGainNode::new()),
        };
        gain.sync();
        gain
    }

    /// Snapshot for persistence
    pub fn snapshot(&self) -> GainSnapshot {
        GainSnapshot {
            base_gain_db: self.base_gain_db,
            modifiers: self.modifiers.clone(),
        }
    }

    fn sync(&self) {
        self.node.set_gain(self.effective_gain_linear());
        self.analysis.set_gain(self.analysis_gain_linear());
    }

    /// Slider value in dB
    pub fn base_gain_db(&self) -> f64 {
        self.base_gain_db
    }

    /// Set the slider value (unclamped)
    pub fn set_base_gain_db(&mut self, db: f64) -> Result<()> {
        self.base_gain_db = check_db(db)?;
        self.sync();
        Ok(())
    }

    /// Return the slider to 0 dB
    pub fn reset_base_gain(&mut self) {
        self.base_gain_db = 0.0;
        self.sync();
    }

    /// All modifiers
    pub fn modifiers(&self) -> &GainModifiers {
        &self.modifiers
    }

    /// One modifier
    pub fn modifier(&self, name: &str) -> Option<f64> {
        self.modifiers.get(name).copied()
    }

    /// Insert or replace a modifier
    pub fn set_modifier(&mut self, name: &str, db: f64) -> Result<()> {
        self.modifiers.insert(name.to_string(), check_db(db)?);
        self.sync();
        Ok(())
    }

    /// Remove a modifier, returning its value
    pub fn clear_modifier(&mut self, name: &str) -> Option<f64> {
        let removed = self.modifiers.remove(name);
        self.sync();
        removed
    }

    /// Remove every modifier
    pub fn clear_modifiers(&mut self) {
        self.modifiers.clear();
        self.sync();
    }

    /// `base + Σ modifiers` in dB
    pub fn effective_gain_db(&self) -> f64 {
        self.base_gain_db + self.modifiers.values().sum::<f64>()
    }

    /// Effective gain as a linear multiplier
    pub fn effective_gain_linear(&self) -> f64 {
        db_to_linear(self.effective_gain_db())
    }

    /// Linear gain with the policy modifiers left out
    ///
    /// This is the gain a track is measured at before normalization.
    pub fn analysis_gain_linear(&self) -> f64 {
        let db = self.base_gain_db
            + self
                .modifiers
                .iter()
                .filter(|(name, _)| !POLICY_MODIFIERS.contains(&name.as_str()))
                .map(|(_, db)| db)
                .sum::<f64>();
        db_to_linear(db)
    }

    /// Live view of [`analysis_gain_linear`](Self::analysis_gain_linear)
    ///
    /// Kept in step with every mutation, so a job can read it when it starts.
    pub fn analysis_source(&self) -> Arc<dyn GainNode> {
        Arc::clone(&self.analysis) as Arc<dyn GainNode>
    }

    /// The live node this gain drives
    pub fn node(&self) -> &Arc<dyn GainNode> {
        &self.node
    }
}

impl fmt::Debug for TrackGain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackGain")
            .field("base_gain_db", &self.base_gain_db)
            .field("modifiers", &self.modifiers)
            .field("linear", &self.effective_gain_linear())
            .finish()
    }
}

/// Pull every gain down to the highest effective gain among them
///
/// Clears previous equalization, then sets an `Equalization` modifier of
/// `-(max - gain)` on each track below the maximum. No gain increases.
pub fn apply_equalization<'a>(gains: impl IntoIterator<Item = &'a mut TrackGain>) {
    let mut gains: Vec<&mut TrackGain> = gains.into_iter().collect();
    for gain in &mut gains {
        gain.modifiers.remove(EQUALIZATION_MODIFIER);
    }

    let levels: Vec<f64> = gains.iter().map(|g| g.effective_gain_db()).collect();
    let adjustments = mixdown_loudness::equalize_db(&levels);

    for (gain, adjustment) in gains.into_iter().zip(adjustments) {
        if adjustment != 0.0 {
            gain.modifiers
                .insert(EQUALIZATION_MODIFIER.to_string(), adjustment);
        }
        gain.sync();
    }
}

/// Slider label: `+2.5 dB`, `-3.0 dB`, `0.0 dB`
pub fn format_gain_db(db: f64) -> String {
    if db > 0.0 {
        format!("+{:.1} dB", db)
    } else {
        format!("{:.1} dB", db)
    }
}
