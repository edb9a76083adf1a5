//! The mixer: tracks, their gains, and cross-track operations
//!
//! The mixer owns all per-track state, including what the policy compares
//! across tracks. Analysis results come back through [`Mixer::apply_result`],
//! which applies a result only if it belongs to the track's pending job and
//! the track is still at the gain the job measured at.

use crate::commands::{ApplyOutcome, MixerCommand};
use crate::error::{Result, SessionError};
use crate::gain::{
    apply_equalization, AlwaysConfirm, BoostConfirmation, GainSnapshot, TrackGain,
    EQUALIZATION_MODIFIER, NORMALIZATION_MODIFIER,
};
use crate::persistence;
use crate::state::NormalizationState;
use crate::track::Track;
use mixdown_analysis::{
    AnalysisError, AnalysisJob, AnalysisScheduler, JobHandle, JobTicket, LoudnessResult,
    MixerConfig, ResultCache,
};
use mixdown_core::{AudioAsset, GainNode, KeyValueStore, PcmDecoder, TrackIndex};
use mixdown_loudness::{
    relative_adjustment_db, LoudnessReading, MeterMode, NormalizationMode, NormalizationPolicy,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Multi-track mixer session
pub struct Mixer {
    tracks: BTreeMap<TrackIndex, Track>,
    next_index: usize,
    scheduler: AnalysisScheduler,
    policy: NormalizationPolicy,
    config: MixerConfig,
    store: Arc<dyn KeyValueStore>,
    confirm: Arc<dyn BoostConfirmation>,
}

/// File name used for a track's WAV export
pub fn export_file_name(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => format!("{}.wav", stem),
        _ => format!("{}.wav", name),
    }
}

impl Mixer {
    /// Create a mixer
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        config: MixerConfig,
        decoder: Arc<dyn PcmDecoder>,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        config.validate()?;

        let cache = if config.analysis.persist_cache {
            ResultCache::with_store(Arc::clone(&store))
        } else {
            ResultCache::new()
        };
        let scheduler = AnalysisScheduler::new(decoder, &config.analysis, Arc::new(cache))?;

        Ok(Self {
            tracks: BTreeMap::new(),
            next_index: 0,
            scheduler,
            policy: config.policy(),
            config,
            store,
            confirm: Arc::new(AlwaysConfirm),
        })
    }

    /// Use `confirm` to approve boosts above the configured threshold
    #[must_use]
    pub fn with_confirmation(mut self, confirm: Arc<dyn BoostConfirmation>) -> Self {
        self.confirm = confirm;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &MixerConfig {
        &self.config
    }

    /// Analysis scheduler shared by all tracks
    pub fn scheduler(&self) -> &AnalysisScheduler {
        &self.scheduler
    }

    // ===== Tracks =====

    /// Load a track, restoring its persisted gain
    pub fn add_track(&mut self, asset: AudioAsset, node: Arc<dyn GainNode>) -> TrackIndex {
        let snapshot = match persistence::load_gain(self.store.as_ref(), asset.name()) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Ignoring stored gain of '{}': {}", asset.name(), e);
                GainSnapshot::default()
            }
        };

        let index = TrackIndex::new(self.next_index);
        self.next_index += 1;

        let gain = TrackGain::restore(node, snapshot);
        info!(
            "Added track {} '{}' ({} bytes) at {:.2} dB",
            index,
            asset.name(),
            asset.len(),
            gain.effective_gain_db()
        );
        self.tracks.insert(index, Track::new(index, asset, gain));
        index
    }

    /// Remove a track; other indices are unchanged
    pub fn remove_track(&mut self, index: TrackIndex) -> Result<Track> {
        let track = self
            .tracks
            .remove(&index)
            .ok_or(SessionError::TrackNotFound(index))?;
        self.scheduler.forget(index);
        Ok(track)
    }

    /// Remove every track
    pub fn clear(&mut self) {
        for index in self.indices() {
            self.scheduler.forget(index);
        }
        self.tracks.clear();
    }

    /// Look up a track
    pub fn track(&self, index: TrackIndex) -> Result<&Track> {
        self.tracks
            .get(&index)
            .ok_or(SessionError::TrackNotFound(index))
    }

    fn track_mut(&mut self, index: TrackIndex) -> Result<&mut Track> {
        self.tracks
            .get_mut(&index)
            .ok_or(SessionError::TrackNotFound(index))
    }

    /// Tracks in index order
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    /// Number of tracks
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Check if no tracks are loaded
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    fn indices(&self) -> Vec<TrackIndex> {
        self.tracks.keys().copied().collect()
    }

    fn persist(&self, index: TrackIndex) -> Result<()> {
        let track = self.track(index)?;
        persistence::save_gain(self.store.as_ref(), track.name(), &track.gain.snapshot())
    }

    // ===== Gain =====

    /// Set a track's slider value
    ///
    /// Any finite value is accepted. Values above the confirmation
    /// threshold are passed to the boost confirmation first; a declined
    /// boost leaves the gain unchanged.
    pub fn set_base_gain(&mut self, index: TrackIndex, db: f64) -> Result<()> {
        let name = self.track(index)?.name().to_string();
        if db > self.config.gain.confirm_above_db && !self.confirm.confirm_boost(&name, db) {
            warn!("Boost of {:.1} dB on '{}' declined", db, name);
            return Err(SessionError::BoostRejected {
                track: name,
                gain_db: db,
            });
        }

        self.track_mut(index)?.gain.set_base_gain_db(db)?;
        debug!("Track {} base gain {:.2} dB", index, db);
        self.persist(index)
    }

    /// Return a track's slider to 0 dB
    pub fn reset_base_gain(&mut self, index: TrackIndex) -> Result<()> {
        self.track_mut(index)?.gain.reset_base_gain();
        self.persist(index)
    }

    /// Insert or replace a named modifier
    pub fn set_modifier(&mut self, index: TrackIndex, name: &str, db: f64) -> Result<()> {
        self.track_mut(index)?.gain.set_modifier(name, db)?;
        self.persist(index)
    }

    /// Remove a named modifier
    pub fn clear_modifier(&mut self, index: TrackIndex, name: &str) -> Result<Option<f64>> {
        let removed = self.track_mut(index)?.gain.clear_modifier(name);
        self.persist(index)?;
        Ok(removed)
    }

    /// Effective linear gain of a track
    pub fn effective_gain_linear(&self, index: TrackIndex) -> Result<f64> {
        Ok(self.track(index)?.gain.effective_gain_linear())
    }

    // ===== Normalization =====

    /// Exclusive jobs read the track's gain when they get the slot; pooled
    /// jobs are pinned to the gain at submission.
    fn submit_analysis(&mut self, index: TrackIndex, exclusive: bool) -> Result<JobHandle> {
        let track = self.track(index)?;
        let asset = track.asset.clone();
        let job = if exclusive {
            AnalysisJob::live(index, asset, track.gain.analysis_source()).exclusive()
        } else {
            AnalysisJob::new(index, asset, track.gain.analysis_gain_linear())
        };

        let handle = self.scheduler.submit(job);
        let track = self.track_mut(index)?;
        track.inert = None;
        track.normalization = NormalizationState::Loading {
            ticket: handle.ticket().clone(),
        };
        Ok(handle)
    }

    /// Switch normalization on for a track
    ///
    /// Submits an analysis unless the track is already normalized, and
    /// returns its handle. Activating a loading track resubmits at the
    /// current gain and supersedes the pending job. Activating an errored
    /// or inert track clears the error and retries.
    pub fn activate_normalization(&mut self, index: TrackIndex) -> Result<Option<JobHandle>> {
        if matches!(
            self.track(index)?.normalization,
            NormalizationState::Measured { .. }
        ) {
            return Ok(None);
        }
        self.submit_analysis(index, false).map(Some)
    }

    /// Switch normalization off and drop the `Normalization` modifier
    pub fn deactivate_normalization(&mut self, index: TrackIndex) -> Result<()> {
        let track = self.track_mut(index)?;
        track.normalization = NormalizationState::Idle;
        track.gain.clear_modifier(NORMALIZATION_MODIFIER);
        self.persist(index)?;

        if self.policy.mode == NormalizationMode::Relative {
            self.reapply_relative()?;
        }
        Ok(())
    }

    /// Wait for a job and apply its result
    pub async fn complete(&mut self, handle: JobHandle) -> ApplyOutcome {
        let ticket = handle.ticket().clone();
        let result = handle.join().await;
        self.apply_result(&ticket, result)
    }

    /// Activate normalization for a track and wait for the outcome
    pub async fn normalize_track(&mut self, index: TrackIndex) -> Result<ApplyOutcome> {
        match self.activate_normalization(index)? {
            Some(handle) => Ok(self.complete(handle).await),
            None => Ok(ApplyOutcome::Applied {
                track: index,
                gain_reduction_db: self
                    .track(index)?
                    .normalization
                    .gain_reduction_db()
                    .unwrap_or(0.0),
            }),
        }
    }

    /// Apply the result of the job identified by `ticket`
    ///
    /// The result is dropped as stale unless the track still exists, is
    /// waiting for exactly this job, and is still at the gain the job
    /// measured at (the gain at submission for failed jobs).
    pub fn apply_result(
        &mut self,
        ticket: &JobTicket,
        result: std::result::Result<LoudnessResult, AnalysisError>,
    ) -> ApplyOutcome {
        let index = ticket.track;
        let Some(track) = self.tracks.get_mut(&index) else {
            debug!("Dropping result for removed track {}", index);
            return ApplyOutcome::Stale { track: index };
        };

        let pending = track
            .normalization
            .pending()
            .map(|pending| pending.generation);
        let measured_gain = result.as_ref().map_or(ticket.gain, |r| r.gain);
        if pending != Some(ticket.generation)
            || measured_gain != track.gain.analysis_gain_linear()
        {
            debug!(
                "Dropping stale result of job {} for track {} (state {})",
                ticket.generation,
                index,
                track.normalization.name()
            );
            return ApplyOutcome::Stale { track: index };
        }

        let outcome = match result {
            Ok(result) => {
                track.meter.update(&LoudnessReading::new(
                    MeterMode::Integrated,
                    result.integrated_lufs,
                ));
                match self.policy.reduction_db(result.integrated_lufs) {
                    Ok(reduction) => Self::apply_reduction(track, result.integrated_lufs, reduction),
                    Err(e) => Self::fail(track, SessionError::Loudness(e)),
                }
            }
            Err(e) => {
                if e.is_decode() {
                    track.inert = Some(e.clone());
                }
                Self::fail(track, SessionError::Analysis(e))
            }
        };

        if let Err(e) = self.persist(index) {
            warn!("Failed to persist gain of track {}: {}", index, e);
        }

        if outcome.is_applied() && self.policy.mode == NormalizationMode::Relative {
            if let Err(e) = self.reapply_relative() {
                warn!("Relative normalization failed: {}", e);
            }
            if let Ok(track) = self.track(index) {
                if let Some(gain_reduction_db) = track.normalization.gain_reduction_db() {
                    return ApplyOutcome::Applied {
                        track: index,
                        gain_reduction_db,
                    };
                }
            }
        }
        outcome
    }

    fn apply_reduction(track: &mut Track, measured_lufs: f64, reduction: f64) -> ApplyOutcome {
        match track.gain.set_modifier(NORMALIZATION_MODIFIER, reduction) {
            Ok(()) => {
                track.normalization = NormalizationState::Measured {
                    measured_lufs,
                    gain_reduction_db: reduction,
                };
                info!(
                    "Normalized track {} '{}': {:.1} LUFS, {:+.2} dB",
                    track.index,
                    track.name(),
                    measured_lufs,
                    reduction
                );
                ApplyOutcome::Applied {
                    track: track.index,
                    gain_reduction_db: reduction,
                }
            }
            Err(e) => Self::fail(track, e),
        }
    }

    fn fail(track: &mut Track, error: SessionError) -> ApplyOutcome {
        error!("Normalization of track {} '{}' failed: {}", track.index, track.name(), error);
        let error = Arc::new(error);
        track.gain.clear_modifier(NORMALIZATION_MODIFIER);
        track.normalization = NormalizationState::Errored {
            error: Arc::clone(&error),
        };
        ApplyOutcome::Failed {
            track: track.index,
            error,
        }
    }

    /// Give every measured track the shared relative adjustment
    fn reapply_relative(&mut self) -> Result<()> {
        let measured: Vec<f64> = self
            .tracks
            .values()
            .filter_map(|t| t.normalization.measured_lufs())
            .collect();
        if measured.is_empty() {
            return Ok(());
        }

        let shared = relative_adjustment_db(&measured, self.policy.target_lufs)?;
        for index in self.indices() {
            let track = self.track_mut(index)?;
            if let NormalizationState::Measured { measured_lufs, .. } = track.normalization {
                track.gain.set_modifier(NORMALIZATION_MODIFIER, shared)?;
                track.normalization = NormalizationState::Measured {
                    measured_lufs,
                    gain_reduction_db: shared,
                };
                self.persist(index)?;
            }
        }
        debug!("Relative normalization: {:+.2} dB on {} tracks", shared, measured.len());
        Ok(())
    }

    fn inert_outcome(track: &Track) -> Option<ApplyOutcome> {
        track.inert.as_ref().map(|e| ApplyOutcome::Failed {
            track: track.index,
            error: Arc::new(SessionError::Analysis(e.clone())),
        })
    }

    // ===== Commands =====

    /// Run a command against every track
    ///
    /// Returns one outcome per analyzed track (none for `UndoAllGains`).
    pub async fn dispatch(&mut self, command: MixerCommand) -> Result<Vec<ApplyOutcome>> {
        info!("Dispatching {:?} to {} tracks", command, self.len());
        match command {
            MixerCommand::UndoAllGains => {
                self.undo_all_gains()?;
                Ok(Vec::new())
            }
            MixerCommand::NormalizeAll => self.normalize_all().await,
            MixerCommand::AutoEqualize => self.auto_equalize().await,
        }
    }

    fn undo_all_gains(&mut self) -> Result<()> {
        for index in self.indices() {
            let track = self.track_mut(index)?;
            track.gain.reset_base_gain();
            track.gain.clear_modifiers();
            track.normalization = NormalizationState::Idle;
            track.meter.reset();
            self.persist(index)?;
        }
        Ok(())
    }

    async fn normalize_all(&mut self) -> Result<Vec<ApplyOutcome>> {
        let mut outcomes = Vec::new();
        let mut handles = Vec::new();
        for index in self.indices() {
            match Self::inert_outcome(self.track(index)?) {
                Some(outcome) => outcomes.push(outcome),
                None => handles.push(self.submit_analysis(index, false)?),
            }
        }

        let tickets: Vec<JobTicket> = handles.iter().map(|h| h.ticket().clone()).collect();
        let results = AnalysisScheduler::join_all(handles).await;
        for (ticket, result) in tickets.iter().zip(results) {
            outcomes.push(self.apply_result(ticket, result));
        }

        // Relative mode may have changed earlier tracks after they were applied
        if self.policy.mode == NormalizationMode::Relative {
            for outcome in &mut outcomes {
                if let ApplyOutcome::Applied {
                    track,
                    gain_reduction_db,
                } = outcome
                {
                    if let Some(current) = self
                        .tracks
                        .get(track)
                        .and_then(|t| t.normalization.gain_reduction_db())
                    {
                        *gain_reduction_db = current;
                    }
                }
            }
        }

        outcomes.sort_by_key(ApplyOutcome::track);
        Ok(outcomes)
    }

    async fn auto_equalize(&mut self) -> Result<Vec<ApplyOutcome>> {
        let mut outcomes = Vec::new();
        for index in self.indices() {
            self.track_mut(index)?
                .gain
                .clear_modifier(EQUALIZATION_MODIFIER);

            if let Some(outcome) = Self::inert_outcome(self.track(index)?) {
                outcomes.push(outcome);
                continue;
            }
            // One job at a time through the exclusive slot
            let handle = self.submit_analysis(index, true)?;
            outcomes.push(self.complete(handle).await);
        }

        apply_equalization(
            self.tracks
                .values_mut()
                .filter(|t| matches!(t.normalization, NormalizationState::Measured { .. }))
                .map(|t| &mut t.gain),
        );
        for index in self.indices() {
            self.persist(index)?;
        }
        Ok(outcomes)
    }

    // ===== Export =====

    /// Render a track at its current gain and encode it as WAV
    pub async fn export_track(&self, index: TrackIndex) -> Result<Vec<u8>> {
        let track = self.track(index)?;
        if let Some(e) = &track.inert {
            return Err(SessionError::Analysis(e.clone()));
        }
        Ok(self
            .scheduler
            .export(
                &track.asset,
                track.gain.effective_gain_linear(),
                self.config.export.sample_format,
            )
            .await?)
    }

    /// Export every playable track as `(file name, WAV bytes)`
    ///
    /// Inert tracks are skipped. Bundling is up to the caller.
    pub async fn export_all(&self) -> Result<Vec<(String, Vec<u8>)>> {
        let exports = self.tracks.values().filter(|t| !t.is_inert()).map(|track| async move {
            let bytes = self.export_track(track.index).await?;
            Ok::<_, SessionError>((export_file_name(track.name()), bytes))
        });

        let files = futures_util::future::join_all(exports)
            .await
            .into_iter()
            .collect::<Result<Vec<_>>>()?;
        info!("Exported {} tracks", files.len());
        Ok(files)
    }
}

impl std::fmt::Debug for Mixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mixer")
            .field("tracks", &self.tracks.len())
            .field("policy", &self.policy)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}
