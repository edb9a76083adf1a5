//! Analysis jobs and their handles

use crate::error::{AnalysisError, Result};
use mixdown_core::{AudioAsset, GainNode, TrackIndex};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;

/// Gain a job renders its audio at
#[derive(Clone)]
pub enum JobGain {
    /// Linear gain fixed at submission
    Fixed(f64),
    /// Linear gain read from a live source when the job starts
    Live(Arc<dyn GainNode>),
}

impl JobGain {
    /// Current value of the gain
    pub fn read(&self) -> f64 {
        match self {
            Self::Fixed(gain) => *gain,
            Self::Live(source) => source.gain(),
        }
    }
}

impl fmt::Debug for JobGain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(gain) => f.debug_tuple("Fixed").field(gain).finish(),
            Self::Live(source) => f.debug_tuple("Live").field(&source.gain()).finish(),
        }
    }
}

/// Request to measure the integrated loudness of a track at a gain
#[derive(Debug, Clone)]
pub struct AnalysisJob {
    /// Track the result is for
    pub track: TrackIndex,
    /// Audio to analyze
    pub asset: AudioAsset,
    /// Gain the audio is rendered at before measuring
    pub gain: JobGain,
    /// Run through the single-slot exclusive path
    pub exclusive: bool,
    /// When the job was created
    pub submitted_at: Instant,
}

impl AnalysisJob {
    /// Create a job at a fixed linear gain
    pub fn new(track: TrackIndex, asset: AudioAsset, gain: f64) -> Self {
        Self::with_gain(track, asset, JobGain::Fixed(gain))
    }

    /// Create a job that reads its gain from `source` once it starts
    ///
    /// Combined with [`exclusive`](Self::exclusive), the read happens only
    /// after every earlier exclusive job has resolved.
    pub fn live(track: TrackIndex, asset: AudioAsset, source: Arc<dyn GainNode>) -> Self {
        Self::with_gain(track, asset, JobGain::Live(source))
    }

    fn with_gain(track: TrackIndex, asset: AudioAsset, gain: JobGain) -> Self {
        Self {
            track,
            asset,
            gain,
            exclusive: false,
            submitted_at: Instant::now(),
        }
    }

    /// Route the job through the exclusive slot
    ///
    /// Exclusive jobs run strictly in submission order, each starting only
    /// after the previous one resolved.
    #[must_use]
    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }
}

/// Identity of one submission
///
/// Callers compare `(track, gain)` against the track's current state before
/// applying a result; `generation` orders submissions for the same track.
#[derive(Debug, Clone)]
pub struct JobTicket {
    /// Track the job was submitted for
    pub track: TrackIndex,
    /// Per-scheduler submission counter
    pub generation: u64,
    /// Gain at submission (a live gain is sampled when submitting)
    pub gain: f64,
    superseded: Arc<AtomicBool>,
}

impl JobTicket {
    pub(crate) fn new(track: TrackIndex, generation: u64, gain: f64) -> Self {
        Self {
            track,
            generation,
            gain,
            superseded: Arc::new(AtomicBool::new(false)),
        }
    }

    /// True once a newer job for the same track has been submitted
    pub fn is_superseded(&self) -> bool {
        self.superseded.load(Ordering::Acquire)
    }

    pub(crate) fn supersede(&self) {
        self.superseded.store(true, Ordering::Release);
    }

    /// True if this submission was made for `track` at `gain`
    pub fn matches(&self, track: TrackIndex, gain: f64) -> bool {
        self.track == track && self.gain == gain
    }
}

/// Outcome of a successful job
#[derive(Debug, Clone)]
pub struct LoudnessResult {
    /// Submission this result belongs to
    pub ticket: JobTicket,
    /// Linear gain the audio was measured at
    pub gain: f64,
    /// Integrated loudness in LUFS; `-inf` for silence
    pub integrated_lufs: f64,
    /// Answered from the cache without running the pipeline
    pub cached: bool,
}

/// Handle to a submitted job
///
/// Dropping the handle does not stop the job.
#[derive(Debug)]
pub struct JobHandle {
    ticket: JobTicket,
    task: JoinHandle<Result<LoudnessResult>>,
}

impl JobHandle {
    pub(crate) fn new(ticket: JobTicket, task: JoinHandle<Result<LoudnessResult>>) -> Self {
        Self { ticket, task }
    }

    /// Submission identity
    pub fn ticket(&self) -> &JobTicket {
        &self.ticket
    }

    /// Wait for the job's result
    pub async fn join(self) -> Result<LoudnessResult> {
        self.task
            .await
            .map_err(|e| AnalysisError::Aborted(e.to_string()))?
    }
}
