//! Bounded-concurrency analysis scheduler
//!
//! Every heavy pipeline (decode, offline render, measure) holds a *context*
//! for its whole duration. A single admission task hands out contexts from a
//! semaphore in the order they were requested, and a job's request is queued
//! synchronously in [`AnalysisScheduler::submit`]. At most `max_concurrent`
//! pipelines run at once and waiting jobs are admitted in submission order.
//! A context is released when its guard drops, on every exit path.
//!
//! Exclusive jobs are chained: each one waits until the previous exclusive
//! job has resolved, then reads its gain, and only then requests a context.
//!
//! Superseding is cooperative. A newer submission for the same track marks
//! the older ticket, but the older job still runs and returns its result;
//! callers drop results that no longer match the track's gain.

use crate::cache::ResultCache;
use crate::error::{AnalysisError, Result};
use crate::job::{AnalysisJob, JobHandle, JobTicket, LoudnessResult};
use crate::settings::AnalysisSettings;
use mixdown_audio::{encode_wav, OfflineRenderer, RenderWorker, WavSampleFormat};
use mixdown_core::{AudioAsset, PcmBuffer, PcmDecoder, TrackIndex};
use mixdown_loudness::{format_lufs, LoudnessMeter};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info, warn};

/// Pending request for a pipeline context
type ContextRequest = oneshot::Receiver<OwnedSemaphorePermit>;

/// Analysis job scheduler
///
/// Cloning shares the same scheduler.
#[derive(Clone)]
pub struct AnalysisScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    admission: mpsc::UnboundedSender<oneshot::Sender<OwnedSemaphorePermit>>,
    max_concurrent: usize,
    exclusive_tail: Mutex<Option<oneshot::Receiver<()>>>,
    decoder: Arc<dyn PcmDecoder>,
    renderer: RenderWorker,
    cache: Arc<ResultCache>,
    latest: Mutex<HashMap<TrackIndex, JobTicket>>,
    next_generation: AtomicU64,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// Place of a submitted job in the admission order
enum Turn {
    /// Context already requested at submission
    Pooled(ContextRequest),
    /// Waits for the previous exclusive job; `slot` is released on drop
    Exclusive {
        previous: Option<oneshot::Receiver<()>>,
        slot: oneshot::Sender<()>,
    },
}

/// A held pipeline context
struct PipelineContext<'a> {
    _permit: OwnedSemaphorePermit,
    inner: &'a Inner,
}

impl Drop for PipelineContext<'_> {
    fn drop(&mut self) {
        let remaining = self.inner.in_flight.fetch_sub(1, Ordering::AcqRel) - 1;
        debug!("Released pipeline context ({} in flight)", remaining);
    }
}

/// Grant contexts strictly in request order
async fn admit(
    contexts: Arc<Semaphore>,
    mut requests: mpsc::UnboundedReceiver<oneshot::Sender<OwnedSemaphorePermit>>,
) {
    while let Some(waiter) = requests.recv().await {
        if waiter.is_closed() {
            continue;
        }
        let Ok(permit) = Arc::clone(&contexts).acquire_owned().await else {
            break;
        };
        // A waiter that left in the meantime returns the permit on drop
        let _ = waiter.send(permit);
    }
    debug!("Admission queue closed");
}

impl Inner {
    fn request_context(&self) -> ContextRequest {
        let (waiter, request) = oneshot::channel();
        if self.admission.send(waiter).is_err() {
            warn!("Admission queue is closed");
        }
        request
    }

    async fn admitted(&self, request: ContextRequest) -> Result<PipelineContext<'_>> {
        let permit = request
            .await
            .map_err(|_| AnalysisError::Aborted("Scheduler closed".to_string()))?;

        let now = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::AcqRel);
        debug!("Acquired pipeline context ({} in flight)", now);

        Ok(PipelineContext {
            _permit: permit,
            inner: self,
        })
    }

    async fn decode_and_render(&self, asset: &AudioAsset, gain: f64) -> Result<PcmBuffer> {
        let pcm = self.decoder.decode(asset.bytes()).await?;
        Ok(self.renderer.render(pcm, gain).await?)
    }

    async fn run(
        &self,
        job: AnalysisJob,
        ticket: JobTicket,
        turn: Turn,
    ) -> Result<LoudnessResult> {
        let (request, _slot) = match turn {
            Turn::Pooled(request) => (Some(request), None),
            Turn::Exclusive { previous, slot } => {
                if let Some(previous) = previous {
                    // Resolves when the previous exclusive job drops its slot
                    let _ = previous.await;
                }
                (None, Some(slot))
            }
        };

        let gain = job.gain.read();
        let hash = job.asset.content_hash().clone();
        if let Some(integrated_lufs) = self.cache.get(&hash, gain) {
            return Ok(LoudnessResult {
                ticket,
                gain,
                integrated_lufs,
                cached: true,
            });
        }

        let request = request.unwrap_or_else(|| self.request_context());
        let _context = self.admitted(request).await?;
        let rendered = self.decode_and_render(&job.asset, gain).await?;
        let integrated_lufs =
            tokio::task::spawn_blocking(move || LoudnessMeter::new().measure_integrated(&rendered))
                .await
                .map_err(|e| AnalysisError::Aborted(e.to_string()))??;

        self.cache.put(&hash, gain, integrated_lufs);
        info!(
            "Track {} '{}' measured {} LUFS at gain {:.4} ({:.0?})",
            job.track,
            job.asset.name(),
            format_lufs(integrated_lufs),
            gain,
            job.submitted_at.elapsed()
        );

        Ok(LoudnessResult {
            ticket,
            gain,
            integrated_lufs,
            cached: false,
        })
    }
}

impl AnalysisScheduler {
    /// Create a scheduler and start its admission and render workers
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        decoder: Arc<dyn PcmDecoder>,
        settings: &AnalysisSettings,
        cache: Arc<ResultCache>,
    ) -> Result<Self> {
        if settings.max_concurrent == 0 {
            return Err(AnalysisError::Config(
                "At least one pipeline context is required".to_string(),
            ));
        }
        let renderer = OfflineRenderer::new(settings.render_quantum)?;

        let (admission, requests) = mpsc::unbounded_channel();
        tokio::spawn(admit(
            Arc::new(Semaphore::new(settings.max_concurrent)),
            requests,
        ));

        Ok(Self {
            inner: Arc::new(Inner {
                admission,
                max_concurrent: settings.max_concurrent,
                exclusive_tail: Mutex::new(None),
                decoder,
                renderer: RenderWorker::spawn(renderer),
                cache,
                latest: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(1),
                in_flight: AtomicUsize::new(0),
                peak_in_flight: AtomicUsize::new(0),
            }),
        })
    }

    fn issue_ticket(&self, job: &AnalysisJob) -> JobTicket {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let ticket = JobTicket::new(job.track, generation, job.gain.read());

        let previous = self
            .inner
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(job.track, ticket.clone());
        if let Some(previous) = previous {
            previous.supersede();
            debug!(
                "Job {} for track {} superseded by job {}",
                previous.generation, job.track, generation
            );
        }
        ticket
    }

    /// Reserve the job's place in line
    fn take_turn(&self, job: &AnalysisJob) -> Turn {
        if !job.exclusive {
            return Turn::Pooled(self.inner.request_context());
        }

        let (slot, next) = oneshot::channel();
        let previous = self
            .inner
            .exclusive_tail
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(next);
        Turn::Exclusive { previous, slot }
    }

    /// Submit a job
    ///
    /// The job's place in the admission order is fixed before this returns.
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, job: AnalysisJob) -> JobHandle {
        let ticket = self.issue_ticket(&job);
        let turn = self.take_turn(&job);
        debug!(
            "Submitted job {} for track {} at gain {:.4}{}",
            ticket.generation,
            job.track,
            ticket.gain,
            if job.exclusive { " (exclusive)" } else { "" }
        );

        let inner = Arc::clone(&self.inner);
        let job_ticket = ticket.clone();
        let task = tokio::spawn(async move {
            let track = job.track;
            let result = inner.run(job, job_ticket, turn).await;
            if let Err(e) = &result {
                error!("Analysis of track {} failed: {}", track, e);
            }
            result
        });

        JobHandle::new(ticket, task)
    }

    /// Submit a job and wait for its result
    pub async fn analyze(&self, job: AnalysisJob) -> Result<LoudnessResult> {
        self.submit(job).join().await
    }

    /// Wait for every handle, keeping submission order
    pub async fn join_all(handles: Vec<JobHandle>) -> Vec<Result<LoudnessResult>> {
        futures_util::future::join_all(handles.into_iter().map(JobHandle::join)).await
    }

    /// Render `asset` at `gain` and encode it as WAV
    ///
    /// Holds a pipeline context like an analysis job.
    pub async fn export(
        &self,
        asset: &AudioAsset,
        gain: f64,
        format: WavSampleFormat,
    ) -> Result<Vec<u8>> {
        let _context = self.inner.admitted(self.inner.request_context()).await?;
        let rendered = self.inner.decode_and_render(asset, gain).await?;
        let bytes = tokio::task::spawn_blocking(move || encode_wav(&rendered, format))
            .await
            .map_err(|e| AnalysisError::Aborted(e.to_string()))??;

        info!(
            "Exported '{}' at gain {:.4} ({} bytes)",
            asset.name(),
            gain,
            bytes.len()
        );
        Ok(bytes)
    }

    /// Latest submission for `track`
    pub fn latest_ticket(&self, track: TrackIndex) -> Option<JobTicket> {
        self.inner
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&track)
            .cloned()
    }

    /// Drop the bookkeeping for a removed track
    ///
    /// Returns the track's latest ticket, if any. Jobs already running still
    /// resolve.
    pub fn forget(&self, track: TrackIndex) -> Option<JobTicket> {
        self.inner
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&track)
    }

    /// Pipelines currently holding a context
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Highest number of simultaneous pipelines seen
    pub fn peak_in_flight(&self) -> usize {
        self.inner.peak_in_flight.load(Ordering::Acquire)
    }

    /// Configured context cap
    pub fn max_concurrent(&self) -> usize {
        self.inner.max_concurrent
    }

    /// Shared result cache
    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.inner.cache
    }
}

impl std::fmt::Debug for AnalysisScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisScheduler")
            .field("max_concurrent", &self.inner.max_concurrent)
            .field("in_flight", &self.in_flight())
            .field("cache", &self.inner.cache)
            .finish()
    }
}
