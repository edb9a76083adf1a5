//! Render worker message boundary
//!
//! Offline renders run behind an asynchronous request/response channel, the
//! way a page hands PCM to a background worker: each request carries the PCM
//! channel buffers and a gain scalar, and receives exactly one response with
//! the rendered buffer (or the error). There are no partial responses.
//!
//! Requests are processed one at a time in arrival order.

use crate::error::{AudioError, Result};
use crate::render::OfflineRenderer;
use mixdown_core::{PcmBuffer, SampleRate};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Pending requests the worker will buffer before `render` waits
const REQUEST_QUEUE_DEPTH: usize = 16;

/// A render request as sent over the worker boundary
#[derive(Debug)]
pub struct RenderRequest {
    /// Planar PCM channel buffers
    pub channels: Vec<Vec<f32>>,
    /// Sample rate of the channel buffers
    pub sample_rate: SampleRate,
    /// Linear gain to apply
    pub gain: f64,
    reply: oneshot::Sender<Result<PcmBuffer>>,
}

/// Handle to a running render worker
///
/// Cloning the handle shares the same worker.
#[derive(Debug, Clone)]
pub struct RenderWorker {
    requests: mpsc::Sender<RenderRequest>,
}

impl RenderWorker {
    /// Spawn a worker task on the current Tokio runtime
    ///
    /// The worker stops once every handle has been dropped.
    pub fn spawn(renderer: OfflineRenderer) -> Self {
        let (requests, mut inbox) = mpsc::channel::<RenderRequest>(REQUEST_QUEUE_DEPTH);

        tokio::spawn(async move {
            debug!("Render worker started (quantum {})", renderer.quantum());
            while let Some(request) = inbox.recv().await {
                let RenderRequest {
                    channels,
                    sample_rate,
                    gain,
                    reply,
                } = request;

                let result = tokio::task::spawn_blocking(move || -> Result<PcmBuffer> {
                    let pcm = PcmBuffer::new(channels, sample_rate)?;
                    renderer.render(&pcm, gain)
                })
                .await
                .unwrap_or_else(|e| {
                    Err(AudioError::RenderError(format!("Render task failed: {}", e)))
                });

                if reply.send(result).is_err() {
                    warn!("Render requester went away before the response");
                }
            }
            debug!("Render worker stopped");
        });

        Self { requests }
    }

    /// Send PCM and a gain to the worker and wait for the rendered buffer
    ///
    /// # Errors
    /// Returns the render error, or `WorkerStopped` if the worker is gone
    pub async fn render(&self, pcm: PcmBuffer, gain: f64) -> Result<PcmBuffer> {
        let sample_rate = pcm.sample_rate();
        let (reply, response) = oneshot::channel();
        let request = RenderRequest {
            channels: pcm.into_channels(),
            sample_rate,
            gain,
            reply,
        };

        self.requests
            .send(request)
            .await
            .map_err(|_| AudioError::WorkerStopped)?;

        response.await.map_err(|_| AudioError::WorkerStopped)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(frames: usize) -> PcmBuffer {
        let ch: Vec<f32> = (0..frames).map(|i| ((i % 50) as f32 / 50.0) - 0.5).collect();
        PcmBuffer::new(vec![ch.clone(), ch], SampleRate::CD_QUALITY).unwrap()
    }

    #[tokio::test]
    async fn worker_returns_rendered_buffer() {
        let worker = RenderWorker::spawn(OfflineRenderer::default());
        let pcm = tone(1000);
        let expected = crate::render_with_gain(&pcm, 0.25).unwrap();

        let rendered = worker.render(pcm, 0.25).await.unwrap();
        assert_eq!(rendered, expected);
    }

    #[tokio::test]
    async fn worker_reports_errors_as_responses() {
        let worker = RenderWorker::spawn(OfflineRenderer::default());
        let err = worker.render(tone(10), f64::NAN).await.unwrap_err();
        assert!(matches!(err, AudioError::RenderError(_)));

        // Still serving after an error
        assert!(worker.render(tone(10), 1.0).await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_requests_each_get_their_own_response() {
        let worker = RenderWorker::spawn(OfflineRenderer::default());
        let gains = [0.1, 0.5, 1.0, 2.0];
        let futures = gains.iter().copied().map(|g| {
            let worker = worker.clone();
            let pcm = tone(64);
            async move { (g, worker.render(pcm, g).await.unwrap()) }
        });

        for (gain, rendered) in futures_join(futures).await {
            let expected = crate::render_with_gain(&tone(64), gain).unwrap();
            assert_eq!(rendered, expected);
        }
    }

    async fn futures_join<F, T>(futures: impl Iterator<Item = F>) -> Vec<T>
    where
        F: std::future::Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let handles: Vec<_> = futures.map(tokio::spawn).collect();
        let mut out = Vec::new();
        for handle in handles {
            out.push(handle.await.unwrap());
        }
        out
    }
}
