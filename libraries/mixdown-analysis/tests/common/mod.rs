//! Shared helpers for mixdown-analysis integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use mixdown_core::{AssetBytes, AudioAsset, MixError, PcmBuffer, PcmDecoder, SampleRate};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, Once};
use std::time::Duration;

static INIT: Once = Once::new();

/// Install a test subscriber once per test binary
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .try_init();
    });
}

/// Decoder that counts concurrent invocations and records entry order
///
/// Bytes starting with `bad` fail to decode; bytes starting with `silence`
/// decode to silence; anything else decodes to a half-second stereo tone.
pub struct CountingDecoder {
    active: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
    entries: Mutex<Vec<String>>,
    delay: Duration,
}

impl CountingDecoder {
    pub fn new(delay: Duration) -> Self {
        Self {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            entries: Mutex::new(Vec::new()),
            delay,
        }
    }

    /// Highest number of simultaneous `decode` calls
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Total `decode` calls
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Asset bytes (as text) in the order `decode` was entered
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// `decode` calls currently running
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PcmDecoder for CountingDecoder {
    async fn decode(&self, bytes: AssetBytes) -> mixdown_core::Result<PcmBuffer> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entries
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(&bytes).into_owned());
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        if bytes.starts_with(b"bad") {
            return Err(MixError::decode("not audio"));
        }
        if bytes.starts_with(b"silence") {
            return Ok(PcmBuffer::silent(2, 22_050, SampleRate::CD_QUALITY));
        }
        Ok(tone(0.25, 22_050))
    }
}

/// Stereo 1 kHz tone at 44.1 kHz
pub fn tone(amplitude: f32, frames: usize) -> PcmBuffer {
    let channel: Vec<f32> = (0..frames)
        .map(|i| {
            let t = i as f32 / 44_100.0;
            amplitude * (2.0 * std::f32::consts::PI * 1000.0 * t).sin()
        })
        .collect();
    PcmBuffer::new(vec![channel.clone(), channel], SampleRate::CD_QUALITY).unwrap()
}

/// Asset with unique bytes
pub fn asset(name: &str) -> AudioAsset {
    AudioAsset::new(name, name.as_bytes().to_vec())
}
