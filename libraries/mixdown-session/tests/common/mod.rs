//! Shared helpers for mixdown-session integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use mixdown_analysis::MixerConfig;
use mixdown_core::{
    AssetBytes, AtomicGainNode, AudioAsset, KeyValueStore, MemoryStore, MixError, PcmBuffer,
    PcmDecoder, SampleRate,
};
use mixdown_session::Mixer;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

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

/// Decoder that reads the tone amplitude from the asset bytes
///
/// `bad...` fails to decode, `silence...` decodes to one second of silence,
/// `<amplitude> <name>` decodes to a one-second stereo tone.
#[derive(Default)]
pub struct ToneDecoder {
    calls: AtomicUsize,
}

impl ToneDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total `decode` calls
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PcmDecoder for ToneDecoder {
    async fn decode(&self, bytes: AssetBytes) -> mixdown_core::Result<PcmBuffer> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        if bytes.starts_with(b"bad") {
            return Err(MixError::decode("not audio"));
        }
        if bytes.starts_with(b"silence") {
            return Ok(PcmBuffer::silent(2, 44_100, SampleRate::CD_QUALITY));
        }

        let text = String::from_utf8_lossy(&bytes);
        let amplitude = text
            .split_whitespace()
            .next()
            .and_then(|a| a.parse::<f32>().ok())
            .ok_or_else(|| MixError::decode("no amplitude"))?;
        Ok(tone(amplitude))
    }
}

/// One second of a stereo 1 kHz tone at 44.1 kHz
pub fn tone(amplitude: f32) -> PcmBuffer {
    let channel: Vec<f32> = (0..44_100)
        .map(|i| {
            let t = i as f32 / 44_100.0;
            amplitude * (2.0 * std::f32::consts::PI * 1000.0 * t).sin()
        })
        .collect();
    PcmBuffer::new(vec![channel.clone(), channel], SampleRate::CD_QUALITY).unwrap()
}

/// Asset that decodes to a tone of `amplitude`
pub fn tone_asset(name: &str, amplitude: f32) -> AudioAsset {
    AudioAsset::new(name, format!("{} {}", amplitude, name).into_bytes())
}

/// Asset that fails to decode
pub fn bad_asset(name: &str) -> AudioAsset {
    AudioAsset::new(name, format!("bad {}", name).into_bytes())
}

/// Asset that decodes to silence
pub fn silent_asset(name: &str) -> AudioAsset {
    AudioAsset::new(name, format!("silence {}", name).into_bytes())
}

pub struct Harness {
    pub mixer: Mixer,
    pub decoder: Arc<ToneDecoder>,
    pub store: Arc<MemoryStore>,
}

/// Mixer over a fresh store
pub fn harness(config: MixerConfig) -> Harness {
    harness_with_store(config, Arc::new(MemoryStore::new()))
}

/// Mixer over an existing store
pub fn harness_with_store(config: MixerConfig, store: Arc<MemoryStore>) -> Harness {
    init_tracing();
    let decoder = Arc::new(ToneDecoder::new());
    let mixer = Mixer::new(
        config,
        decoder.clone(),
        store.clone() as Arc<dyn KeyValueStore>,
    )
    .unwrap();
    Harness {
        mixer,
        decoder,
        store,
    }
}

/// Fresh live gain node
pub fn node() -> Arc<AtomicGainNode> {
    Arc::new(AtomicGainNode::new())
}
