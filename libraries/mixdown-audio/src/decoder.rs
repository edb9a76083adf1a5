/// Audio decoder implementation using Symphonia
use crate::error::{AudioError, Result};
use async_trait::async_trait;
use mixdown_core::{AssetBytes, PcmBuffer, PcmDecoder, SampleRate};
use std::io::Cursor;
use std::sync::Arc;
use symphonia::core::audio::{AudioBuffer, Signal, SignalSpec};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// In-memory audio decoder using Symphonia
///
/// Supports: MP3, FLAC, OGG/Vorbis, WAV, AAC/M4A
///
/// Unlike a playback decoder, the output keeps the native channel layout and
/// sample rate: loudness measurement must see the signal exactly as stored.
#[derive(Debug, Clone, Default)]
pub struct SymphoniaDecoder {
    /// Optional file extension used as a probe hint
    extension_hint: Option<String>,
}

impl SymphoniaDecoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder that hints the container format from a file name
    pub fn for_file_name(name: &str) -> Self {
        let extension_hint = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty());
        Self { extension_hint }
    }

    /// Decode a complete in-memory file into planar f32 PCM
    ///
    /// The bytes are read through a cursor over the shared buffer, so the
    /// caller's data is never copied or modified.
    pub fn decode_bytes(&self, bytes: &AssetBytes) -> Result<PcmBuffer> {
        let source = Cursor::new(Arc::clone(bytes));
        let mss = MediaSourceStream::new(Box::new(source), MediaSourceStreamOptions::default());

        let mut hint = Hint::new();
        if let Some(ext) = &self.extension_hint {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| AudioError::UnsupportedFormat(format!("Failed to probe data: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| AudioError::DecodeError("No audio tracks found".to_string()))?;

        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| AudioError::UnsupportedFormat(format!("Failed to create decoder: {}", e)))?;

        let mut channels: Vec<Vec<f32>> = Vec::new();
        let mut scratch: Option<AudioBuffer<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => {
                    return Err(AudioError::DecodeError(format!(
                        "Error reading packet: {}",
                        e
                    )));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Skipping corrupt packet: {}", e);
                    continue;
                }
                Err(e) => return Err(AudioError::DecodeError(format!("Decode error: {}", e))),
            };

            let spec: SignalSpec = *decoded.spec();
            let channel_count = spec.channels.count();

            if channels.is_empty() {
                channels = vec![Vec::new(); channel_count];
            } else if channels.len() != channel_count {
                return Err(AudioError::DecodeError(format!(
                    "Channel count changed mid-stream ({} -> {})",
                    channels.len(),
                    channel_count
                )));
            }
            sample_rate.get_or_insert(spec.rate);

            let reusable = scratch
                .as_ref()
                .is_some_and(|buf| buf.capacity() >= decoded.capacity() && *buf.spec() == spec);
            if !reusable {
                scratch = Some(AudioBuffer::new(decoded.capacity() as u64, spec));
            }

            if let Some(buf) = scratch.as_mut() {
                decoded.convert(buf);
                for (index, out) in channels.iter_mut().enumerate() {
                    out.extend_from_slice(buf.chan(index));
                }
            }
        }

        if channels.is_empty() {
            return Err(AudioError::DecodeError(
                "Stream contained no decodable audio".to_string(),
            ));
        }

        let sample_rate = sample_rate
            .ok_or_else(|| AudioError::DecodeError("Unknown sample rate".to_string()))?;

        let pcm = PcmBuffer::new(channels, SampleRate::new(sample_rate))?;
        debug!(
            "Decoded {} frames x {} channels at {} Hz",
            pcm.frames(),
            pcm.channel_count(),
            sample_rate
        );
        Ok(pcm)
    }
}

#[async_trait]
impl PcmDecoder for SymphoniaDecoder {
    async fn decode(&self, bytes: AssetBytes) -> mixdown_core::Result<PcmBuffer> {
        let decoder = self.clone();
        tokio::task::spawn_blocking(move || decoder.decode_bytes(&bytes))
            .await
            .map_err(|e| mixdown_core::MixError::decode(format!("Decode task failed: {}", e)))?
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_hint_from_file_name() {
        assert_eq!(
            SymphoniaDecoder::for_file_name("Drums.WAV").extension_hint.as_deref(),
            Some("wav")
        );
        assert_eq!(SymphoniaDecoder::for_file_name("noext").extension_hint, None);
        assert_eq!(SymphoniaDecoder::for_file_name("trailing.").extension_hint, None);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let decoder = SymphoniaDecoder::new();
        let bytes: AssetBytes = Arc::from(vec![0x42u8; 1024]);
        let result = decoder.decode_bytes(&bytes);
        assert!(matches!(
            result,
            Err(AudioError::UnsupportedFormat(_) | AudioError::DecodeError(_))
        ));
    }

    #[test]
    fn empty_input_fails_to_decode() {
        let decoder = SymphoniaDecoder::new();
        let bytes: AssetBytes = Arc::from(Vec::<u8>::new());
        assert!(decoder.decode_bytes(&bytes).is_err());
    }

    #[tokio::test]
    async fn async_decode_maps_to_core_decode_error() {
        let decoder = SymphoniaDecoder::new();
        let bytes: AssetBytes = Arc::from(vec![0u8; 64]);
        let err = decoder.decode(bytes).await.unwrap_err();
        assert!(matches!(err, mixdown_core::MixError::Decode(_)));
    }
}
