//! WAV export
//!
//! Renders a track at its current gain and encodes it as a RIFF/WAVE file in
//! memory. Bundling several exports into an archive is left to the caller.

use crate::error::{AudioError, Result};
use crate::render::OfflineRenderer;
use mixdown_core::PcmBuffer;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::info;

/// Sample encoding for exported WAV files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WavSampleFormat {
    /// 16-bit signed integer PCM
    #[default]
    Int16,
    /// 32-bit IEEE float
    Float32,
}

/// Scale a float sample to 16-bit, asymmetric like most browser encoders
fn to_i16(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Encode PCM as an in-memory WAV file
///
/// # Errors
/// Returns an error if the channel count does not fit a WAV header or
/// encoding fails
pub fn encode_wav(pcm: &PcmBuffer, format: WavSampleFormat) -> Result<Vec<u8>> {
    let channels = u16::try_from(pcm.channel_count()).map_err(|_| {
        AudioError::ExportError(format!("Too many channels: {}", pcm.channel_count()))
    })?;

    let spec = match format {
        WavSampleFormat::Int16 => hound::WavSpec {
            channels,
            sample_rate: pcm.sample_rate().as_hz(),
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        },
        WavSampleFormat::Float32 => hound::WavSpec {
            channels,
            sample_rate: pcm.sample_rate().as_hz(),
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        },
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for frame in 0..pcm.frames() {
            for channel in pcm.channels() {
                match format {
                    WavSampleFormat::Int16 => writer.write_sample(to_i16(channel[frame]))?,
                    WavSampleFormat::Float32 => writer.write_sample(channel[frame])?,
                }
            }
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

/// Render `pcm` at `linear_gain` and encode the result as WAV
///
/// # Errors
/// Returns a render error for an invalid gain, or an export error
pub fn export_wav(
    renderer: &OfflineRenderer,
    pcm: &PcmBuffer,
    linear_gain: f64,
    format: WavSampleFormat,
) -> Result<Vec<u8>> {
    let rendered = renderer.render(pcm, linear_gain)?;
    let bytes = encode_wav(&rendered, format)?;
    info!(
        "Exported {} frames at gain {:.4} ({} bytes)",
        rendered.frames(),
        linear_gain,
        bytes.len()
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixdown_core::SampleRate;

    #[test]
    fn int16_scaling_edges() {
        assert_eq!(to_i16(0.0), 0);
        assert_eq!(to_i16(1.0), i16::MAX);
        assert_eq!(to_i16(-1.0), i16::MIN);
        assert_eq!(to_i16(2.0), i16::MAX);
        assert_eq!(to_i16(-2.0), i16::MIN);
    }

    #[test]
    fn wav_header_and_shape() {
        let pcm = PcmBuffer::silent(2, 100, SampleRate::CD_QUALITY);
        let bytes = encode_wav(&pcm, WavSampleFormat::Int16).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");

        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().bits_per_sample, 16);
        assert_eq!(reader.duration(), 100);
    }

    #[test]
    fn float_export_reads_back_exactly() {
        let left = vec![0.25_f32, -0.5, 0.75];
        let right = vec![-0.25_f32, 0.5, -0.75];
        let pcm = PcmBuffer::new(vec![left, right], SampleRate::new(48_000)).unwrap();

        let bytes = encode_wav(&pcm, WavSampleFormat::Float32).unwrap();
        let mut reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().sample_rate, 48_000);
        let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0.25, -0.25, -0.5, 0.5, 0.75, -0.75]);
    }

    #[test]
    fn export_applies_gain() {
        let pcm = PcmBuffer::new(vec![vec![0.5_f32; 4]], SampleRate::CD_QUALITY).unwrap();
        let bytes = export_wav(&OfflineRenderer::default(), &pcm, 0.5, WavSampleFormat::Float32)
            .unwrap();
        let mut reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        assert!(reader.samples::<f32>().all(|s| s.unwrap() == 0.25));
    }
}
