//! EBU R128 loudness metering
//!
//! This module wraps the ebur128 crate (ITU-R BS.1770 K-weighting and gating)
//! and exposes its measurements as `LoudnessReading`s:
//! - Momentary loudness (400 ms window)
//! - Short-term loudness (3 s window)
//! - Integrated loudness (gated, whole signal)
//!
//! Fixed buffers are measured lazily through [`Readings`]; continuous sources
//! go through [`LiveMeter`].
//!
//! Silence is reported as `-inf` LUFS. Only the display helpers map it to `0`.

use crate::error::{LoudnessError, Result};
use ebur128::{EbuR128, Mode};
use mixdown_core::PcmBuffer;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use tracing::debug;

/// Readings are emitted every 100 ms of audio
const HOPS_PER_SECOND: u32 = 10;

/// Loudness window type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeterMode {
    /// 400 ms sliding window
    Momentary,
    /// 3 s sliding window
    ShortTerm,
    /// Gated loudness over the whole signal
    Integrated,
}

impl MeterMode {
    /// Every mode
    pub const ALL: [MeterMode; 3] = [Self::Momentary, Self::ShortTerm, Self::Integrated];

    /// Short label for meters
    pub fn label(&self) -> &'static str {
        match self {
            Self::Momentary => "M",
            Self::ShortTerm => "S",
            Self::Integrated => "I",
        }
    }
}

/// One loudness value tagged with its window type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoudnessReading {
    /// Window type
    pub mode: MeterMode,
    /// Loudness in LUFS; `-inf` for silence
    pub value_lufs: f64,
}

impl LoudnessReading {
    /// Create a reading
    pub fn new(mode: MeterMode, value_lufs: f64) -> Self {
        Self { mode, value_lufs }
    }

    /// True when no loudness could be computed (zero power)
    pub fn is_silent(&self) -> bool {
        !self.value_lufs.is_finite()
    }

    /// Value for display: silence shows as `0`
    pub fn display_value(&self) -> f64 {
        display_lufs(self.value_lufs)
    }
}

impl fmt::Display for LoudnessReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} LUFS", self.mode.label(), format_lufs(self.value_lufs))
    }
}

/// Map an internal LUFS value to its display value (`-inf` and NaN become `0`)
pub fn display_lufs(value_lufs: f64) -> f64 {
    if value_lufs.is_finite() {
        value_lufs
    } else {
        0.0
    }
}

/// Format a LUFS value for display with exactly one decimal
///
/// Ties round away from zero, so `-14.25` shows as `-14.3`.
pub fn format_lufs(value_lufs: f64) -> String {
    format!("{:.1}", (display_lufs(value_lufs) * 10.0).round() / 10.0)
}

/// Which windows a measurement should report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ModeSet {
    momentary: bool,
    short_term: bool,
    integrated: bool,
}

impl ModeSet {
    fn from_modes(modes: &[MeterMode]) -> Self {
        let mut set = Self::default();
        for mode in modes {
            match mode {
                MeterMode::Momentary => set.momentary = true,
                MeterMode::ShortTerm => set.short_term = true,
                MeterMode::Integrated => set.integrated = true,
            }
        }
        set
    }

    fn ebur128_mode(self) -> Mode {
        let mut mode = Mode::M;
        if self.short_term {
            mode |= Mode::S;
        }
        if self.integrated {
            mode |= Mode::I;
        }
        mode
    }
}

fn hop_frames(sample_rate: u32) -> usize {
    (sample_rate / HOPS_PER_SECOND).max(1) as usize
}

/// Loudness meter for fixed-length buffers
///
/// # Example
///
/// ```rust
/// use mixdown_core::{PcmBuffer, SampleRate};
/// use mixdown_loudness::{LoudnessMeter, MeterMode};
///
/// # fn example() -> mixdown_loudness::Result<()> {
/// let pcm = PcmBuffer::silent(2, 44_100, SampleRate::CD_QUALITY);
/// let readings = LoudnessMeter::new().measure(&pcm, &[MeterMode::Integrated])?;
/// for reading in readings {
///     println!("{}", reading?);
/// }
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LoudnessMeter;

impl LoudnessMeter {
    /// Create a meter
    pub fn new() -> Self {
        Self
    }

    /// Lazily measure `pcm` for the requested window types
    ///
    /// Momentary and short-term readings are produced every 100 ms of audio.
    /// Integrated mode produces exactly one reading, after the last hop. The
    /// sequence ends once the buffer is exhausted.
    ///
    /// # Errors
    /// Returns an error if the analyzer rejects the channel layout or rate
    pub fn measure<'a>(&self, pcm: &'a PcmBuffer, modes: &[MeterMode]) -> Result<Readings<'a>> {
        let modes = ModeSet::from_modes(modes);
        let analyzer = EbuR128::new(
            pcm.channel_count() as u32,
            pcm.sample_rate().as_hz(),
            modes.ebur128_mode(),
        )?;

        Ok(Readings {
            pcm,
            analyzer,
            modes,
            hop: hop_frames(pcm.sample_rate().as_hz()),
            cursor: 0,
            pending: VecDeque::with_capacity(2),
            finished: false,
        })
    }

    /// Measure only the integrated loudness of `pcm`
    ///
    /// Returns `-inf` for a silent (or empty) buffer.
    ///
    /// # Errors
    /// Returns an error if analysis fails
    pub fn measure_integrated(&self, pcm: &PcmBuffer) -> Result<f64> {
        let mut integrated = None;
        for reading in self.measure(pcm, &[MeterMode::Integrated])? {
            let reading = reading?;
            if reading.mode == MeterMode::Integrated {
                integrated = Some(reading.value_lufs);
            }
        }

        let value = integrated.ok_or_else(|| {
            LoudnessError::AnalysisError("No integrated reading produced".to_string())
        })?;
        debug!(
            "Integrated loudness {} LUFS over {:.2}s",
            format_lufs(value),
            pcm.duration_secs()
        );
        Ok(value)
    }
}

/// Lazy sequence of readings over a fixed buffer
///
/// Created by [`LoudnessMeter::measure`]. After an error the sequence ends.
pub struct Readings<'a> {
    pcm: &'a PcmBuffer,
    analyzer: EbuR128,
    modes: ModeSet,
    hop: usize,
    cursor: usize,
    pending: VecDeque<LoudnessReading>,
    finished: bool,
}

impl Readings<'_> {
    /// Feed the next hop and queue its momentary/short-term readings
    fn advance(&mut self) -> Result<()> {
        let end = (self.cursor + self.hop).min(self.pcm.frames());
        let block: Vec<&[f32]> = self
            .pcm
            .channels()
            .iter()
            .map(|channel| &channel[self.cursor..end])
            .collect();
        self.analyzer.add_frames_planar_f32(&block)?;
        self.cursor = end;

        if self.modes.momentary {
            self.pending.push_back(LoudnessReading::new(
                MeterMode::Momentary,
                self.analyzer.loudness_momentary()?,
            ));
        }
        if self.modes.short_term {
            self.pending.push_back(LoudnessReading::new(
                MeterMode::ShortTerm,
                self.analyzer.loudness_shortterm()?,
            ));
        }
        Ok(())
    }
}

impl Iterator for Readings<'_> {
    type Item = Result<LoudnessReading>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(reading) = self.pending.pop_front() {
                return Some(Ok(reading));
            }
            if self.finished {
                return None;
            }

            if self.cursor < self.pcm.frames() {
                if let Err(e) = self.advance() {
                    self.finished = true;
                    return Some(Err(e));
                }
                continue;
            }

            self.finished = true;
            if self.modes.integrated {
                return Some(
                    self.analyzer
                        .loudness_global()
                        .map(|value| LoudnessReading::new(MeterMode::Integrated, value))
                        .map_err(Into::into),
                );
            }
        }
    }
}

/// Meter for continuous sources (a playing track)
///
/// Feed chunks as they play; each chunk yields the current momentary and
/// short-term values. The sequence never ends on its own: call [`reset`]
/// to restart it.
///
/// [`reset`]: LiveMeter::reset
pub struct LiveMeter {
    analyzer: EbuR128,
    channels: usize,
    sample_rate: u32,
    frames_processed: usize,
}

impl LiveMeter {
    /// Create a live meter for a channel layout and rate
    ///
    /// # Errors
    /// Returns an error if the analyzer rejects the layout or rate
    pub fn new(channels: usize, sample_rate: u32) -> Result<Self> {
        Ok(Self {
            analyzer: Self::analyzer(channels, sample_rate)?,
            channels,
            sample_rate,
            frames_processed: 0,
        })
    }

    fn analyzer(channels: usize, sample_rate: u32) -> Result<EbuR128> {
        Ok(EbuR128::new(
            channels as u32,
            sample_rate,
            Mode::M | Mode::S | Mode::I,
        )?)
    }

    /// Process a chunk and return momentary and short-term readings
    ///
    /// # Errors
    /// Returns an error if the chunk's channel count differs from the meter's
    pub fn process(&mut self, chunk: &PcmBuffer) -> Result<[LoudnessReading; 2]> {
        if chunk.channel_count() != self.channels {
            return Err(LoudnessError::ChannelMismatch {
                expected: self.channels,
                actual: chunk.channel_count(),
            });
        }

        let planes: Vec<&[f32]> = chunk.channels().iter().map(Vec::as_slice).collect();
        self.analyzer.add_frames_planar_f32(&planes)?;
        self.frames_processed += chunk.frames();

        Ok([
            LoudnessReading::new(MeterMode::Momentary, self.analyzer.loudness_momentary()?),
            LoudnessReading::new(MeterMode::ShortTerm, self.analyzer.loudness_shortterm()?),
        ])
    }

    /// Integrated loudness of everything processed since the last reset
    ///
    /// # Errors
    /// Returns an error if the analyzer fails
    pub fn integrated(&self) -> Result<LoudnessReading> {
        Ok(LoudnessReading::new(
            MeterMode::Integrated,
            self.analyzer.loudness_global()?,
        ))
    }

    /// Seconds of audio processed since the last reset
    pub fn elapsed_secs(&self) -> f64 {
        self.frames_processed as f64 / self.sample_rate as f64
    }

    /// Discard all history and start over
    ///
    /// # Errors
    /// Returns an error if the analyzer cannot be recreated
    pub fn reset(&mut self) -> Result<()> {
        // ebur128 has no reset; recreate it
        self.analyzer = Self::analyzer(self.channels, self.sample_rate)?;
        self.frames_processed = 0;
        Ok(())
    }
}

/// Display state of a track's loudness meter
///
/// Holds the last momentary, short-term and integrated values in display
/// form (silence already mapped to `0`).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeterPanel {
    momentary: f64,
    short_term: f64,
    integrated: f64,
}

impl MeterPanel {
    /// Create a zeroed panel
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reading
    pub fn update(&mut self, reading: &LoudnessReading) {
        let value = reading.display_value();
        match reading.mode {
            MeterMode::Momentary => self.momentary = value,
            MeterMode::ShortTerm => self.short_term = value,
            MeterMode::Integrated => self.integrated = value,
        }
    }

    /// Display value for a window type
    pub fn value(&self, mode: MeterMode) -> f64 {
        match mode {
            MeterMode::Momentary => self.momentary,
            MeterMode::ShortTerm => self.short_term,
            MeterMode::Integrated => self.integrated,
        }
    }

    /// Formatted value for a window type
    pub fn text(&self, mode: MeterMode) -> String {
        format_lufs(self.value(mode))
    }

    /// Zero all values
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Display for MeterPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "S {} | M {} | I {} LUFS",
            self.text(MeterMode::ShortTerm),
            self.text(MeterMode::Momentary),
            self.text(MeterMode::Integrated)
        )
    }
}
