//! Integration tests for mixdown-loudness
//!
//! Tests include:
//! - Reference signals (sine, silence)
//! - Gain-to-loudness relationship
//! - Property-based tests for the normalization policy

use mixdown_core::{db_to_linear, PcmBuffer, SampleRate};
use mixdown_loudness::{
    equalize_db, gain_reduction_db, LoudnessMeter, LoudnessReading, MeterMode, MeterPanel,
    NormalizationMode, NormalizationPolicy,
};
use proptest::prelude::*;

// ========== Helper Functions ==========

/// Generate a planar stereo sine wave
fn generate_sine(sample_rate: u32, frequency: f32, amplitude: f32, duration_secs: f32) -> PcmBuffer {
    let frames = (sample_rate as f32 * duration_secs) as usize;
    let tone: Vec<f32> = (0..frames)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect();
    PcmBuffer::new(vec![tone.clone(), tone], SampleRate::new(sample_rate)).unwrap()
}

fn scaled(pcm: &PcmBuffer, gain: f32) -> PcmBuffer {
    let channels = pcm
        .channels()
        .iter()
        .map(|c| c.iter().map(|s| s * gain).collect())
        .collect();
    PcmBuffer::new(channels, pcm.sample_rate()).unwrap()
}

// ========== Reference Signals ==========

#[test]
fn silent_second_displays_zero() {
    let pcm = PcmBuffer::silent(2, 44_100, SampleRate::CD_QUALITY);
    let readings: Vec<LoudnessReading> = LoudnessMeter::new()
        .measure(&pcm, &[MeterMode::Integrated])
        .unwrap()
        .map(Result::unwrap)
        .collect();

    assert_eq!(readings.len(), 1);
    let reading = readings[0];
    assert_eq!(reading.mode, MeterMode::Integrated);
    assert_eq!(reading.value_lufs, f64::NEG_INFINITY);
    assert_eq!(reading.display_value(), 0.0);
}

#[test]
fn sine_measures_near_reference() {
    // -20 dBFS stereo 1 kHz sine reads about -20 LUFS
    let pcm = generate_sine(48_000, 1000.0, 0.1, 3.0);
    let lufs = LoudnessMeter::new().measure_integrated(&pcm).unwrap();
    assert!(lufs > -23.0 && lufs < -18.0, "got {:.2} LUFS", lufs);
}

#[test]
fn gain_shifts_integrated_loudness_by_the_same_db() {
    let pcm = generate_sine(44_100, 1000.0, 0.1, 3.0);
    let meter = LoudnessMeter::new();
    let base = meter.measure_integrated(&pcm).unwrap();
    let boosted = meter
        .measure_integrated(&scaled(&pcm, db_to_linear(6.0) as f32))
        .unwrap();
    assert!((boosted - base - 6.0).abs() < 0.05, "delta {:.3}", boosted - base);
}

#[test]
fn normalizing_a_measured_signal_reaches_target() {
    let pcm = generate_sine(44_100, 1000.0, 0.05, 3.0);
    let meter = LoudnessMeter::new();
    let measured = meter.measure_integrated(&pcm).unwrap();

    let reduction = gain_reduction_db(measured, -14.0).unwrap();
    assert_eq!(reduction, -14.0 - measured);

    let normalized = scaled(&pcm, db_to_linear(reduction) as f32);
    let after = meter.measure_integrated(&normalized).unwrap();
    assert!((after + 14.0).abs() < 0.05, "got {:.3} LUFS", after);
}

#[test]
fn window_readings_feed_the_panel() {
    let pcm = generate_sine(44_100, 440.0, 0.3, 3.5);
    let mut panel = MeterPanel::new();
    for reading in LoudnessMeter::new().measure(&pcm, &MeterMode::ALL).unwrap() {
        panel.update(&reading.unwrap());
    }

    for mode in MeterMode::ALL {
        assert!(panel.value(mode) < 0.0, "{:?} = {}", mode, panel.value(mode));
    }
    // A steady tone: 3 s window and integrated agree closely
    assert!((panel.value(MeterMode::ShortTerm) - panel.value(MeterMode::Integrated)).abs() < 0.5);
}

#[test]
fn two_tracks_normalize_independently() {
    let policy = NormalizationPolicy::new(-14.0, NormalizationMode::PerTrack);
    let out = policy.adjustments_db(&[-20.0, -10.0]).unwrap();
    assert_eq!(*out[0].as_ref().unwrap(), 6.0);
    assert_eq!(*out[1].as_ref().unwrap(), -4.0);
}

// ========== Property-Based Tests ==========

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// The reduction is exactly target - measured
    #[test]
    fn reduction_is_exact(
        measured in -70.0_f64..0.0_f64,
        target in -30.0_f64..-5.0_f64,
    ) {
        prop_assert_eq!(gain_reduction_db(measured, target).unwrap(), target - measured);
    }

    /// Equalization never raises a track
    #[test]
    fn equalize_is_monotone(gains in prop::collection::vec(-30.0_f64..30.0_f64, 1..16)) {
        let adjustments = equalize_db(&gains);
        prop_assert_eq!(adjustments.len(), gains.len());
        for (gain, adjustment) in gains.iter().zip(&adjustments) {
            prop_assert!(*adjustment <= 0.0);
            prop_assert!(gain + adjustment <= *gain);
        }
        // The highest-gain track keeps its value
        prop_assert!(adjustments.iter().any(|a| *a == 0.0));
    }

    /// After relative normalization no track exceeds the target
    #[test]
    fn relative_never_overshoots(
        measured in prop::collection::vec(-60.0_f64..-1.0_f64, 1..8),
        target in -24.0_f64..-9.0_f64,
    ) {
        let policy = NormalizationPolicy::new(target, NormalizationMode::Relative);
        let out = policy.adjustments_db(&measured).unwrap();
        for (l, adjustment) in measured.iter().zip(out) {
            prop_assert!(l + adjustment.unwrap() <= target + 1e-9);
        }
    }
}
