//! Property tests for the composable gain model

use mixdown_core::{db_to_linear, AtomicGainNode, GainNode};
use mixdown_session::{
    apply_equalization, TrackGain, EQUALIZATION_MODIFIER, NORMALIZATION_MODIFIER,
};
use proptest::prelude::*;
use std::sync::Arc;

fn modifiers() -> impl Strategy<Value = Vec<(String, f64)>> {
    prop::collection::vec(("[A-Za-z]{1,8}", -24.0f64..24.0), 0..6)
}

proptest! {
    #[test]
    fn effective_gain_is_base_plus_modifiers(
        base in -5.0f64..5.0,
        mods in modifiers(),
    ) {
        let node = Arc::new(AtomicGainNode::new());
        let mut gain = TrackGain::new(node.clone());
        gain.set_base_gain_db(base).unwrap();
        for (name, db) in &mods {
            gain.set_modifier(name, *db).unwrap();
        }

        let expected_db = base + gain.modifiers().values().sum::<f64>();
        let expected = 10f64.powf(expected_db / 20.0);
        prop_assert!((gain.effective_gain_linear() - expected).abs() <= 1e-9 * expected.max(1.0));
        prop_assert!((node.gain() - expected).abs() <= 1e-9 * expected.max(1.0));
    }

    #[test]
    fn clearing_a_modifier_restores_the_previous_gain(
        base in -5.0f64..5.0,
        db in -24.0f64..24.0,
    ) {
        let node = Arc::new(AtomicGainNode::new());
        let mut gain = TrackGain::new(node.clone());
        gain.set_base_gain_db(base).unwrap();
        let before = node.gain();

        gain.set_modifier(NORMALIZATION_MODIFIER, db).unwrap();
        gain.clear_modifier(NORMALIZATION_MODIFIER);
        prop_assert!((node.gain() - before).abs() < 1e-12);
    }

    #[test]
    fn equalization_never_raises_a_gain(
        normalized in prop::collection::vec(-30.0f64..30.0, 1..8),
    ) {
        let mut gains: Vec<TrackGain> = normalized
            .iter()
            .map(|db| {
                let mut gain = TrackGain::new(Arc::new(AtomicGainNode::new()));
                gain.set_modifier(NORMALIZATION_MODIFIER, *db).unwrap();
                gain
            })
            .collect();

        apply_equalization(gains.iter_mut());

        let max = normalized.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        for (gain, before) in gains.iter().zip(&normalized) {
            prop_assert!(gain.effective_gain_db() <= before + 1e-9);
            if let Some(eq) = gain.modifier(EQUALIZATION_MODIFIER) {
                prop_assert!(eq < 0.0);
                prop_assert!((eq - -(max - before)).abs() < 1e-9);
            }
            prop_assert!((gain.node().gain() - db_to_linear(gain.effective_gain_db())).abs() < 1e-9);
        }

        // The loudest track keeps its normalized gain
        prop_assert!(gains.iter().any(|g| (g.effective_gain_db() - max).abs() < 1e-9));
    }
}
