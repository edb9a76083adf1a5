//! Per-track gain persistence
//!
//! Keys derive from the file name: `<name>_volume` holds the base gain in dB
//! (a JSON number), `<name>_gain_modifiers` the modifier map (a JSON object).

use crate::error::Result;
use crate::gain::{GainModifiers, GainSnapshot};
use mixdown_core::{storage, KeyValueStore};

/// Key of a track's base gain
pub fn volume_key(name: &str) -> String {
    format!("{}_volume", name)
}

/// Key of a track's modifier map
pub fn modifiers_key(name: &str) -> String {
    format!("{}_gain_modifiers", name)
}

/// Read a track's persisted gain; missing keys read as unity
pub fn load_gain(store: &dyn KeyValueStore, name: &str) -> Result<GainSnapshot> {
    let base_gain_db: Option<f64> = storage::load(store, &volume_key(name))?;
    let modifiers: Option<GainModifiers> = storage::load(store, &modifiers_key(name))?;
    Ok(GainSnapshot {
        base_gain_db: base_gain_db.unwrap_or(0.0),
        modifiers: modifiers.unwrap_or_default(),
    })
}

/// Write a track's gain
pub fn save_gain(store: &dyn KeyValueStore, name: &str, snapshot: &GainSnapshot) -> Result<()> {
    storage::save(store, &volume_key(name), &snapshot.base_gain_db)?;
    storage::save(store, &modifiers_key(name), &snapshot.modifiers)?;
    Ok(())
}
