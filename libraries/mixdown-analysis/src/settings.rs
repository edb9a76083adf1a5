//! Mixer configuration

use crate::error::{AnalysisError, Result};
use mixdown_audio::{WavSampleFormat, DEFAULT_RENDER_QUANTUM};
use mixdown_loudness::{NormalizationMode, NormalizationPolicy, DEFAULT_TARGET_LUFS};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix (`MIXDOWN_ANALYSIS__MAX_CONCURRENT=4`)
pub const ENV_PREFIX: &str = "MIXDOWN";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MixerConfig {
    #[serde(default = "default_analysis")]
    pub analysis: AnalysisSettings,

    #[serde(default = "default_normalization")]
    pub normalization: NormalizationSettings,

    #[serde(default = "default_gain")]
    pub gain: GainSettings,

    #[serde(default = "default_export")]
    pub export: ExportSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AnalysisSettings {
    /// Heavy decode/render/measure pipelines allowed at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    #[serde(default = "default_render_quantum")]
    pub render_quantum: usize,

    /// Write cache entries through to the key-value store
    #[serde(default = "default_persist_cache")]
    pub persist_cache: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NormalizationSettings {
    #[serde(default = "default_target_lufs")]
    pub target_lufs: f64,

    #[serde(default)]
    pub mode: NormalizationMode,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GainSettings {
    /// Boosts above this need user confirmation (dB)
    #[serde(default = "default_confirm_above_db")]
    pub confirm_above_db: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExportSettings {
    #[serde(default)]
    pub sample_format: WavSampleFormat,
}

impl MixerConfig {
    /// Load configuration from an optional file and the environment
    ///
    /// The file format follows its extension (TOML, JSON, YAML...).
    /// `MIXDOWN_<SECTION>__<FIELD>` variables override file values.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        // Load from config file if it exists
        if let Some(path) = path {
            if path.exists() {
                settings = settings.add_source(config::File::from(path));
            }
        }

        // Override with environment variables
        settings = settings.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.analysis.max_concurrent == 0 {
            return Err(AnalysisError::Config(
                "analysis.max_concurrent must be at least 1".to_string(),
            ));
        }

        if self.analysis.render_quantum == 0 {
            return Err(AnalysisError::Config(
                "analysis.render_quantum must be at least 1".to_string(),
            ));
        }

        if !self.normalization.target_lufs.is_finite() {
            return Err(AnalysisError::Config(format!(
                "normalization.target_lufs must be finite, got {}",
                self.normalization.target_lufs
            )));
        }

        if self.gain.confirm_above_db.is_nan() {
            return Err(AnalysisError::Config(
                "gain.confirm_above_db must be a number".to_string(),
            ));
        }

        Ok(())
    }

    /// Normalization target and mode as a policy
    pub fn policy(&self) -> NormalizationPolicy {
        NormalizationPolicy::new(self.normalization.target_lufs, self.normalization.mode)
    }
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            analysis: default_analysis(),
            normalization: default_normalization(),
            gain: default_gain(),
            export: default_export(),
        }
    }
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        default_analysis()
    }
}

// Default values
fn default_analysis() -> AnalysisSettings {
    AnalysisSettings {
        max_concurrent: default_max_concurrent(),
        render_quantum: default_render_quantum(),
        persist_cache: default_persist_cache(),
    }
}

fn default_max_concurrent() -> usize {
    2
}

fn default_render_quantum() -> usize {
    DEFAULT_RENDER_QUANTUM
}

fn default_persist_cache() -> bool {
    true
}

fn default_normalization() -> NormalizationSettings {
    NormalizationSettings {
        target_lufs: default_target_lufs(),
        mode: NormalizationMode::default(),
    }
}

fn default_target_lufs() -> f64 {
    DEFAULT_TARGET_LUFS
}

fn default_gain() -> GainSettings {
    GainSettings {
        confirm_above_db: default_confirm_above_db(),
    }
}

fn default_confirm_above_db() -> f64 {
    5.0
}

fn default_export() -> ExportSettings {
    ExportSettings {
        sample_format: WavSampleFormat::default(),
    }
}
