use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Engine configuration.
///
/// Every threshold here is an empirically chosen default, not a guaranteed
/// constant: the 0.6/0.4 modality split, the quality-gate cutoffs, and the
/// 0.3/0.6 tier boundaries were tuned by ear in the original deployment and
/// are kept tunable for the same reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub schema_version: u32,

    /// Raw modality weights; normalized to sum to 1 via `weights()`
    pub voice_weight: f32,
    pub face_weight: f32,

    /// Compatibility at or above this is "moderate" agreement
    pub moderate_compatibility: f32,
    /// Compatibility at or above this (but below moderate) is "weak"
    pub weak_compatibility: f32,
    /// Below this merged confidence, a conflict recommends neutral
    pub conflict_confidence_floor: f32,

    pub quality: QualityThresholds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            voice_weight: 0.6,
            face_weight: 0.4,
            moderate_compatibility: 0.6,
            weak_compatibility: 0.3,
            conflict_confidence_floor: 0.4,
            quality: QualityThresholds::default(),
        }
    }
}

impl EngineConfig {
    /// Load config from file, or create default
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .context("Failed to read config file")?;
            serde_json::from_str(&content)
                .context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .context("Failed to serialize config")?;
        std::fs::write(path, content)
            .context("Failed to write config file")
    }

    /// Get the default config directory
    pub fn default_config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .context("Failed to get home directory")?;
        Ok(home.join(".mood-engine"))
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join("config.json"))
    }

    /// Normalized modality weight pair
    pub fn weights(&self) -> FusionWeights {
        FusionWeights::new(self.voice_weight, self.face_weight)
    }
}

/// Normalized voice/face weight pair, guaranteed to sum to 1.
/// Constructed once and shared read-only across requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    voice: f32,
    face: f32,
}

impl FusionWeights {
    /// Normalize a raw weight pair. Non-positive or degenerate input falls
    /// back to the 0.6/0.4 default.
    pub fn new(voice: f32, face: f32) -> Self {
        let total = voice + face;
        if voice < 0.0 || face < 0.0 || total <= 0.0 {
            return Self::default();
        }
        Self {
            voice: voice / total,
            face: face / total,
        }
    }

    pub fn voice(&self) -> f32 {
        self.voice
    }

    pub fn face(&self) -> f32 {
        self.face
    }
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            voice: 0.6,
            face: 0.4,
        }
    }
}

/// Audio quality gate thresholds, chosen to reject silence, DC offset, and
/// narrowband hum while tolerating soft speech
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QualityThresholds {
    /// Clips shorter than this skip analysis entirely
    pub min_clip_secs: f32,
    pub min_rms: f32,
    pub min_peak: f32,
    pub min_speech_band_ratio: f32,
    pub min_zero_crossing_rate: f32,
    pub min_spectral_centroid_hz: f32,
    /// Fallback confidence for low-information audio
    pub unreliable_confidence: f32,
    /// Fallback confidence for too-short clips
    pub short_clip_confidence: f32,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_clip_secs: 0.25,
            min_rms: 0.05,
            min_peak: 0.15,
            min_speech_band_ratio: 0.05,
            min_zero_crossing_rate: 0.01,
            min_spectral_centroid_hz: 80.0,
            unreliable_confidence: 0.25,
            short_clip_confidence: 0.20,
        }
    }
}
