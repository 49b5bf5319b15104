//! TTS request configuration

use serde::{Deserialize, Serialize};

/// Which synthesis backend serves a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderChoice {
    /// Cloud neural TTS, parallel-safe, one streaming socket per chunk
    #[default]
    Edge,
    /// Installed-voice catalog behind a public web front-end, single-flight
    Sapi,
}

/// Per-request synthesis settings. Immutable for the duration of one export.
///
/// Optional fields that the caller did not set are omitted from provider
/// requests entirely rather than forced to defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Provider voice name, e.g. "en-US-AriaNeural" or "Microsoft Zira Desktop"
    pub voice: String,

    /// Speaking rate multiplier, 0.5–2.0 with 1.0 = normal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,

    /// Pitch adjustment, e.g. "+0Hz" (primary provider only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<String>,

    /// Volume, 0–100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<u8>,
}

impl TtsConfig {
    pub fn new(voice: impl Into<String>) -> Self {
        Self {
            voice: voice.into(),
            rate: None,
            pitch: None,
            volume: None,
        }
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn with_pitch(mut self, pitch: impl Into<String>) -> Self {
        self.pitch = Some(pitch.into());
        self
    }

    pub fn with_volume(mut self, volume: u8) -> Self {
        self.volume = Some(volume);
        self
    }
}
