//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Synthesis pipeline configuration
    #[serde(default)]
    pub tts: TtsConfigDefaults,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tts.edge_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tts.edge_concurrency".to_string(),
                message: "concurrency must be at least 1".to_string(),
            });
        }
        if self.tts.max_chapter_chars == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tts.max_chapter_chars".to_string(),
                message: "chapter character ceiling must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins (empty = allow any, for local development)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    4000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

/// Synthesis pipeline configuration
///
/// The character ceiling and concurrency limit started life as hardcoded
/// empirical provider limits; they are settings here so deployments can tune
/// them without a rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfigDefaults {
    /// Per-chapter character ceiling for one export request
    #[serde(default = "default_max_chapter_chars")]
    pub max_chapter_chars: usize,

    /// In-flight synthesis calls per wave for the neural provider
    #[serde(default = "default_edge_concurrency")]
    pub edge_concurrency: usize,

    /// Secondary-provider session lifetime before forced refresh
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Per-call timeout for provider HTTP requests
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Streaming synthesis endpoint for the neural provider
    #[serde(default = "default_edge_endpoint")]
    pub edge_endpoint: String,

    /// Default voice for the neural provider
    #[serde(default = "default_edge_voice")]
    pub default_edge_voice: String,

    /// Default voice for the installed-voice proxy
    #[serde(default = "default_sapi_voice")]
    pub default_sapi_voice: String,

    /// Base URL of the installed-voice web front-end
    #[serde(default = "default_sapi_base_url")]
    pub sapi_base_url: String,
}

fn default_max_chapter_chars() -> usize {
    100_000
}
fn default_edge_concurrency() -> usize {
    5
}
fn default_session_ttl_secs() -> u64 {
    30 * 60
}
fn default_request_timeout_secs() -> u64 {
    120
}
fn default_edge_endpoint() -> String {
    "wss://speech.platform.bing.com/consumer/speech/synthesize/readaloud/edge/v1".to_string()
}
fn default_edge_voice() -> String {
    "en-US-AriaNeural".to_string()
}
fn default_sapi_voice() -> String {
    "Microsoft Zira Desktop".to_string()
}
fn default_sapi_base_url() -> String {
    "https://texttospeechfree.io".to_string()
}

impl Default for TtsConfigDefaults {
    fn default() -> Self {
        Self {
            max_chapter_chars: default_max_chapter_chars(),
            edge_concurrency: default_edge_concurrency(),
            session_ttl_secs: default_session_ttl_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            edge_endpoint: default_edge_endpoint(),
            default_edge_voice: default_edge_voice(),
            default_sapi_voice: default_sapi_voice(),
            sapi_base_url: default_sapi_base_url(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

/// Load settings from files and environment
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder = builder.add_source(File::with_name(&format!("config/{env_name}")).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("RTM")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}
