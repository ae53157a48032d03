//! # Configuration Management
//!
//! Loads application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Legacy environment variables used by earlier deployments
//!   (OPENAI_API_KEY, OPENAI_BASE_URL, MODEL_NAME, GENERATION_MODEL,
//!   DIRECTORY_URL, DIRECTORY_API_KEY, HOST, PORT)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Legacy environment variables
//! 2. Environment variables (APP_SERVER__HOST, APP_PROVIDER__API_KEY, etc.;
//!    `__` separates nesting levels so field names keep their underscores)
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impl)
//!
//! Configuration is read once at process start and is read-only afterwards;
//! there is no reinitialization path.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Main application configuration that contains all settings.
///
/// Breaking configuration into logical groups (server, provider, directory,
/// audio) keeps each concern self-contained as the application grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub directory: DirectoryConfig,
    pub audio: AudioConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (production)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Settings for the external OpenAI-compatible AI provider.
///
/// One provider serves both speech-to-text (the transcription model) and
/// text generation (the generation model). An empty or placeholder API key
/// means the provider is not configured: the streaming relay refuses audio
/// and the text endpoints serve static fallbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key for the provider. Empty string means "not configured".
    pub api_key: String,

    /// Base URL of the provider API. The default points at OpenAI; set this
    /// to use Groq or any other compatible provider.
    pub base_url: String,

    /// Model name used for audio transcription (e.g. "whisper-1").
    pub transcription_model: String,

    /// Model name used for paragraph generation and word simplification.
    pub generation_model: String,

    /// Per-request timeout in seconds for provider calls.
    pub timeout_secs: u64,
}

/// Settings for the external identity/document-store service that owns the
/// user records. Only its REST contract matters here, not its internals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Base URL of the directory service. Empty string means "not configured";
    /// user-management endpoints then return 503.
    pub base_url: String,

    /// Service key sent as a bearer token on every directory request.
    pub service_key: String,

    /// Per-request timeout in seconds for directory calls.
    pub timeout_secs: u64,
}

/// Audio format and buffering settings for the streaming relay.
///
/// The flush threshold is sized so a flush carries roughly two seconds of
/// audio: 16000 Hz * 2 bytes/sample * 2 s = 64,000 bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Expected sample rate of inbound PCM (16000 for Whisper-style APIs).
    pub sample_rate: u32,

    /// Number of audio channels (1 = mono).
    pub channels: u16,

    /// Bit depth of inbound samples (16-bit PCM).
    pub bit_depth: u16,

    /// Buffer size in bytes that triggers a flush to the transcription API.
    pub flush_threshold_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
            },
            provider: ProviderConfig {
                api_key: String::new(),
                base_url: "https://api.openai.com/v1".to_string(),
                transcription_model: "whisper-1".to_string(),
                generation_model: "gpt-3.5-turbo".to_string(),
                timeout_secs: 30,
            },
            directory: DirectoryConfig {
                base_url: String::new(),
                service_key: String::new(),
                timeout_secs: 15,
            },
            audio: AudioConfig {
                sample_rate: 16000,
                channels: 1,
                bit_depth: 16,
                flush_threshold_bytes: 64_000,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from all sources in priority order.
    ///
    /// ## Loading process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with APP_
    /// 4. Override with legacy environment variables used by earlier
    ///    deployments (OPENAI_API_KEY and friends, HOST, PORT)
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            // Example: APP_SERVER__HOST becomes server.host. The double
            // underscore keeps multi-word leaves like APP_PROVIDER__API_KEY
            // mapping onto provider.api_key.
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        // Legacy variables that don't follow the APP_ prefix convention.
        // Earlier deployments of this backend configured everything this way.
        if let Ok(key) = env::var("OPENAI_API_KEY") {
            settings = settings.set_override("provider.api_key", key)?;
        }
        if let Ok(base) = env::var("OPENAI_BASE_URL") {
            settings = settings.set_override("provider.base_url", base)?;
        }
        if let Ok(model) = env::var("MODEL_NAME") {
            settings = settings.set_override("provider.transcription_model", model)?;
        }
        if let Ok(model) = env::var("GENERATION_MODEL") {
            settings = settings.set_override("provider.generation_model", model)?;
        }
        if let Ok(url) = env::var("DIRECTORY_URL") {
            settings = settings.set_override("directory.base_url", url)?;
        }
        if let Ok(key) = env::var("DIRECTORY_API_KEY") {
            settings = settings.set_override("directory.service_key", key)?;
        }
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }
        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// Catching configuration errors early prevents runtime failures and
    /// gives a clear message about what's wrong.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.audio.flush_threshold_bytes == 0 {
            return Err(anyhow::anyhow!("Audio flush threshold must be greater than 0"));
        }

        if self.audio.channels != 1 {
            return Err(anyhow::anyhow!(
                "Only mono audio is supported (channels = {})",
                self.audio.channels
            ));
        }

        if self.audio.bit_depth != 16 {
            return Err(anyhow::anyhow!(
                "Only 16-bit PCM is supported (bit_depth = {})",
                self.audio.bit_depth
            ));
        }

        Ok(())
    }

    /// Whether a usable AI provider key is present.
    ///
    /// An empty key or the `.env.example` placeholder ("your-key-here")
    /// counts as not configured; all AI-backed features then fall back to
    /// static behavior.
    pub fn provider_configured(&self) -> bool {
        !self.provider.api_key.is_empty() && !self.provider.api_key.contains("your-key-here")
    }

    /// Whether the user-directory service has been configured.
    pub fn directory_configured(&self) -> bool {
        !self.directory.base_url.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.audio.flush_threshold_bytes, 64_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.audio.channels = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_provider_unconfigured_by_default() {
        let config = AppConfig::default();
        assert!(!config.provider_configured());
        assert!(!config.directory_configured());
    }

    #[test]
    fn test_env_override_maps_nested_keys() {
        env::set_var("APP_PROVIDER__GENERATION_MODEL", "gpt-4o-mini");
        env::set_var("APP_SERVER__PORT", "9005");

        let config = AppConfig::load().unwrap();
        assert_eq!(config.provider.generation_model, "gpt-4o-mini");
        assert_eq!(config.server.port, 9005);

        env::remove_var("APP_PROVIDER__GENERATION_MODEL");
        env::remove_var("APP_SERVER__PORT");
    }

    #[test]
    fn test_placeholder_key_counts_as_unconfigured() {
        let mut config = AppConfig::default();
        config.provider.api_key = "sk-your-key-here".to_string();
        assert!(!config.provider_configured());

        config.provider.api_key = "sk-live-abc123".to_string();
        assert!(config.provider_configured());
    }
}
