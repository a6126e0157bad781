use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Base name of the optional settings file (`captioner.toml`, `captioner.json`, ...).
pub const CONFIG_FILE: &str = "captioner";

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_MAX_FILE_SIZE: u64 = 500 * 1024 * 1024;
pub const DEFAULT_ASSEMBLYAI_BASE_URL: &str = "https://api.assemblyai.com";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub port: u16,
    pub app_env: String,
    #[serde(default)]
    pub assemblyai_api_key: Option<String>,
    pub assemblyai_base_url: String,
    pub upload_dir: PathBuf,
    /// Upload size limit in bytes.
    pub max_file_size: u64,
    pub poll_interval_ms: u64,
    pub transcription_timeout_secs: u64,
}

impl Settings {
    /// Loads settings from built-in defaults, then `captioner.toml` in the
    /// working directory if present, then environment variables
    /// (`PORT`, `ASSEMBLYAI_API_KEY`, `UPLOAD_DIR`, `MAX_FILE_SIZE`, ...).
    ///
    /// Callers that want `.env` support should run `dotenvy::dotenv()` first.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::defaults()?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::default().try_parsing(true))
            .build()?;

        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        config.try_deserialize()
    }

    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("port", DEFAULT_PORT)?
            .set_default("app_env", "development")?
            .set_default("assemblyai_base_url", DEFAULT_ASSEMBLYAI_BASE_URL)?
            .set_default("upload_dir", DEFAULT_UPLOAD_DIR)?
            .set_default("max_file_size", DEFAULT_MAX_FILE_SIZE)?
            .set_default("poll_interval_ms", 3000)?
            .set_default("transcription_timeout_secs", 600)
    }

    /// The provider credential, if one is set and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.assemblyai_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn transcription_timeout(&self) -> Duration {
        Duration::from_secs(self.transcription_timeout_secs)
    }

    pub fn max_file_size_mb(&self) -> u64 {
        self.max_file_size / (1024 * 1024)
    }

    /// Logs a warning when caption generation cannot work.
    pub fn warn_if_incomplete(&self) {
        if self.api_key().is_none() {
            tracing::warn!("ASSEMBLYAI_API_KEY not set. Caption generation will not work.");
        }
    }
}
