// Configuration - Service settings from defaults, TOML files and the environment
//
// Files are loaded in order (later wins):
// 1. `<config_dir>/harmonyhub/config.toml` (user)
// 2. `./harmonyhub.toml`, or the path given with `--config`
// 3. Environment variables (`HUGGINGFACE_API_TOKEN`, `HARMONYHUB_*`)

pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use loader::ConfigSources;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Failed to render config: {0}")]
    Render(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

pub const REDACTED: &str = "<redacted>";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub paths: PathsConfig,
    pub inference: InferenceConfig,
    pub midi: MidiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Database and exercise files
    pub data_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .map(|d| d.join("harmonyhub"))
            .unwrap_or_else(|| PathBuf::from("harmonyhub-data"));
        PathsConfig { data_dir }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub base_url: String,
    /// Chat and exercise model
    pub model: String,
    /// Model behind the plain text-generation route
    pub text_model: String,
    /// Used when a request carries no token of its own
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_token: Option<String>,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        InferenceConfig {
            base_url: "https://api-inference.huggingface.co".to_string(),
            model: "mistralai/Mistral-7B-Instruct-v0.3".to_string(),
            text_model: "sarvamai/shuka-1".to_string(),
            default_token: None,
            temperature: 0.7,
            top_k: 50,
            top_p: 0.95,
            max_tokens: 1024,
            timeout_secs: 30,
            max_retries: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiConfig {
    pub ppq: u16,
    pub tempo_bpm: u16,
    pub velocity: u8,
}

impl Default for MidiConfig {
    fn default() -> Self {
        MidiConfig {
            ppq: 480,
            tempo_bpm: 120,
            velocity: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load from the standard locations and the process environment
    pub fn load(config_path: Option<&Path>) -> ConfigResult<Self> {
        let (config, sources) = Self::load_with_sources(config_path)?;
        for file in &sources.files {
            log::debug!("Loaded config file {}", file.display());
        }
        Ok(config)
    }

    pub fn load_with_sources(config_path: Option<&Path>) -> ConfigResult<(Self, ConfigSources)> {
        let files = loader::discover_config_files(config_path);
        loader::load_layers(&files, |name| std::env::var(name).ok())
    }

    /// Database file inside the data directory
    pub fn database_path(&self) -> PathBuf {
        self.paths.data_dir.join("harmonyhub.db")
    }

    /// Effective configuration as TOML, with the token hidden
    pub fn to_toml(&self) -> ConfigResult<String> {
        let mut shown = self.clone();
        if shown.inference.default_token.is_some() {
            shown.inference.default_token = Some(REDACTED.to_string());
        }
        let body = toml::to_string_pretty(&shown).map_err(|e| ConfigError::Render(e.to_string()))?;
        Ok(format!("# HarmonyHub Configuration\n\n{}", body))
    }
}
