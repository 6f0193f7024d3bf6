
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 768;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
}

/// Where the prebuilt dataset files live. Both files are loaded once at
/// startup and never written by this program.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    pub data_dir: Option<PathBuf>,
    pub records_file: String,
    pub index_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub model: String,
    pub batch_size: u32,
    pub dimension: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub endpoint: Url,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    /// Name of the environment variable holding the bearer credential.
    /// The credential itself never lives in the config file.
    pub api_key_var: String,
}

impl Default for DataConfig {
    #[inline]
    fn default() -> Self {
        Self {
            data_dir: None,
            records_file: "final_rag.csv".to_string(),
            index_file: "final_rag_index.json".to_string(),
        }
    }
}

impl Default for EmbeddingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            model: "all-mpnet-base-v2".to_string(),
            batch_size: 32,
            dimension: DEFAULT_EMBEDDING_DIMENSION,
        }
    }
}

impl Default for LlmConfig {
    #[inline]
    fn default() -> Self {
        Self {
            endpoint: Url::parse("https://openrouter.ai/api/v1/chat/completions")
                .expect("default endpoint URL is valid"),
            model: "openai/gpt-4o-mini".to_string(),
            max_tokens: 256,
            // Zero temperature keeps identical calls deterministic, which
            // is what makes the answer cache valid.
            temperature: 0.0,
            top_p: 0.8,
            api_key_var: "OPENROUTER_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid max tokens: {0} (must be between 1 and 8192)")]
    InvalidMaxTokens(u32),
    #[error("Invalid temperature: {0} (must be between 0.0 and 2.0)")]
    InvalidTemperature(f64),
    #[error("Invalid top_p: {0} (must be between 0.0 and 1.0)")]
    InvalidTopP(f64),
    #[error("Invalid credential variable name: cannot be empty")]
    InvalidApiKeyVar,
    #[error("Invalid data file name: {0} (cannot be empty)")]
    InvalidDataFile(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".cet-advisor"))
            .or({
                #[cfg(windows)]
                {
                    dirs::data_dir().map(|data| data.join("cet-advisor"))
                }
                #[cfg(not(windows))]
                {
                    None
                }
            })
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    #[inline]
    pub fn load() -> Result<Self> {
        let config_path =
            Self::config_file_path().context("Failed to determine config file path")?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = Self::config_dir().context("Failed to determine config directory")?;

        fs::create_dir_all(&config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = config_dir.join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.data.validate()?;
        self.embedding.validate()?;
        self.llm.validate()?;
        Ok(())
    }

    /// Directory holding the record table and vector index. Defaults to
    /// `<config dir>/data` when not set explicitly.
    #[inline]
    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        self.data.data_dir.as_ref().map_or_else(
            || Ok(Self::config_dir()?.join("data")),
            |dir| Ok(dir.clone()),
        )
    }

    #[inline]
    pub fn records_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.data_dir()?.join(&self.data.records_file))
    }

    #[inline]
    pub fn index_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.data_dir()?.join(&self.data.index_file))
    }
}

impl DataConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.records_file.trim().is_empty() {
            return Err(ConfigError::InvalidDataFile(self.records_file.clone()));
        }
        if self.index_file.trim().is_empty() {
            return Err(ConfigError::InvalidDataFile(self.index_file.clone()));
        }
        Ok(())
    }
}

impl EmbeddingConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))?;

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if !(64..=4096).contains(&self.dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(self.dimension));
        }

        Ok(())
    }

    #[inline]
    pub fn server_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }
}

impl LlmConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if self.max_tokens == 0 || self.max_tokens > 8192 {
            return Err(ConfigError::InvalidMaxTokens(self.max_tokens));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidTemperature(self.temperature));
        }

        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(ConfigError::InvalidTopP(self.top_p));
        }

        if self.api_key_var.trim().is_empty() {
            return Err(ConfigError::InvalidApiKeyVar);
        }

        Ok(())
    }

    /// Bearer credential resolved from the environment, if present.
    #[inline]
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_var)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}
