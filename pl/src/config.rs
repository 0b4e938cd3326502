//! PromptLab configuration types and loading

use eyre::{Context, Result};
use promptcatalog::LoadPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::llm::{GEMINI_BASE_URL, LlmError, ModelPrice, OPENAI_BASE_URL, PriceTable};

const LOCAL_CONFIG: &str = ".promptlab.yml";

/// Main PromptLab configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    #[serde(rename = "log-level")]
    pub log_level: String,

    /// Model endpoint configuration
    pub llm: LlmConfig,

    /// Prompt library location and load policy
    pub catalog: CatalogConfig,

    /// Price overrides, checked before the built-in table
    pub pricing: Vec<ModelPrice>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            llm: LlmConfig::default(),
            catalog: CatalogConfig::default(),
            pricing: Vec::new(),
        }
    }
}

impl Config {
    /// Validate configuration before calling the model endpoint
    ///
    /// Checks that the API key environment variable is set.
    pub fn validate(&self) -> Result<()> {
        self.llm.api_key()?;
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::search_paths() {
            if candidate.exists() {
                match Self::load_from_file(&candidate) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", candidate.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialised
    ///
    /// Errors are swallowed: a broken config file is reported later by `load`.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        #[derive(Deserialize)]
        struct LogLevelOnly {
            #[serde(rename = "log-level")]
            log_level: Option<String>,
        }

        let paths = match config_path {
            Some(path) => vec![path.clone()],
            None => Self::search_paths(),
        };

        paths
            .into_iter()
            .find(|p| p.exists())
            .and_then(|p| fs::read_to_string(p).ok())
            .and_then(|content| serde_yaml::from_str::<LogLevelOnly>(&content).ok())
            .and_then(|c| c.log_level)
    }

    /// Local config first, then the user config directory
    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
        // ~/.config/promptlab/promptlab.yml
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("promptlab").join("promptlab.yml"));
        }
        paths
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Built-in prices with the configured overrides in front
    pub fn price_table(&self) -> PriceTable {
        debug!(overrides = %self.pricing.len(), "price_table: called");
        PriceTable::builtin().with_overrides(self.pricing.iter().cloned())
    }
}

/// Model endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: "gemini" or "openai"
    pub provider: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL; the provider's public endpoint when unset
    #[serde(rename = "base-url", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Output token cap for prompts without `metadata.max_tokens`
    #[serde(rename = "max-output-tokens")]
    pub max_output_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: None,
            timeout_ms: 30_000,
            max_output_tokens: 1024,
        }
    }
}

impl LlmConfig {
    pub fn resolved_base_url(&self) -> &str {
        match (&self.base_url, self.provider.as_str()) {
            (Some(url), _) => url,
            (None, "openai") => OPENAI_BASE_URL,
            (None, _) => GEMINI_BASE_URL,
        }
    }

    /// Read the API key from the environment
    ///
    /// An empty value counts as unset.
    pub fn api_key(&self) -> Result<String, LlmError> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => {
                debug!(api_key_env = %self.api_key_env, "api_key: not set");
                Err(LlmError::MissingApiKey(self.api_key_env.clone()))
            }
        }
    }
}

/// Prompt library configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Root directory of the prompt tree
    #[serde(rename = "prompts-dir")]
    pub prompts_dir: PathBuf,

    /// What to do with an invalid document: skip or fail
    #[serde(rename = "on-invalid")]
    pub on_invalid: LoadPolicy,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            prompts_dir: PathBuf::from("prompts"),
            on_invalid: LoadPolicy::default(),
        }
    }
}
