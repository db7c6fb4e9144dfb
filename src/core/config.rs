//! Configuration management for bedrock-browser
//!
//! Supports a TOML config file, environment variables and runtime overrides.
//! Values here are defaults for a run; they are validated per task by
//! [`crate::core::run_config::resolve`].
//!
//! Config file location: ~/.config/bedrock-browser/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::{BrowserAgentError, Result};
use crate::core::run_config::{
    DEFAULT_MAX_STEPS, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE,
};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// AWS / Bedrock settings
    #[serde(default)]
    pub aws: AwsConfig,
    /// Default run parameters
    #[serde(default)]
    pub run: RunDefaults,
    /// Browser configuration
    #[serde(default)]
    pub browser: BrowserConfig,
    /// Agent behavior configuration
    #[serde(default)]
    pub agent: AgentConfig,
}

/// AWS / Bedrock settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// Region; when unset the AWS profile's region applies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// AWS profile to use when AWS_PROFILE is unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    /// Override for the bedrock-runtime endpoint (proxies, tests)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Default run parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunDefaults {
    /// Claude model id
    pub model: String,
    /// Sampling temperature
    pub temperature: f64,
    /// Step budget
    pub max_steps: u32,
    /// Max tokens per completion
    pub max_tokens: u32,
}

/// Browser automation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// agent-browser executable
    pub binary: String,
    /// Prefix for per-run session names
    pub session_prefix: String,
    /// Whether to run in headed mode (visible browser)
    pub headed: bool,
    /// Timeout for a single browser command in ms
    pub timeout_ms: u64,
}

/// Agent behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Whether to show debug output
    pub debug: bool,
    /// Extra instructions appended to the system prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Max characters of a single observation kept in the prompt
    pub max_observation_chars: usize,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: None,
            profile: None,
            endpoint_url: None,
            timeout_secs: 120,
        }
    }
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_steps: DEFAULT_MAX_STEPS,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            binary: "agent-browser".to_string(),
            session_prefix: "bb".to_string(),
            headed: env_flag("BEDROCK_BROWSER_HEADED"),
            timeout_ms: 30000,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            debug: env_flag("BEDROCK_BROWSER_DEBUG"),
            system_prompt: None,
            max_observation_chars: 6000,
        }
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bedrock-browser")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from .env, the config file and defaults
    ///
    /// Environment and CLI overrides for run parameters are layered later by
    /// [`crate::core::run_config::RawInputs`].
    pub fn load() -> Self {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        match Self::load_from(&Self::config_file()) {
            Ok(config) => config,
            Err(e) => {
                if Self::config_exists() {
                    tracing::warn!(error = %e, "Ignoring unreadable config file");
                }
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(BrowserAgentError::config_file("Config file not found"));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| BrowserAgentError::config_file(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| BrowserAgentError::config_file(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to the default file and return its path
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file();
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir).map_err(|e| {
                    BrowserAgentError::config_file(format!("Failed to create config dir: {}", e))
                })?;
            }
        }

        let content = self.to_toml()?;

        fs::write(path, content)
            .map_err(|e| BrowserAgentError::config_file(format!("Failed to write config: {}", e)))
    }

    /// Check if a config file exists
    pub fn config_exists() -> bool {
        Self::config_file().exists()
    }

    /// Serialize to pretty TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| {
            BrowserAgentError::config_file(format!("Failed to serialize config: {}", e))
        })
    }
}
