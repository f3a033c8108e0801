use anyhow::{Context, Result};
use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{PipelineError, PipelineResult};

/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "gemini-embedding-exp-03-07";

/// Default base URL of the Generative Language API.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Plain environment variable honoured as a fallback for the API key.
pub const GOOGLE_API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Configuration for readmap.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (READMAP_* prefix)
/// 3. Config file (~/.config/readmap/config.toml)
/// 4. Built-in defaults (lowest priority)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Google API key for the embedding endpoint.
    ///
    /// Can be set via:
    /// - ENV: READMAP_GOOGLE_API_KEY (or plain GOOGLE_API_KEY)
    /// - Config: google_api_key = "..."
    pub google_api_key: Option<String>,

    /// Path to the SQLite database holding the book collection.
    ///
    /// Can be set via:
    /// - CLI: --db /path/to/db
    /// - ENV: READMAP_DATABASE_PATH
    /// - Config: database_path = "/path/to/db"
    /// - Default: ~/.local/share/readmap/readmap.db
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,

    /// Embedding model name.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Base URL of the embedding API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Per-request timeout for embedding calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            google_api_key: None,
            database_path: default_db_path(),
            embedding_model: default_embedding_model(),
            api_base: default_api_base(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Searches for config file at: ~/.config/readmap/config.toml
    /// Reads environment variables with READMAP_ prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();

        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .context("Failed to load config file")?;
        }

        let env_opts = env::Options::with_top_level("readmap");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let mut config: Self = builder.build().context("Failed to build configuration")?;

        if config.google_api_key.is_none() {
            config.google_api_key = std::env::var(GOOGLE_API_KEY_ENV)
                .ok()
                .filter(|key| !key.is_empty());
        }

        Ok(config)
    }

    /// Load configuration with custom database path.
    ///
    /// This is used when the --db CLI flag is provided.
    pub fn load_with_db_path(db_path: PathBuf) -> Result<Self> {
        let mut config = Self::load()?;
        config.database_path = db_path;
        Ok(config)
    }

    /// The API key, or [`PipelineError::MissingCredential`] when unset.
    pub fn require_api_key(&self) -> PipelineResult<&str> {
        self.google_api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(PipelineError::MissingCredential {
                name: "google_api_key (READMAP_GOOGLE_API_KEY or GOOGLE_API_KEY)",
            })
    }

    /// The API key with all but the last four characters hidden.
    pub fn masked_api_key(&self) -> String {
        let Some(key) = self.google_api_key.as_deref() else {
            return "<not set>".to_string();
        };
        let chars: Vec<char> = key.chars().collect();
        if chars.len() <= 4 {
            return "****".to_string();
        }
        let visible: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}", "*".repeat(chars.len() - 4), visible)
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("readmap")
        .join("readmap.db")
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

const fn default_request_timeout_secs() -> u64 {
    30
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/readmap/config.toml
/// - macOS: ~/Library/Application Support/readmap/config.toml
/// - Windows: %APPDATA%\readmap\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("readmap")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# Readmap Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (READMAP_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# Google API key used to request embeddings
#
# Can also be set via:
# - Environment: READMAP_GOOGLE_API_KEY=your-key-here
# - Environment: GOOGLE_API_KEY=your-key-here
google_api_key = "your-google-api-key-here"

# Path to the SQLite database holding the book collection
#
# Can also be set via:
# - CLI: readmap --db /custom/path.db status
# - Environment: READMAP_DATABASE_PATH=/custom/path.db
#
# Default: Platform-specific data directory
#database_path = "/path/to/custom/readmap.db"

# Embedding model and endpoint
#embedding_model = "gemini-embedding-exp-03-07"
#api_base = "https://generativelanguage.googleapis.com/v1beta"
#request_timeout_secs = 30
"#
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    let config_path = config_file_path();

    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(&config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}
