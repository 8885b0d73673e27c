//! Configuration loading and resolution
//!
//! Every setting resolves in this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is a normal situation (warning + defaults). A config
//! file that exists but cannot be parsed is an error.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{Error, Result};

pub const ENV_DATABASE: &str = "UNICONNECT_DATABASE";
pub const ENV_SEMANTIC_ENABLED: &str = "UNICONNECT_SEMANTIC_ENABLED";
pub const ENV_MODEL_PATH: &str = "UNICONNECT_MODEL_PATH";
pub const ENV_CONFIG: &str = "UNICONNECT_CONFIG";

/// On-disk configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// SQLite database file; defaults to the platform data directory
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub semantic: SemanticConfig,

    #[serde(default)]
    pub join: JoinConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Semantic (word-embedding) scoring
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SemanticConfig {
    /// Off unless explicitly enabled
    #[serde(default)]
    pub enabled: bool,

    /// fastText-style `.vec` word vector file
    #[serde(default)]
    pub model_path: Option<PathBuf>,
}

/// Join transaction tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinConfig {
    /// Total time a join keeps retrying on lock contention before failing with a conflict
    #[serde(default = "default_max_lock_wait_ms")]
    pub max_lock_wait_ms: u64,

    /// SQLite busy_timeout per connection
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            max_lock_wait_ms: default_max_lock_wait_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_max_lock_wait_ms() -> u64 {
    5000
}

fn default_busy_timeout_ms() -> u64 {
    250
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values supplied on the command line; `None` means "not given"
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub semantic_enabled: Option<bool>,
    pub model_path: Option<PathBuf>,
}

/// Fully resolved configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub database_path: PathBuf,
    pub semantic: SemanticConfig,
    pub join: JoinConfig,
    pub logging: LoggingConfig,
}

/// Resolve configuration from CLI overrides, environment, TOML file and defaults
pub fn resolve_config(overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let config_path = overrides
        .config_path
        .clone()
        .or_else(|| std::env::var(ENV_CONFIG).ok().map(PathBuf::from))
        .or_else(default_config_path);

    let toml_config = match config_path {
        Some(path) => load_toml_config(&path)?.unwrap_or_default(),
        None => {
            warn!("Could not determine config directory, using defaults");
            TomlConfig::default()
        }
    };

    let database_path = overrides
        .database_path
        .clone()
        .or_else(|| env_path(ENV_DATABASE))
        .or_else(|| toml_config.database_path.clone())
        .unwrap_or_else(default_database_path);

    let semantic_enabled = match overrides.semantic_enabled {
        Some(enabled) => enabled,
        None => env_bool(ENV_SEMANTIC_ENABLED).unwrap_or(toml_config.semantic.enabled),
    };

    let model_path = overrides
        .model_path
        .clone()
        .or_else(|| env_path(ENV_MODEL_PATH))
        .or_else(|| toml_config.semantic.model_path.clone());

    Ok(ResolvedConfig {
        database_path,
        semantic: SemanticConfig {
            enabled: semantic_enabled,
            model_path,
        },
        join: toml_config.join,
        logging: toml_config.logging,
    })
}

/// Load a TOML config file
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_toml_config(path: &Path) -> Result<Option<TomlConfig>> {
    if !path.exists() {
        warn!("Config file not found: {} (using defaults)", path.display());
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str::<TomlConfig>(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

    info!("Loaded config file: {}", path.display());
    Ok(Some(config))
}

/// Write a TOML config file, creating parent directories
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, content)?;
    Ok(())
}

/// `<config dir>/uniconnect/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("uniconnect").join("config.toml"))
}

/// `<data dir>/uniconnect/uniconnect.db`
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("uniconnect"))
        .unwrap_or_else(|| PathBuf::from("./uniconnect_data"))
        .join("uniconnect.db")
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}

/// Unset or blank is `None`; an unrecognized value counts as `false`
fn env_bool(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok().filter(|value| !value.trim().is_empty())?;
    match parse_bool(&value) {
        Some(flag) => Some(flag),
        None => {
            warn!("{} has unrecognized value {:?}, treating as false", name, value);
            Some(false)
        }
    }
}

/// Accepts true/false, 1/0, yes/no, on/off (case-insensitive)
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
