//! Configuration resolution and path discovery.
//!
//! Resolution order: CLI arguments → environment variables → XDG paths → system → defaults.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::scoring::RiskQuantConfig;
use crate::validate::{validate_config, ValidationError, ValidationResult};

/// Discovered configuration file path.
#[derive(Debug, Clone, Default)]
pub struct ConfigPath {
    /// Path to risk_quant.json (or None if not found).
    pub path: Option<PathBuf>,

    /// Where the path came from (for diagnostics).
    pub source: ConfigSource,
}

/// Where a configuration file was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Set via environment variable.
    Environment,

    /// Found in XDG config directory.
    XdgConfig,

    /// Found in /etc/risk-quant/.
    SystemConfig,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::SystemConfig => write!(f, "system config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Environment variable names.
pub const ENV_CONFIG_PATH: &str = "RISK_QUANT_CONFIG";
pub const ENV_CONFIG_DIR: &str = "RISK_QUANT_CONFIG_DIR";
pub const ENV_STATE_DIR: &str = "RISK_QUANT_STATE_DIR";

/// Standard config file name.
const CONFIG_FILENAME: &str = "risk_quant.json";

/// Application name for XDG directories.
const APP_NAME: &str = "risk-quant";

/// Resolve the configuration path.
///
/// 1. Explicit CLI path (if it exists)
/// 2. RISK_QUANT_CONFIG
/// 3. RISK_QUANT_CONFIG_DIR + filename
/// 4. XDG config directory (~/.config/risk-quant/)
/// 5. System config (/etc/risk-quant/)
/// 6. Built-in defaults (None)
pub fn resolve_config(cli_path: Option<&Path>) -> ConfigPath {
    if let Some(path) = cli_path {
        if path.exists() {
            return found(path.to_path_buf(), ConfigSource::CliArgument);
        }
    }

    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return found(path, ConfigSource::Environment);
        }
    }

    if let Ok(config_dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = PathBuf::from(config_dir).join(CONFIG_FILENAME);
        if path.exists() {
            return found(path, ConfigSource::Environment);
        }
    }

    if let Some(xdg_config) = dirs::config_dir() {
        let path = xdg_config.join(APP_NAME).join(CONFIG_FILENAME);
        if path.exists() {
            return found(path, ConfigSource::XdgConfig);
        }
    }

    let system_path = system_config_dir().join(CONFIG_FILENAME);
    if system_path.exists() {
        return found(system_path, ConfigSource::SystemConfig);
    }

    ConfigPath::default()
}

fn found(path: PathBuf, source: ConfigSource) -> ConfigPath {
    ConfigPath {
        path: Some(path),
        source,
    }
}

/// A validated configuration with provenance.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: RiskQuantConfig,
    pub path: Option<PathBuf>,
    pub source: ConfigSource,
    /// SHA-256 of the file content (None when using defaults).
    pub content_hash: Option<String>,
}

/// Resolve, read, parse and validate the configuration.
///
/// A CLI path that does not exist is an error rather than a silent fallback.
pub fn load_config(cli_path: Option<&Path>) -> ValidationResult<LoadedConfig> {
    if let Some(path) = cli_path {
        if !path.exists() {
            return Err(ValidationError::IoError(format!(
                "config file not found: {}",
                path.display()
            )));
        }
    }

    let resolved = resolve_config(cli_path);
    let Some(path) = resolved.path else {
        let config = RiskQuantConfig::default();
        validate_config(&config)?;
        return Ok(LoadedConfig {
            config,
            path: None,
            source: ConfigSource::BuiltinDefault,
            content_hash: None,
        });
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| ValidationError::IoError(format!("{}: {}", path.display(), e)))?;
    let config = RiskQuantConfig::parse_json(&content)?;
    validate_config(&config)?;

    Ok(LoadedConfig {
        config,
        path: Some(path),
        source: resolved.source,
        content_hash: Some(hash_content(&content)),
    })
}

/// Hex SHA-256 of a config file's text.
pub fn hash_content(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Get the XDG config directory for risk-quant.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Get the system config directory.
pub fn system_config_dir() -> PathBuf {
    PathBuf::from("/etc").join(APP_NAME)
}

/// Directory holding the derived-state store.
///
/// CLI → RISK_QUANT_STATE_DIR → XDG data dir → `./.risk-quant`.
pub fn state_dir(cli_dir: Option<&Path>) -> PathBuf {
    if let Some(dir) = cli_dir {
        return dir.to_path_buf();
    }
    if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
        return PathBuf::from(dir);
    }
    dirs::data_local_dir()
        .map(|d| d.join(APP_NAME))
        .unwrap_or_else(|| PathBuf::from(".").join(format!(".{APP_NAME}")))
}
