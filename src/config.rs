//! Parser for `~/.config/doceria/config.toml`.
//!
//! The file is optional. Any subset of keys may be given; the rest fall back
//! to [`Config::default`]. Unknown keys are accepted but logged.
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable that overrides `[remote] api_key`.
pub const API_KEY_ENV: &str = "DOCERIA_API_KEY";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Remote store is not configured: {0}")]
    RemoteIncomplete(&'static str),
}

// ============================================================================
// Configuration Structs
// ============================================================================

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// "dark" or "light".
    pub theme: String,

    /// Columns of indentation per tree level.
    pub indent_width: u16,

    /// Placeholder rows drawn while the first load is in flight.
    pub placeholder_rows: usize,

    /// Default state of the form's "keep creating" toggle.
    pub keep_creating: bool,

    /// SQLite file; defaults to `catalog.db` next to the config file.
    pub database_path: Option<PathBuf>,

    /// Action name to key string, e.g. `quit = "Ctrl+q"`.
    pub keybindings: HashMap<String, String>,

    pub remote: Option<RemoteConfig>,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub table: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: None,
            table: "categorias".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            indent_width: 2,
            placeholder_rows: 5,
            keep_creating: false,
            database_path: None,
            keybindings: HashMap::new(),
            remote: None,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("theme", &self.theme)
            .field("indent_width", &self.indent_width)
            .field("placeholder_rows", &self.placeholder_rows)
            .field("keep_creating", &self.keep_creating)
            .field("database_path", &self.database_path)
            .field("keybindings", &self.keybindings)
            .field("remote", &self.remote)
            .finish()
    }
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("table", &self.table)
            .finish()
    }
}

/// Resolved connection settings for the hosted store.
pub struct RemoteSettings {
    pub base_url: String,
    pub table: String,
    pub api_key: SecretString,
}

const KNOWN_KEYS: &[&str] = &[
    "theme",
    "indent_width",
    "placeholder_rows",
    "keep_creating",
    "database_path",
    "keybindings",
    "remote",
];
const KNOWN_REMOTE_KEYS: &[&str] = &["base_url", "api_key", "table"];

impl Config {
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// Missing and blank files yield defaults. Files over 1 MB are refused
    /// before being read.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        warn_unknown_keys(&content);

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), theme = %config.theme, "Loaded configuration");
        Ok(config)
    }

    /// Settings for the hosted store, with `env_key` (normally the value of
    /// [`API_KEY_ENV`]) taking precedence over the file's `api_key`.
    pub fn remote_settings(&self, env_key: Option<String>) -> Result<RemoteSettings, ConfigError> {
        let remote = self
            .remote
            .as_ref()
            .ok_or(ConfigError::RemoteIncomplete("missing [remote] section"))?;
        if remote.base_url.trim().is_empty() {
            return Err(ConfigError::RemoteIncomplete("missing base_url"));
        }
        let key = env_key
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                remote
                    .api_key
                    .clone()
                    .filter(|k| !k.trim().is_empty())
            })
            .ok_or(ConfigError::RemoteIncomplete("missing api_key"))?;

        Ok(RemoteSettings {
            base_url: remote.base_url.trim().to_string(),
            table: remote.table.clone(),
            api_key: SecretString::from(key),
        })
    }
}

fn warn_unknown_keys(content: &str) {
    let Ok(raw) = content.parse::<toml::Table>() else {
        return;
    };
    for key in raw.keys() {
        if !KNOWN_KEYS.contains(&key.as_str()) {
            tracing::warn!(key = %key, "Unknown key in config file, ignoring");
        }
    }
    if let Some(toml::Value::Table(remote)) = raw.get("remote") {
        for key in remote.keys() {
            if !KNOWN_REMOTE_KEYS.contains(&key.as_str()) {
                tracing::warn!(key = %key, "Unknown key in [remote], ignoring");
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
