//! Store configuration
//!
//! Configuration loaded from `.redux-store.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

const CONFIG_FILE: &str = ".redux-store.toml";

/// Store configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Name used as prefix in log lines
    #[serde(default = "default_name")]
    pub name: String,

    /// Install the logging middleware when building the store
    #[serde(default)]
    pub log_actions: bool,

    /// Warn when reducer plus listeners take longer than this (milliseconds)
    #[serde(default = "default_warn_after_ms")]
    pub warn_after_ms: u64,
}

fn default_name() -> String {
    "store".to_string()
}

fn default_warn_after_ms() -> u64 {
    32
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_actions: false,
            warn_after_ms: default_warn_after_ms(),
        }
    }
}

impl StoreConfig {
    /// Load config from CWD first, then home directory, or use defaults
    pub fn load() -> Self {
        if let Some(content) = load_config_file() {
            match Self::from_toml_str(&content) {
                Ok(config) => {
                    log::info!("Loaded store config from file");
                    return config;
                }
                Err(e) => {
                    log::warn!("Failed to parse store config file: {}", e);
                }
            }
        }

        log::debug!("Using default store config");
        Self::default()
    }

    /// Load config from an explicit path, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => match Self::from_toml_str(&content) {
                Ok(config) => return config,
                Err(e) => log::warn!("Failed to parse {}: {}", path.display(), e),
            },
            Err(e) => log::debug!("Could not read {}: {}", path.display(), e),
        }
        Self::default()
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn warn_after(&self) -> Duration {
        Duration::from_millis(self.warn_after_ms)
    }
}

/// Load config file content from CWD first, then home directory
fn load_config_file() -> Option<String> {
    if let Ok(content) = fs::read_to_string(CONFIG_FILE) {
        log::debug!("Loaded config from {}", CONFIG_FILE);
        return Some(content);
    }

    if let Some(home_config) = home_config_path() {
        if let Ok(content) = fs::read_to_string(&home_config) {
            log::debug!("Loaded config from {}", home_config.display());
            return Some(content);
        }
    }

    None
}

/// ~/.redux-store.toml if HOME is set
fn home_config_path() -> Option<PathBuf> {
    env::var_os("HOME").map(|home| PathBuf::from(home).join(CONFIG_FILE))
}
