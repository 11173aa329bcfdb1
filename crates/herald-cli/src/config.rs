//! Runner configuration.
//!
//! Configuration can be loaded from:
//! - Environment variables (HERALD_*)
//! - TOML configuration file

use anyhow::{Context, Result};
use herald_core::DispatcherConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Runner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Tracing filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Dispatcher settings.
    #[serde(default = "default_dispatcher")]
    pub dispatcher: DispatcherConfig,
}

// Default value functions
fn default_log_filter() -> String {
    std::env::var("HERALD_LOG").unwrap_or_else(|_| "herald=info,herald_core=info".to_string())
}

fn default_dispatcher() -> DispatcherConfig {
    let mut config = DispatcherConfig::default();
    if let Ok(separator) = std::env::var("HERALD_SEPARATOR") {
        config.separator = separator;
    }
    config
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            dispatcher: default_dispatcher(),
        }
    }
}

impl Config {
    /// Load configuration from file or defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_paths = [
            "herald.toml",
            "/etc/herald/herald.toml",
            "~/.config/herald/herald.toml",
        ];

        for path in &config_paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::from_file(expanded.as_ref());
            }
        }

        // Fall back to defaults with environment overrides
        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }
}
