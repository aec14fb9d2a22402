//! Configuration for the toolbox runtime
//!
//! This is the framework-level configuration (`core.toml`), read once by the
//! worker thread before anything is hooked. Per-module settings live in the
//! [`SettingsStore`](crate::settings::SettingsStore) instead.
//!
//! # Example
//!
//! ```ignore
//! use gwtb_core::ToolboxConfig;
//!
//! let config = ToolboxConfig::load().unwrap_or_default();
//! println!("Polling every {}ms", config.poll_interval_ms);
//! ```

mod loader;

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use loader::{core_config_path, toolbox_base_dir, ToolboxPaths, HOME_ENV};

/// Configuration system errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read or write config file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML content
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config to TOML
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// Could not determine the toolbox data directory
    #[error("Config directory not available - no local data directory and GWTB_HOME unset")]
    NoConfigDirectory,
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Core toolbox configuration.
///
/// Loaded from `<base>/core.toml`; a default file is written when missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolboxConfig {
    /// Config version for future migration support
    pub version: u32,

    /// Enable debug logging
    pub debug: bool,

    /// Allow the End key to trigger self-destruct
    pub unload_hotkey: bool,

    /// How often the worker thread checks for the destroyed flag
    pub poll_interval_ms: u64,

    /// Pause between teardown steps on the worker thread
    pub settle_delay_ms: u64,

    /// Plugin directory, relative to the base directory
    pub plugins_dir: String,

    /// Module settings file, relative to the base directory
    pub settings_file: String,

    /// UI layout file, relative to the base directory
    pub layout_file: String,

    /// Remote base URL for default resources (settings, fonts)
    pub resource_url: String,

    /// Release feed queried by the updater
    pub update_url: String,
}

impl Default for ToolboxConfig {
    fn default() -> Self {
        Self {
            version: 1,
            debug: false,
            unload_hotkey: cfg!(debug_assertions),
            poll_interval_ms: 100,
            settle_delay_ms: 100,
            plugins_dir: "plugins".to_string(),
            settings_file: "GWToolbox.toml".to_string(),
            layout_file: "interface.ini".to_string(),
            resource_url: "https://raw.githubusercontent.com/HasKha/GWToolboxpp/master/resources"
                .to_string(),
            update_url: "https://api.github.com/repos/HasKha/GWToolboxpp/releases/latest"
                .to_string(),
        }
    }
}

impl ToolboxConfig {
    /// Load core config from the default location, creating it if missing.
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&core_config_path()?)
    }

    /// Load core config from a specific file, creating it if missing.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            tracing::debug!("Loaded core config from {:?}", path);
            Ok(config)
        } else {
            let default = Self::default();
            default.save_to(path)?;
            tracing::info!("Created default core config at {:?}", path);
            Ok(default)
        }
    }

    /// Save core config to a specific file.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::debug!("Saved core config to {:?}", path);
        Ok(())
    }

    /// Remote location of a default resource file
    pub fn resource_url(&self, file: &str) -> String {
        format!("{}/{}", self.resource_url.trim_end_matches('/'), file)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}
