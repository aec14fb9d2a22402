//! Config path resolution
//!
//! Handles resolving the toolbox data directory and the files inside it.

use std::path::{Path, PathBuf};

use super::{ConfigError, ConfigResult};

/// Environment variable overriding the toolbox data directory
pub const HOME_ENV: &str = "GWTB_HOME";

/// Directory name under the local application data folder
const DATA_DIR_NAME: &str = "GWToolboxpp";

/// Returns the toolbox base directory.
///
/// `GWTB_HOME` wins when set; otherwise this is
/// `%LOCALAPPDATA%/GWToolboxpp/` (or the platform equivalent).
pub fn toolbox_base_dir() -> ConfigResult<PathBuf> {
    if let Some(home) = std::env::var_os(HOME_ENV) {
        return Ok(PathBuf::from(home));
    }

    dirs_next::data_local_dir()
        .map(|dir| dir.join(DATA_DIR_NAME))
        .ok_or(ConfigError::NoConfigDirectory)
}

/// Returns the core config path.
///
/// Path: `<base>/core.toml`
pub fn core_config_path() -> ConfigResult<PathBuf> {
    Ok(toolbox_base_dir()?.join("core.toml"))
}

/// Resolved locations of every file the toolbox touches
#[derive(Debug, Clone)]
pub struct ToolboxPaths {
    base: PathBuf,
    settings_file: String,
    layout_file: String,
    plugins_dir: String,
}

impl ToolboxPaths {
    pub fn new(base: impl Into<PathBuf>, config: &super::ToolboxConfig) -> Self {
        Self {
            base: base.into(),
            settings_file: config.settings_file.clone(),
            layout_file: config.layout_file.clone(),
            plugins_dir: config.plugins_dir.clone(),
        }
    }

    /// Base data directory
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Resolve a path relative to the base directory
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.base.join(relative)
    }

    /// Persisted module settings
    pub fn settings_file(&self) -> PathBuf {
        self.path(&self.settings_file)
    }

    /// Persisted UI window layout
    pub fn layout_file(&self) -> PathBuf {
        self.path(&self.layout_file)
    }

    /// Directory scanned for plugin libraries
    pub fn plugins_dir(&self) -> PathBuf {
        self.path(&self.plugins_dir)
    }

    /// Log file written by the injected DLL
    pub fn log_file(&self) -> PathBuf {
        self.path("toolbox.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolboxConfig;

    #[test]
    fn test_paths_resolve_under_base() {
        let paths = ToolboxPaths::new("/data/GWToolboxpp", &ToolboxConfig::default());

        assert!(paths.settings_file().ends_with("GWToolboxpp/GWToolbox.toml"));
        assert!(paths.layout_file().ends_with("GWToolboxpp/interface.ini"));
        assert!(paths.plugins_dir().ends_with("GWToolboxpp/plugins"));
        assert!(paths.path("img/icons").starts_with("/data/GWToolboxpp"));
    }
}
