//! Plugin discovery
//!
//! Every library in the plugin directory is a candidate. A library is
//! accepted when it exports the ABI version query and the module factory
//! (see [`gwtb_sdk::versions`]), the version matches, and the factory hands
//! back a usable module. Anything else is skipped with one warning; a bad
//! plugin never stops the rest from loading.

mod loader;

use std::path::{Path, PathBuf};

use gwtb_sdk::versions::PLUGIN_EXTENSION;

use crate::modules::ToolboxModule;

pub use loader::LibraryPluginSource;

/// Plugin loading errors
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("Failed to load library: {0}")]
    Load(#[from] libloading::Error),

    #[error("Missing entry point {symbol}")]
    MissingEntryPoint { symbol: &'static str },

    #[error("ABI version mismatch: expected {expected}, found {found}")]
    AbiMismatch { expected: u32, found: u32 },

    #[error("Factory returned a null module")]
    NullModule,

    #[error("Invalid module: {0}")]
    InvalidModule(String),

    #[error("Factory panicked: {0}")]
    FactoryPanicked(String),
}

/// A module created by a plugin library
pub struct LoadedPlugin {
    pub module: Box<dyn ToolboxModule>,
    /// Keeps the code behind `module` mapped. Must outlive the module.
    pub library: Option<libloading::Library>,
}

/// Turns a library path into a module
pub trait PluginSource: Send {
    fn load(&self, path: &Path) -> Result<LoadedPlugin, PluginError>;
}

/// Outcome of scanning the plugin directory
#[derive(Default)]
pub struct PluginReport {
    pub loaded: Vec<(PathBuf, LoadedPlugin)>,
    pub skipped: Vec<(PathBuf, PluginError)>,
}

/// List candidate libraries in `dir`, sorted by file name.
///
/// A missing directory yields nothing.
pub fn discover(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("No plugins loaded from {:?}: {}", dir, e);
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case(PLUGIN_EXTENSION))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();
    paths
}

/// Load every candidate library in `dir`
pub fn load_plugins(dir: &Path, source: &dyn PluginSource) -> PluginReport {
    let mut report = PluginReport::default();

    for path in discover(dir) {
        match source.load(&path) {
            Ok(plugin) => {
                tracing::info!("Loaded plugin '{}' from {:?}", plugin.module.name(), path);
                report.loaded.push((path, plugin));
            }
            Err(e) => {
                tracing::warn!("Skipping plugin {:?}: {}", path, e);
                report.skipped.push((path, e));
            }
        }
    }

    report
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::modules::ChatFilter;

    /// Accepts files whose name starts with "good"
    pub(crate) struct FakeSource;

    impl PluginSource for FakeSource {
        fn load(&self, path: &Path) -> Result<LoadedPlugin, PluginError> {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            if stem.starts_with("good") {
                Ok(LoadedPlugin {
                    module: Box::new(ChatFilter::default()),
                    library: None,
                })
            } else {
                Err(PluginError::MissingEntryPoint {
                    symbol: "GWTB_Instance",
                })
            }
        }
    }

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn test_discover_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &format!("b.{}", PLUGIN_EXTENSION));
        touch(dir.path(), &format!("a.{}", PLUGIN_EXTENSION));
        touch(dir.path(), "readme.txt");
        std::fs::create_dir(dir.path().join(format!("folder.{}", PLUGIN_EXTENSION))).unwrap();

        let found: Vec<String> = discover(dir.path())
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            found,
            vec![format!("a.{}", PLUGIN_EXTENSION), format!("b.{}", PLUGIN_EXTENSION)]
        );
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let report = load_plugins(&dir.path().join("plugins"), &FakeSource);
        assert!(report.loaded.is_empty());
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_bad_plugin_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &format!("good.{}", PLUGIN_EXTENSION));
        touch(dir.path(), &format!("noexport.{}", PLUGIN_EXTENSION));

        let report = load_plugins(dir.path(), &FakeSource);

        assert_eq!(report.loaded.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert!(matches!(
            report.skipped[0].1,
            PluginError::MissingEntryPoint { .. }
        ));
    }
}
