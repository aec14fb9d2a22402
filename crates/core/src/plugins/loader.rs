//! Dynamic library plugin source

use std::ffi::c_void;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use gwtb_sdk::versions::{PLUGIN_ABI_SYMBOL, PLUGIN_ABI_VERSION, PLUGIN_INSTANCE_SYMBOL};
use libloading::Library;

use super::{LoadedPlugin, PluginError, PluginSource};
use crate::modules::{panic_message, ToolboxModule};

type AbiVersionFn = unsafe extern "C" fn() -> u32;
type InstanceFn = unsafe extern "C" fn() -> *mut c_void;

/// Loads plugins with the OS dynamic loader
#[derive(Debug, Default, Clone, Copy)]
pub struct LibraryPluginSource;

impl PluginSource for LibraryPluginSource {
    fn load(&self, path: &Path) -> Result<LoadedPlugin, PluginError> {
        // SAFETY: loading runs the library's initializers. Plugins are
        // trusted code the user placed in the plugin directory.
        let library = unsafe { Library::new(path)? };

        // SAFETY: symbol types match what `#[toolbox_plugin]` exports
        let abi_version: AbiVersionFn = unsafe {
            *library
                .get::<AbiVersionFn>(PLUGIN_ABI_SYMBOL)
                .map_err(|_| PluginError::MissingEntryPoint {
                    symbol: "GWTB_AbiVersion",
                })?
        };
        let instance: InstanceFn = unsafe {
            *library
                .get::<InstanceFn>(PLUGIN_INSTANCE_SYMBOL)
                .map_err(|_| PluginError::MissingEntryPoint {
                    symbol: "GWTB_Instance",
                })?
        };

        let found = unsafe { abi_version() };
        if found != PLUGIN_ABI_VERSION {
            return Err(PluginError::AbiMismatch {
                expected: PLUGIN_ABI_VERSION,
                found,
            });
        }

        let raw = catch_unwind(AssertUnwindSafe(|| unsafe { instance() }))
            .map_err(|payload| PluginError::FactoryPanicked(panic_message(payload.as_ref())))?;
        if raw.is_null() {
            return Err(PluginError::NullModule);
        }

        // SAFETY: the factory returns `Box::into_raw(Box::new(Box<dyn ToolboxModule>))`
        // and transfers ownership to us
        let module: Box<dyn ToolboxModule> =
            unsafe { *Box::from_raw(raw as *mut Box<dyn ToolboxModule>) };

        if module.name().trim().is_empty() {
            return Err(PluginError::InvalidModule("module has no name".to_string()));
        }

        Ok(LoadedPlugin {
            module,
            library: Some(library),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_library_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.plugin");
        std::fs::write(&path, b"definitely not a shared object").unwrap();

        let result = LibraryPluginSource.load(&path);

        assert!(matches!(result, Err(PluginError::Load(_))));
    }
}
