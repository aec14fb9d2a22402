//! Plugin ABI contract
//!
//! Symbol names must match exactly what `#[toolbox_plugin]` exports.

/// Current plugin ABI version. Bump whenever `ToolboxModule` changes shape.
pub const PLUGIN_ABI_VERSION: u32 = 1;

/// Factory entry point: `extern "C" fn() -> *mut c_void`
pub const PLUGIN_INSTANCE_SYMBOL: &[u8] = b"GWTB_Instance\0";

/// ABI version query: `extern "C" fn() -> u32`
pub const PLUGIN_ABI_SYMBOL: &[u8] = b"GWTB_AbiVersion\0";

/// File extension of plugin libraries on this platform
#[cfg(windows)]
pub const PLUGIN_EXTENSION: &str = "dll";
#[cfg(target_os = "macos")]
pub const PLUGIN_EXTENSION: &str = "dylib";
#[cfg(all(unix, not(target_os = "macos")))]
pub const PLUGIN_EXTENSION: &str = "so";
