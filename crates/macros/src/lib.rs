//! GWToolbox Proc Macros
//!
//! - `#[toolbox_plugin]` - Export a module constructor as a toolbox plugin
//!
//! # Example
//!
//! ```ignore
//! use gwtb_core::{toolbox_plugin, ToolboxModule};
//!
//! #[derive(Default)]
//! struct Clock;
//!
//! impl ToolboxModule for Clock {
//!     fn name(&self) -> &str {
//!         "Clock"
//!     }
//! }
//!
//! #[toolbox_plugin]
//! fn create() -> Clock {
//!     Clock
//! }
//!
//! // Generated:
//! // - GWTB_AbiVersion() -> u32
//! // - GWTB_Instance() -> *mut c_void
//! ```

mod plugin;

use proc_macro::TokenStream;
use syn::{parse_macro_input, ItemFn};

/// Attribute macro for plugin entry points
///
/// Put it on a function taking no arguments and returning a type that
/// implements `ToolboxModule`. The crate must be built as a `cdylib` and
/// depend on `gwtb-core`.
///
/// # Generated Code
///
/// - The original function, unchanged
/// - `GWTB_AbiVersion` - returns the ABI version the plugin was built against
/// - `GWTB_Instance` - calls the function and hands the boxed module to the
///   loader, or returns null if it panicked
#[proc_macro_attribute]
pub fn toolbox_plugin(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[toolbox_plugin] takes no arguments",
        )
        .to_compile_error()
        .into();
    }
    let func = parse_macro_input!(item as ItemFn);
    plugin::generate_plugin_exports(func).into()
}
