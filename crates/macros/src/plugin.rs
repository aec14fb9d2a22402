//! Plugin export attribute implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{ItemFn, ReturnType};

/// Reject constructors the loader cannot call
fn validate(func: &ItemFn) -> syn::Result<()> {
    let sig = &func.sig;
    if !sig.inputs.is_empty() {
        return Err(syn::Error::new(
            sig.inputs.span(),
            "plugin constructor must take no arguments",
        ));
    }
    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new(
            asyncness.span(),
            "plugin constructor cannot be async",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new(
            sig.generics.span(),
            "plugin constructor cannot be generic",
        ));
    }
    if let ReturnType::Default = sig.output {
        return Err(syn::Error::new(
            sig.ident.span(),
            "plugin constructor must return the module",
        ));
    }
    Ok(())
}

/// Generate the plugin exports
pub fn generate_plugin_exports(func: ItemFn) -> TokenStream {
    if let Err(e) = validate(&func) {
        return e.to_compile_error();
    }

    let fn_name = &func.sig.ident;

    quote! {
        #func

        #[doc(hidden)]
        #[no_mangle]
        pub extern "C" fn GWTB_AbiVersion() -> u32 {
            ::gwtb_core::sdk::PLUGIN_ABI_VERSION
        }

        #[doc(hidden)]
        #[no_mangle]
        pub extern "C" fn GWTB_Instance() -> *mut ::std::ffi::c_void {
            // A panic must not unwind into the loader
            let created = ::std::panic::catch_unwind(|| {
                let module: ::std::boxed::Box<dyn ::gwtb_core::ToolboxModule> =
                    ::std::boxed::Box::new(#fn_name());
                ::std::boxed::Box::into_raw(::std::boxed::Box::new(module))
            });
            match created {
                Ok(module) => module as *mut ::std::ffi::c_void,
                Err(_) => ::std::ptr::null_mut(),
            }
        }
    }
}
