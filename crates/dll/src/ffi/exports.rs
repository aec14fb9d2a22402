//! Symbols exported from the injected library

use std::ffi::c_void;
use std::panic::catch_unwind;

use gwtb_core::{overlay, WorkerExit};
use windows::Win32::Foundation::{CloseHandle, BOOL, FALSE, HINSTANCE, HMODULE, TRUE};
use windows::Win32::System::LibraryLoader::{DisableThreadLibraryCalls, FreeLibraryAndExitThread};
use windows::Win32::System::SystemServices::DLL_PROCESS_ATTACH;
use windows::Win32::System::Threading::{CreateThread, THREAD_CREATION_FLAGS};

/// Library entry point
///
/// # Safety
/// Called by the OS loader only.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "system" fn DllMain(module: HINSTANCE, reason: u32, _reserved: *mut c_void) -> BOOL {
    if reason != DLL_PROCESS_ATTACH {
        return TRUE;
    }

    let _ = DisableThreadLibraryCalls(HMODULE(module.0));
    match CreateThread(
        None,
        0,
        Some(thread_entry),
        Some(module.0 as *const c_void),
        THREAD_CREATION_FLAGS(0),
        None,
    ) {
        Ok(thread) => {
            let _ = CloseHandle(thread);
            TRUE
        }
        Err(_) => FALSE,
    }
}

/// Worker thread start routine; unloads the library when the worker ends
unsafe extern "system" fn thread_entry(module: *mut c_void) -> u32 {
    let code = match catch_unwind(crate::entry::run) {
        Ok(exit) => exit_code(exit),
        Err(_) => exit_code(WorkerExit::Panicked),
    };
    FreeLibraryAndExitThread(HMODULE(module), code)
}

fn exit_code(exit: WorkerExit) -> u32 {
    match exit {
        WorkerExit::Completed => 0,
        WorkerExit::ApiInitFailed => 1,
        WorkerExit::HookInstallFailed => 2,
        WorkerExit::Panicked => 3,
    }
}

/// Ask a running toolbox to unload itself. Returns false when none is running.
#[no_mangle]
pub extern "C" fn GWTB_RequestUnload() -> bool {
    match overlay::current() {
        Some(overlay) => {
            overlay.request_self_destruct();
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let codes = [
            WorkerExit::Completed,
            WorkerExit::ApiInitFailed,
            WorkerExit::HookInstallFailed,
            WorkerExit::Panicked,
        ]
        .map(exit_code);
        assert_eq!(codes, [0, 1, 2, 3]);
    }

    #[test]
    fn test_unload_without_toolbox() {
        assert!(!GWTB_RequestUnload());
    }
}
