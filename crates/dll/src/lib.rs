//! GWToolbox++ - Injected Library
//!
//! This crate compiles to the DLL that gets injected into the game. It
//! supplies the real collaborators for the orchestration core and starts the
//! worker thread from `DllMain`:
//!
//! - [`bridge`] - game API and UI backend over the C++ libraries
//! - [`logging`] - log file and subscriber setup
//! - `win32` - OS services (Windows only)
//! - `ffi` - `DllMain` and exported symbols (Windows only)

pub mod bridge;
pub mod logging;

#[cfg(windows)]
mod entry;
#[cfg(windows)]
pub mod ffi;
#[cfg(windows)]
pub mod win32;
