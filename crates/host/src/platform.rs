//! Operating system contract
//!
//! Thin wrapper over the handful of Win32 calls the toolbox makes, so the
//! frame driver, input router and worker can run against a mock in tests.

use gwtb_sdk::{Hwnd, WindowMessage, WndProc};

use crate::error::HostError;

/// OS services used by the toolbox
pub trait Platform: Send + Sync {
    /// Milliseconds since system start (GetTickCount). Wraps around.
    fn tick_count(&self) -> u32;

    /// Whether a key is down according to the calling thread's key state
    /// (GetKeyState high bit)
    fn is_key_down(&self, vk: u16) -> bool;

    /// Whether a key is physically down right now (GetAsyncKeyState < 0)
    fn is_async_key_down(&self, vk: u16) -> bool;

    /// Whether a key was pressed since the last query (GetAsyncKeyState & 1)
    fn was_key_pressed(&self, vk: u16) -> bool;

    /// Whether the window is minimized
    fn is_minimized(&self, hwnd: Hwnd) -> bool;

    /// Replace the window procedure, returning the previous one
    ///
    /// # Safety
    /// `detour` must stay valid until the previous procedure is restored.
    unsafe fn replace_window_proc(
        &self,
        hwnd: Hwnd,
        detour: WndProc,
    ) -> Result<Option<WndProc>, HostError>;

    /// Put a previously returned window procedure back
    ///
    /// # Safety
    /// `previous` must be the value returned by the matching
    /// [`Platform::replace_window_proc`] call.
    unsafe fn restore_window_proc(
        &self,
        hwnd: Hwnd,
        previous: Option<WndProc>,
    ) -> Result<(), HostError>;

    /// Chain a message to a window procedure (CallWindowProc)
    fn call_window_proc(&self, previous: Option<WndProc>, hwnd: Hwnd, msg: WindowMessage) -> isize;

    /// Show a blocking error dialog to the user
    fn show_error(&self, title: &str, text: &str);
}
