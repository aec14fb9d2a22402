//! Window procedure hook
//!
//! Replaces the game window's procedure with [`safe_wnd_proc`], which hands
//! each message to the installed overlay. The replaced procedure is kept in
//! an [`OriginalWndProc`] slot shared with the overlay, so messages can be
//! forwarded without touching the toolbox lock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use gwtb_host::Platform;
use gwtb_sdk::{Hwnd, WindowMessage, WndProc};

use super::HookError;

/// The procedure that was in place before ours
#[derive(Debug, Clone, Default)]
pub struct OriginalWndProc(Arc<AtomicUsize>);

impl OriginalWndProc {
    pub fn get(&self) -> Option<WndProc> {
        match self.0.load(Ordering::Acquire) {
            0 => None,
            // SAFETY: only ever stored from a valid WndProc in `set`
            addr => Some(unsafe { std::mem::transmute::<usize, WndProc>(addr) }),
        }
    }

    fn set(&self, proc: Option<WndProc>) {
        self.0
            .store(proc.map(|p| p as usize).unwrap_or(0), Ordering::Release);
    }
}

/// Installs and restores the window procedure, each at most once
#[derive(Debug, Default)]
pub struct WndProcHook {
    original: OriginalWndProc,
    hwnd: Option<Hwnd>,
}

impl WndProcHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared slot the overlay forwards through
    pub fn original(&self) -> &OriginalWndProc {
        &self.original
    }

    pub fn is_installed(&self) -> bool {
        self.hwnd.is_some()
    }

    /// Put `detour` in place of the window's procedure
    ///
    /// # Safety
    /// `detour` must stay callable until [`WndProcHook::restore`] runs.
    pub unsafe fn install(
        &mut self,
        platform: &dyn Platform,
        hwnd: Hwnd,
        detour: WndProc,
    ) -> Result<(), HookError> {
        if self.hwnd.is_some() {
            return Err(HookError::AlreadyInstalled("window procedure"));
        }
        let previous = platform.replace_window_proc(hwnd, detour)?;
        self.original.set(previous);
        self.hwnd = Some(hwnd);
        tracing::info!(
            "Installed input event handler, previous = {:x}",
            previous.map(|p| p as usize).unwrap_or(0)
        );
        Ok(())
    }

    /// Put the original procedure back.
    ///
    /// Returns `false` when nothing was installed.
    pub fn restore(&mut self, platform: &dyn Platform) -> Result<bool, HookError> {
        let Some(hwnd) = self.hwnd.take() else {
            return Ok(false);
        };
        // SAFETY: this is the value `replace_window_proc` gave us for `hwnd`
        unsafe { platform.restore_window_proc(hwnd, self.original.get())? };
        tracing::info!("Restored input event handler");
        Ok(true)
    }
}

/// Replacement window procedure
///
/// # Safety
/// Called by the OS with the arguments of a window message.
pub unsafe extern "system" fn safe_wnd_proc(
    hwnd: Hwnd,
    msg: u32,
    wparam: usize,
    lparam: isize,
) -> isize {
    let message = WindowMessage::new(msg, wparam, lparam);
    match crate::overlay::current() {
        Some(overlay) => overlay.handle_message(hwnd, message),
        // Only reachable between teardown and restore; nothing to forward to
        None => 0,
    }
}
