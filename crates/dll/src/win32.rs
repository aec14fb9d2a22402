//! Win32 implementation of [`Platform`]

use std::ffi::c_void;

use gwtb_host::{HostError, Platform};
use gwtb_sdk::{Hwnd, WindowMessage, WndProc};
use windows::core::HSTRING;
use windows::Win32::Foundation::{GetLastError, SetLastError, HWND, LPARAM, WIN32_ERROR, WPARAM};
use windows::Win32::System::SystemInformation::GetTickCount;
use windows::Win32::UI::Input::KeyboardAndMouse::{GetAsyncKeyState, GetKeyState};
use windows::Win32::UI::WindowsAndMessaging::{
    CallWindowProcW, DefWindowProcW, IsIconic, MessageBoxW, MB_ICONERROR, MB_OK, WNDPROC,
};

#[cfg(target_pointer_width = "64")]
use windows::Win32::UI::WindowsAndMessaging::{SetWindowLongPtrW, GWLP_WNDPROC};
#[cfg(target_pointer_width = "32")]
use windows::Win32::UI::WindowsAndMessaging::{SetWindowLongW, GWL_WNDPROC};

fn hwnd(handle: Hwnd) -> HWND {
    HWND(handle.0 as *mut c_void)
}

fn to_win32(proc_: Option<WndProc>) -> WNDPROC {
    // SAFETY: Hwnd is transparent over a pointer-sized integer, so both
    // signatures have the same ABI
    proc_.map(|p| unsafe { std::mem::transmute::<WndProc, _>(p) })
}

/// Swap the window procedure slot, returning the previous value
unsafe fn swap_wnd_proc(handle: Hwnd, value: isize) -> Result<isize, HostError> {
    SetLastError(WIN32_ERROR(0));

    #[cfg(target_pointer_width = "64")]
    let previous = SetWindowLongPtrW(hwnd(handle), GWLP_WNDPROC, value);
    #[cfg(target_pointer_width = "32")]
    let previous = SetWindowLongW(hwnd(handle), GWL_WNDPROC, value as i32) as isize;

    // Zero is also a valid previous value; only the last error tells them apart
    let error = GetLastError();
    if previous == 0 && error.0 != 0 {
        return Err(HostError::Os {
            call: "SetWindowLong",
            code: error.0,
        });
    }
    Ok(previous)
}

/// OS services backed by user32/kernel32
#[derive(Debug, Default)]
pub struct Win32Platform;

impl Platform for Win32Platform {
    fn tick_count(&self) -> u32 {
        // SAFETY: no preconditions
        unsafe { GetTickCount() }
    }

    fn is_key_down(&self, vk: u16) -> bool {
        // SAFETY: no preconditions
        unsafe { GetKeyState(vk as i32) < 0 }
    }

    fn is_async_key_down(&self, vk: u16) -> bool {
        // SAFETY: no preconditions
        unsafe { GetAsyncKeyState(vk as i32) < 0 }
    }

    fn was_key_pressed(&self, vk: u16) -> bool {
        // SAFETY: no preconditions
        unsafe { GetAsyncKeyState(vk as i32) & 1 != 0 }
    }

    fn is_minimized(&self, handle: Hwnd) -> bool {
        // SAFETY: IsIconic tolerates stale handles
        unsafe { IsIconic(hwnd(handle)).as_bool() }
    }

    unsafe fn replace_window_proc(
        &self,
        handle: Hwnd,
        detour: WndProc,
    ) -> Result<Option<WndProc>, HostError> {
        let previous = swap_wnd_proc(handle, detour as usize as isize)?;
        if previous == 0 {
            return Ok(None);
        }
        Ok(Some(std::mem::transmute::<isize, WndProc>(previous)))
    }

    unsafe fn restore_window_proc(
        &self,
        handle: Hwnd,
        previous: Option<WndProc>,
    ) -> Result<(), HostError> {
        let value = previous.map_or(0, |p| p as usize as isize);
        swap_wnd_proc(handle, value).map(|_| ())
    }

    fn call_window_proc(&self, previous: Option<WndProc>, handle: Hwnd, msg: WindowMessage) -> isize {
        let (wparam, lparam) = (WPARAM(msg.wparam), LPARAM(msg.lparam));
        // SAFETY: `previous` came from replace_window_proc on this window
        let result = unsafe {
            match to_win32(previous) {
                original @ Some(_) => CallWindowProcW(original, hwnd(handle), msg.msg, wparam, lparam),
                None => DefWindowProcW(hwnd(handle), msg.msg, wparam, lparam),
            }
        };
        result.0
    }

    fn show_error(&self, title: &str, text: &str) {
        // SAFETY: both strings outlive the call
        unsafe {
            MessageBoxW(
                HWND::default(),
                &HSTRING::from(text),
                &HSTRING::from(title),
                MB_OK | MB_ICONERROR,
            );
        }
    }
}
