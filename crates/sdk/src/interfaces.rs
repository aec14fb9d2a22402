//! Host type definitions
//!
//! These are opaque types and thin handles for things the host owns.
//! We never look inside the render device - it is only passed through to
//! the UI backend and the vtable hooks.

use std::ffi::c_void;
use std::ptr::NonNull;

/// Opaque type for IDirect3DDevice9
/// The host's render device, handed to every render/reset callback
#[repr(C)]
pub struct IDirect3DDevice9 {
    _opaque: [u8; 0],
}

/// Handle to the host's render device
///
/// Valid for as long as the host keeps the device alive, which covers every
/// render and reset callback it is passed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Device(NonNull<IDirect3DDevice9>);

// SAFETY: the device is only ever dereferenced on the host's render thread;
// the handle itself is just an address.
unsafe impl Send for Device {}
unsafe impl Sync for Device {}

impl Device {
    /// Wrap a raw device pointer, rejecting null
    pub fn from_raw(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr as *mut IDirect3DDevice9).map(Self)
    }

    /// Get the raw device pointer
    pub fn as_ptr(&self) -> *mut IDirect3DDevice9 {
        self.0.as_ptr()
    }
}

/// Window handle (HWND)
///
/// Transparent over a pointer-sized integer so it can cross the
/// window-procedure ABI unchanged.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hwnd(pub isize);

impl Hwnd {
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

/// Window procedure signature (WNDPROC)
pub type WndProc = unsafe extern "system" fn(Hwnd, u32, usize, isize) -> isize;

/// Kind of map instance the player is currently in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceType {
    Outpost,
    Explorable,
    /// Map is loading; most game state is unavailable
    Loading,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_rejects_null() {
        assert!(Device::from_raw(std::ptr::null_mut()).is_none());
        let device = Device::from_raw(0x1000 as *mut c_void).unwrap();
        assert_eq!(device.as_ptr() as usize, 0x1000);
    }

    #[test]
    fn test_hwnd_is_pointer_sized() {
        assert_eq!(std::mem::size_of::<Hwnd>(), std::mem::size_of::<*mut c_void>());
        assert!(Hwnd::default().is_null());
    }
}
