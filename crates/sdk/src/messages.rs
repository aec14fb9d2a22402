//! Window message definitions
//!
//! Values must match the Win32 headers exactly - they are compared against
//! what the host's message pump hands us.

// Window lifecycle
pub const WM_SIZE: u32 = 0x0005;
pub const WM_CLOSE: u32 = 0x0010;
pub const WM_QUIT: u32 = 0x0012;

// Keyboard
pub const WM_KEYDOWN: u32 = 0x0100;
pub const WM_KEYUP: u32 = 0x0101;
pub const WM_CHAR: u32 = 0x0102;
pub const WM_SYSKEYDOWN: u32 = 0x0104;
pub const WM_SYSKEYUP: u32 = 0x0105;
pub const WM_SYSCHAR: u32 = 0x0106;
pub const WM_IME_CHAR: u32 = 0x0286;

// Mouse
pub const WM_MOUSEMOVE: u32 = 0x0200;
pub const WM_LBUTTONDOWN: u32 = 0x0201;
pub const WM_LBUTTONUP: u32 = 0x0202;
pub const WM_LBUTTONDBLCLK: u32 = 0x0203;
pub const WM_RBUTTONDOWN: u32 = 0x0204;
pub const WM_RBUTTONUP: u32 = 0x0205;
pub const WM_RBUTTONDBLCLK: u32 = 0x0206;
pub const WM_MBUTTONDOWN: u32 = 0x0207;
pub const WM_MBUTTONUP: u32 = 0x0208;
pub const WM_MBUTTONDBLCLK: u32 = 0x0209;
pub const WM_MOUSEWHEEL: u32 = 0x020A;
pub const WM_XBUTTONDOWN: u32 = 0x020B;
pub const WM_XBUTTONUP: u32 = 0x020C;
pub const WM_XBUTTONDBLCLK: u32 = 0x020D;

// X button identifiers (high word of wParam)
pub const XBUTTON1: u16 = 0x0001;
pub const XBUTTON2: u16 = 0x0002;

/// Virtual-key codes used by the toolbox
pub mod vk {
    pub const MBUTTON: u16 = 0x04;
    pub const XBUTTON1: u16 = 0x05;
    pub const XBUTTON2: u16 = 0x06;
    pub const RETURN: u16 = 0x0D;
    pub const SHIFT: u16 = 0x10;
    pub const CONTROL: u16 = 0x11;
    pub const MENU: u16 = 0x12;
    pub const END: u16 = 0x23;
}

/// A single message delivered to a window procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowMessage {
    pub msg: u32,
    pub wparam: usize,
    pub lparam: isize,
}

impl WindowMessage {
    pub const fn new(msg: u32, wparam: usize, lparam: isize) -> Self {
        Self { msg, wparam, lparam }
    }

    /// Signed x coordinate packed in the low word of lParam (GET_X_LPARAM)
    pub fn x(&self) -> i32 {
        (self.lparam as u32 & 0xFFFF) as u16 as i16 as i32
    }

    /// Signed y coordinate packed in the high word of lParam (GET_Y_LPARAM)
    pub fn y(&self) -> i32 {
        ((self.lparam as u32 >> 16) & 0xFFFF) as u16 as i16 as i32
    }

    /// Signed wheel delta packed in the high word of wParam
    pub fn wheel_delta(&self) -> i16 {
        ((self.wparam as u32 >> 16) & 0xFFFF) as u16 as i16
    }

    /// Which X button a WM_XBUTTON* message refers to
    pub fn xbutton(&self) -> u16 {
        ((self.wparam as u32 >> 16) & 0xFFFF) as u16
    }

    /// Build an lParam carrying a cursor position
    pub fn pack_point(x: i16, y: i16) -> isize {
        ((y as u16 as u32) << 16 | x as u16 as u32) as i32 as isize
    }
}
