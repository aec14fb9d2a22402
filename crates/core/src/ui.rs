//! Immediate-mode UI backend contract
//!
//! The toolbox does not render anything itself. It feeds input into a
//! [`UiIo`] snapshot, and once per drawn frame hands that snapshot to the
//! backend, which reports back whether it wants the mouse or keyboard.

use std::path::Path;

use bitflags::bitflags;
use gwtb_sdk::{Device, Hwnd};

/// UI backend errors
#[derive(Debug, thiserror::Error)]
pub enum UiError {
    #[error("UI context could not be created: {0}")]
    ContextCreation(String),

    #[error("Renderer backend failed to initialize: {0}")]
    Renderer(String),

    #[error("Failed to load font {path}: {reason}")]
    Font { path: String, reason: String },
}

bitflags! {
    /// Modifier keys as seen by the UI
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Modifiers: u8 {
        const CTRL = 1 << 0;
        const SHIFT = 1 << 1;
        const ALT = 1 << 2;
    }
}

/// Number of virtual keys tracked
pub const KEY_COUNT: usize = 512;

/// Input state handed to the UI library every frame
#[derive(Debug, Clone)]
pub struct UiIo {
    pub mouse_pos: (f32, f32),
    /// Left, right, middle, x1, x2
    pub mouse_down: [bool; 5],
    mouse_wheel: f32,
    keys_down: [bool; KEY_COUNT],
    pub modifiers: Modifiers,
    input_chars: Vec<u16>,

    /// Set by the backend: the UI is hovering/dragging and wants mouse input
    pub want_capture_mouse: bool,
    /// Set by the backend: a text field has keyboard focus
    pub want_text_input: bool,
}

impl Default for UiIo {
    fn default() -> Self {
        Self {
            mouse_pos: (-1.0, -1.0),
            mouse_down: [false; 5],
            mouse_wheel: 0.0,
            keys_down: [false; KEY_COUNT],
            modifiers: Modifiers::empty(),
            input_chars: Vec::new(),
            want_capture_mouse: false,
            want_text_input: false,
        }
    }
}

impl UiIo {
    pub fn set_key_down(&mut self, vk: usize, down: bool) {
        if let Some(key) = self.keys_down.get_mut(vk) {
            *key = down;
        }
    }

    pub fn is_key_down(&self, vk: usize) -> bool {
        self.keys_down.get(vk).copied().unwrap_or(false)
    }

    /// Down state of every tracked key, indexed by virtual-key code
    pub fn keys_down(&self) -> &[bool] {
        &self.keys_down
    }

    pub fn add_mouse_wheel(&mut self, steps: f32) {
        self.mouse_wheel += steps;
    }

    pub fn mouse_wheel(&self) -> f32 {
        self.mouse_wheel
    }

    pub fn add_input_character(&mut self, c: u16) {
        self.input_chars.push(c);
    }

    pub fn input_characters(&self) -> &[u16] {
        &self.input_chars
    }

    /// Hand accumulated wheel steps and characters to the backend
    pub fn take_frame_input(&mut self) -> (f32, Vec<u16>) {
        let wheel = std::mem::take(&mut self.mouse_wheel);
        (wheel, std::mem::take(&mut self.input_chars))
    }
}

/// Style values applied by the theme module
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThemeStyle {
    pub window_rounding: f32,
    pub alpha: f32,
    pub font_scale: f32,
}

/// Immediate-mode UI library bound to the host's render device
pub trait UiBackend: Send {
    /// Create the UI context and bind the renderer to the device
    fn init(&mut self, hwnd: Hwnd, device: Device) -> Result<(), UiError>;

    /// Where the library persists window layout
    fn set_layout_path(&mut self, path: &Path);

    /// Load the toolbox fonts from a font file
    fn load_fonts(&mut self, path: &Path) -> Result<(), UiError>;

    /// Apply theme values
    fn apply_style(&mut self, style: &ThemeStyle);

    /// Begin a frame; the backend consumes input from `io` and updates its
    /// `want_*` flags
    fn new_frame(&mut self, io: &mut UiIo);

    /// Finish the frame and submit draw data to the renderer
    fn render(&mut self);

    /// Release device-dependent objects before a device reset
    fn invalidate_device_objects(&mut self);

    /// Destroy the renderer and UI context
    fn shutdown(&mut self);
}
