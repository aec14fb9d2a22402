//! Rust side of the C++ bridge
//!
//! [`GwBridge`] implements [`GameApi`] over GWCA and [`ImGuiBackend`]
//! implements [`UiBackend`] over Dear ImGui. Both call the shims in
//! `cpp/bridge.cpp`. When the build script cannot find the SDKs the shims
//! are replaced by stubs that report failure, so the rest of the library
//! still builds and tests on any platform.

use std::ffi::{c_char, c_void};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::ptr::NonNull;

use gwtb_core::ui::KEY_COUNT;
use gwtb_core::{Modifiers, ThemeStyle, UiBackend, UiError, UiIo};
use gwtb_host::{CameraMove, ChatHooks, GameApi, HostError};
use gwtb_sdk::{Device, Hwnd, InstanceType};
use parking_lot::RwLock;

/// Chat command callback. Matches `GwtbChatCommandFn`.
pub type ChatCommandFn = extern "C" fn(text: *const u16, len: usize);

/// Chat line callback. Matches `GwtbChatMessageFn`.
pub type ChatMessageFn = extern "C" fn(text: *const u16, len: usize) -> bool;

/// Per-frame input handed to ImGui. Layout matches `GwtbFrameIo`.
#[repr(C)]
#[derive(Debug)]
pub struct FrameIo {
    pub mouse_x: f32,
    pub mouse_y: f32,
    pub mouse_down: [bool; 5],
    pub mouse_wheel: f32,
    pub keys_down: *const bool,
    pub keys_len: usize,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub chars: *const u16,
    pub chars_len: usize,
}

/// What ImGui wants after starting a frame. Layout matches `GwtbFrameWants`.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameWants {
    pub want_capture_mouse: bool,
    pub want_text_input: bool,
}

#[cfg(gwtb_bridge)]
mod sys {
    use super::{ChatCommandFn, ChatMessageFn, FrameIo, FrameWants};
    use std::ffi::{c_char, c_void};

    pub const BRIDGE_AVAILABLE: bool = true;

    extern "C" {
        pub fn gwtb_gw_initialize() -> bool;
        pub fn gwtb_gw_install_cursor_fix() -> bool;
        pub fn gwtb_gw_uninstall_cursor_fix();
        pub fn gwtb_gw_device_vtable() -> *mut *mut c_void;
        pub fn gwtb_gw_window_handle() -> *mut c_void;
        pub fn gwtb_gw_viewport(width: *mut u32, height: *mut u32);
        pub fn gwtb_gw_is_ui_drawn() -> bool;
        pub fn gwtb_gw_is_in_cinematic() -> bool;
        pub fn gwtb_gw_instance_type() -> i32;
        pub fn gwtb_gw_player_name(buffer: *mut u16, len: usize) -> usize;
        pub fn gwtb_gw_unlock_camera(unlocked: bool);
        pub fn gwtb_gw_move_camera(forward: f32, side: f32, vertical: f32);
        pub fn gwtb_gw_register_chat_command(
            name: *const u16,
            len: usize,
            callback: ChatCommandFn,
        ) -> bool;
        pub fn gwtb_gw_register_chat_filter(callback: ChatMessageFn) -> bool;
        pub fn gwtb_gw_remove_chat_hooks();
        pub fn gwtb_gw_write_chat(text: *const u16, len: usize);
        pub fn gwtb_gw_terminate();
        pub fn gwtb_gw_deinitialize();

        pub fn gwtb_imgui_init(hwnd: *mut c_void, device: *mut c_void) -> bool;
        pub fn gwtb_imgui_set_ini_path(path: *const c_char, len: usize);
        pub fn gwtb_imgui_load_fonts(path: *const c_char, len: usize) -> bool;
        pub fn gwtb_imgui_apply_style(window_rounding: f32, alpha: f32, font_scale: f32);
        pub fn gwtb_imgui_new_frame(frame: *const FrameIo, wants: *mut FrameWants);
        pub fn gwtb_imgui_render();
        pub fn gwtb_imgui_invalidate();
        pub fn gwtb_imgui_shutdown();
    }
}

/// Stand-ins used when the SDKs were not available at build time
#[cfg(not(gwtb_bridge))]
#[allow(clippy::missing_safety_doc)]
mod sys {
    use super::{ChatCommandFn, ChatMessageFn, FrameIo, FrameWants};
    use std::ffi::{c_char, c_void};

    pub const BRIDGE_AVAILABLE: bool = false;

    pub unsafe fn gwtb_gw_initialize() -> bool {
        false
    }
    pub unsafe fn gwtb_gw_install_cursor_fix() -> bool {
        false
    }
    pub unsafe fn gwtb_gw_uninstall_cursor_fix() {}
    pub unsafe fn gwtb_gw_device_vtable() -> *mut *mut c_void {
        std::ptr::null_mut()
    }
    pub unsafe fn gwtb_gw_window_handle() -> *mut c_void {
        std::ptr::null_mut()
    }
    pub unsafe fn gwtb_gw_viewport(width: *mut u32, height: *mut u32) {
        *width = 0;
        *height = 0;
    }
    pub unsafe fn gwtb_gw_is_ui_drawn() -> bool {
        false
    }
    pub unsafe fn gwtb_gw_is_in_cinematic() -> bool {
        false
    }
    pub unsafe fn gwtb_gw_instance_type() -> i32 {
        2
    }
    pub unsafe fn gwtb_gw_player_name(_buffer: *mut u16, _len: usize) -> usize {
        0
    }
    pub unsafe fn gwtb_gw_unlock_camera(_unlocked: bool) {}
    pub unsafe fn gwtb_gw_move_camera(_forward: f32, _side: f32, _vertical: f32) {}
    pub unsafe fn gwtb_gw_register_chat_command(
        _name: *const u16,
        _len: usize,
        _callback: ChatCommandFn,
    ) -> bool {
        false
    }
    pub unsafe fn gwtb_gw_register_chat_filter(_callback: ChatMessageFn) -> bool {
        false
    }
    pub unsafe fn gwtb_gw_remove_chat_hooks() {}
    pub unsafe fn gwtb_gw_write_chat(_text: *const u16, _len: usize) {}
    pub unsafe fn gwtb_gw_terminate() {}
    pub unsafe fn gwtb_gw_deinitialize() {}

    pub unsafe fn gwtb_imgui_init(_hwnd: *mut c_void, _device: *mut c_void) -> bool {
        false
    }
    pub unsafe fn gwtb_imgui_set_ini_path(_path: *const c_char, _len: usize) {}
    pub unsafe fn gwtb_imgui_load_fonts(_path: *const c_char, _len: usize) -> bool {
        false
    }
    pub unsafe fn gwtb_imgui_apply_style(_window_rounding: f32, _alpha: f32, _font_scale: f32) {}
    pub unsafe fn gwtb_imgui_new_frame(_frame: *const FrameIo, _wants: *mut FrameWants) {}
    pub unsafe fn gwtb_imgui_render() {}
    pub unsafe fn gwtb_imgui_invalidate() {}
    pub unsafe fn gwtb_imgui_shutdown() {}
}

/// Whether this build links the real game and UI libraries
pub const fn is_available() -> bool {
    sys::BRIDGE_AVAILABLE
}

/// Longest character name the game allows, plus slack
const PLAYER_NAME_CAPACITY: usize = 64;

/// Chat hooks handed over by the toolbox, read by the trampolines
static CHAT_HOOKS: RwLock<Option<ChatHooks>> = parking_lot::const_rwlock(None);

/// Copy a UTF-16 buffer owned by the caller
///
/// # Safety
/// `text` must be valid for `len` units, or null
unsafe fn utf16_string(text: *const u16, len: usize) -> String {
    if text.is_null() || len == 0 {
        return String::new();
    }
    String::from_utf16_lossy(std::slice::from_raw_parts(text, len))
}

extern "C" fn chat_command_trampoline(text: *const u16, len: usize) {
    let Some(hooks) = *CHAT_HOOKS.read() else {
        return;
    };
    // SAFETY: the shim passes a live buffer of `len` units
    let line = unsafe { utf16_string(text, len) };
    if catch_unwind(AssertUnwindSafe(|| (hooks.on_command)(&line))).is_err() {
        tracing::error!("Panic in chat command callback");
    }
}

extern "C" fn chat_message_trampoline(text: *const u16, len: usize) -> bool {
    let Some(hooks) = *CHAT_HOOKS.read() else {
        return false;
    };
    // SAFETY: the shim passes a live buffer of `len` units
    let line = unsafe { utf16_string(text, len) };
    catch_unwind(AssertUnwindSafe(|| (hooks.on_message)(&line))).unwrap_or(false)
}

/// [`GameApi`] over GWCA
#[derive(Debug, Default)]
pub struct GwBridge;

impl GameApi for GwBridge {
    fn initialize(&self) -> Result<(), HostError> {
        if !is_available() {
            return Err(HostError::InitializeFailed(
                "built without the game bridge".to_string(),
            ));
        }
        // SAFETY: called once from the worker thread before anything else
        if unsafe { sys::gwtb_gw_initialize() } {
            Ok(())
        } else {
            Err(HostError::InitializeFailed("pattern scan failed".to_string()))
        }
    }

    fn install_cursor_fix(&self) -> Result<(), HostError> {
        // SAFETY: hook base was initialized by `initialize`
        if unsafe { sys::gwtb_gw_install_cursor_fix() } {
            Ok(())
        } else {
            Err(HostError::Unavailable("cursor fix"))
        }
    }

    fn uninstall_cursor_fix(&self) {
        // SAFETY: no-op when the fix was never installed
        unsafe { sys::gwtb_gw_uninstall_cursor_fix() }
    }

    fn device_vtable(&self) -> Option<NonNull<*const ()>> {
        // SAFETY: returns a static table or null
        let table = unsafe { sys::gwtb_gw_device_vtable() };
        NonNull::new(table as *mut *const ())
    }

    fn window_handle(&self) -> Option<Hwnd> {
        // SAFETY: plain read of game memory
        let raw = unsafe { sys::gwtb_gw_window_handle() };
        let hwnd = Hwnd(raw as isize);
        (!hwnd.is_null()).then_some(hwnd)
    }

    fn viewport_size(&self) -> (u32, u32) {
        let (mut width, mut height) = (0, 0);
        // SAFETY: both pointers are valid for the duration of the call
        unsafe { sys::gwtb_gw_viewport(&mut width, &mut height) };
        (width, height)
    }

    fn is_ui_drawn(&self) -> bool {
        // SAFETY: plain read of game memory
        unsafe { sys::gwtb_gw_is_ui_drawn() }
    }

    fn is_in_cinematic(&self) -> bool {
        // SAFETY: plain read of game memory
        unsafe { sys::gwtb_gw_is_in_cinematic() }
    }

    fn instance_type(&self) -> InstanceType {
        // SAFETY: plain read of game memory
        match unsafe { sys::gwtb_gw_instance_type() } {
            0 => InstanceType::Outpost,
            1 => InstanceType::Explorable,
            _ => InstanceType::Loading,
        }
    }

    fn player_name(&self) -> Option<String> {
        let mut buffer = [0u16; PLAYER_NAME_CAPACITY];
        // SAFETY: the shim writes at most `buffer.len()` units
        let len = unsafe { sys::gwtb_gw_player_name(buffer.as_mut_ptr(), buffer.len()) };
        let name = &buffer[..len.min(buffer.len())];
        (!name.is_empty()).then(|| String::from_utf16_lossy(name))
    }

    fn unlock_camera(&self, unlocked: bool) {
        // SAFETY: render thread only; GWCA writes camera state in place
        unsafe { sys::gwtb_gw_unlock_camera(unlocked) }
    }

    fn move_camera(&self, movement: CameraMove) {
        if movement.is_zero() {
            return;
        }
        // SAFETY: render thread only
        unsafe { sys::gwtb_gw_move_camera(movement.forward, movement.side, movement.vertical) }
    }

    fn install_chat_hooks(&self, commands: &[&str], hooks: ChatHooks) -> Result<(), HostError> {
        *CHAT_HOOKS.write() = Some(hooks);
        for command in commands {
            let name: Vec<u16> = command.encode_utf16().collect();
            // SAFETY: the shim copies the name; the trampoline is a static function
            let registered = unsafe {
                sys::gwtb_gw_register_chat_command(
                    name.as_ptr(),
                    name.len(),
                    chat_command_trampoline,
                )
            };
            if !registered {
                self.remove_chat_hooks();
                return Err(HostError::Unavailable("chat commands"));
            }
        }
        // SAFETY: the trampoline is a static function
        if !unsafe { sys::gwtb_gw_register_chat_filter(chat_message_trampoline) } {
            self.remove_chat_hooks();
            return Err(HostError::Unavailable("chat messages"));
        }
        Ok(())
    }

    fn remove_chat_hooks(&self) {
        // SAFETY: removing hooks that were never registered is a no-op
        unsafe { sys::gwtb_gw_remove_chat_hooks() }
        *CHAT_HOOKS.write() = None;
    }

    fn write_chat(&self, text: &str) {
        let wide: Vec<u16> = text.encode_utf16().collect();
        // SAFETY: the shim copies the text
        unsafe { sys::gwtb_gw_write_chat(wide.as_ptr(), wide.len()) }
    }

    fn terminate(&self) {
        // SAFETY: last call on the render thread during self-destruct
        unsafe { sys::gwtb_gw_terminate() }
    }

    fn deinitialize(&self) {
        // SAFETY: every hook has been removed by now
        unsafe { sys::gwtb_gw_deinitialize() }
    }
}

/// [`UiBackend`] over Dear ImGui with the DX9 renderer
#[derive(Debug, Default)]
pub struct ImGuiBackend {
    ready: bool,
}

impl ImGuiBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl UiBackend for ImGuiBackend {
    fn init(&mut self, hwnd: Hwnd, device: Device) -> Result<(), UiError> {
        if !is_available() {
            return Err(UiError::ContextCreation(
                "built without the UI bridge".to_string(),
            ));
        }
        // SAFETY: device is the live render device of the current frame
        let ok = unsafe {
            sys::gwtb_imgui_init(hwnd.0 as *mut c_void, device.as_ptr() as *mut c_void)
        };
        if !ok {
            return Err(UiError::Renderer("ImGui_ImplDX9_Init failed".to_string()));
        }
        self.ready = true;
        Ok(())
    }

    fn set_layout_path(&mut self, path: &Path) {
        let path = path_string(path);
        // SAFETY: the shim copies the bytes
        unsafe { sys::gwtb_imgui_set_ini_path(path.as_ptr() as *const c_char, path.len()) }
    }

    fn load_fonts(&mut self, path: &Path) -> Result<(), UiError> {
        let file = path_string(path);
        // SAFETY: the shim copies the bytes
        let ok = unsafe { sys::gwtb_imgui_load_fonts(file.as_ptr() as *const c_char, file.len()) };
        if ok {
            Ok(())
        } else {
            Err(UiError::Font {
                path: file,
                reason: "not a usable TrueType file".to_string(),
            })
        }
    }

    fn apply_style(&mut self, style: &ThemeStyle) {
        // SAFETY: context exists once `init` succeeded
        unsafe { sys::gwtb_imgui_apply_style(style.window_rounding, style.alpha, style.font_scale) }
    }

    fn new_frame(&mut self, io: &mut UiIo) {
        let (wheel, chars) = io.take_frame_input();
        let keys = io.keys_down();
        let frame = FrameIo {
            mouse_x: io.mouse_pos.0,
            mouse_y: io.mouse_pos.1,
            mouse_down: io.mouse_down,
            mouse_wheel: wheel,
            keys_down: keys.as_ptr(),
            keys_len: keys.len().min(KEY_COUNT),
            ctrl: io.modifiers.contains(Modifiers::CTRL),
            shift: io.modifiers.contains(Modifiers::SHIFT),
            alt: io.modifiers.contains(Modifiers::ALT),
            chars: chars.as_ptr(),
            chars_len: chars.len(),
        };
        let mut wants = FrameWants::default();
        // SAFETY: `frame` borrows `io` and `chars`, both alive for the call
        unsafe { sys::gwtb_imgui_new_frame(&frame, &mut wants) };
        io.want_capture_mouse = wants.want_capture_mouse;
        io.want_text_input = wants.want_text_input;
    }

    fn render(&mut self) {
        // SAFETY: paired with the `new_frame` of this frame
        unsafe { sys::gwtb_imgui_render() }
    }

    fn invalidate_device_objects(&mut self) {
        if self.ready {
            // SAFETY: renderer is bound
            unsafe { sys::gwtb_imgui_invalidate() }
        }
    }

    fn shutdown(&mut self) {
        if std::mem::take(&mut self.ready) {
            // SAFETY: renderer is bound and is released exactly once
            unsafe { sys::gwtb_imgui_shutdown() }
        }
    }
}

#[cfg(all(test, not(gwtb_bridge)))]
mod tests {
    use super::*;

    #[test]
    fn test_missing_bridge_fails_initialize() {
        assert!(!is_available());
        let err = GwBridge.initialize().unwrap_err();
        assert!(matches!(err, HostError::InitializeFailed(_)));
        assert!(GwBridge.device_vtable().is_none());
        assert!(GwBridge.window_handle().is_none());
        assert!(GwBridge.player_name().is_none());
        assert_eq!(GwBridge.instance_type(), InstanceType::Loading);
    }

    #[test]
    fn test_missing_bridge_fails_ui_init() {
        let mut ui = ImGuiBackend::new();
        let device = Device::from_raw(0x1000 as *mut c_void).unwrap();
        let err = ui.init(Hwnd(1), device).unwrap_err();
        assert!(matches!(err, UiError::ContextCreation(_)));

        // Never initialized, so shutdown does nothing
        ui.shutdown();
        assert!(!ui.ready);
    }

    #[test]
    fn test_new_frame_drains_queued_input() {
        let mut ui = ImGuiBackend::new();
        let mut io = UiIo::default();
        io.add_mouse_wheel(1.0);
        io.add_input_character(b'x' as u16);

        ui.new_frame(&mut io);

        assert_eq!(io.mouse_wheel(), 0.0);
        assert!(io.input_characters().is_empty());
        assert!(!io.want_capture_mouse);
    }

    static COMMANDS_SEEN: parking_lot::Mutex<Vec<String>> = parking_lot::const_mutex(Vec::new());

    fn record_command(line: &str) {
        COMMANDS_SEEN.lock().push(line.to_string());
    }

    fn hide_spam(text: &str) -> bool {
        text.contains("spam")
    }

    #[test]
    fn test_chat_trampolines() {
        let hooks = ChatHooks {
            on_command: record_command,
            on_message: hide_spam,
        };
        // Stub shims refuse the registration and nothing stays installed
        let err = GwBridge.install_chat_hooks(&["cam"], hooks).unwrap_err();
        assert!(matches!(err, HostError::Unavailable("chat commands")));
        assert!(CHAT_HOOKS.read().is_none());
        let spam: Vec<u16> = "spam".encode_utf16().collect();
        assert!(!chat_message_trampoline(spam.as_ptr(), spam.len()));

        *CHAT_HOOKS.write() = Some(hooks);
        let line: Vec<u16> = "/cam unlock".encode_utf16().collect();
        chat_command_trampoline(line.as_ptr(), line.len());
        assert!(chat_message_trampoline(spam.as_ptr(), spam.len()));
        assert!(!chat_message_trampoline(std::ptr::null(), 0));
        GwBridge.remove_chat_hooks();

        assert_eq!(*COMMANDS_SEEN.lock(), vec!["/cam unlock".to_string()]);
        assert!(CHAT_HOOKS.read().is_none());
    }

    #[test]
    fn test_frame_layouts_are_c_compatible() {
        assert_eq!(std::mem::size_of::<FrameWants>(), 2);
        assert_eq!(std::mem::align_of::<FrameIo>(), std::mem::align_of::<usize>());
    }
}
