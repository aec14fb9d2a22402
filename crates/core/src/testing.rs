//! Test doubles for the host collaborators

use std::collections::HashSet;
use std::path::Path;
use std::ptr::NonNull;
use std::sync::Arc;

use gwtb_host::{CameraMove, ChatHooks, GameApi, HostError, Platform};
use gwtb_sdk::{Device, Hwnd, InstanceType, WindowMessage, WndProc};
use parking_lot::Mutex;

use crate::config::{ToolboxConfig, ToolboxPaths};
use crate::modules::resources::tests::StaticFetcher;
use crate::plugins::tests::FakeSource;
use crate::toolbox::Toolbox;
use crate::ui::{ThemeStyle, UiBackend, UiError, UiIo};

pub(crate) type CallLog = Arc<Mutex<Vec<String>>>;

pub(crate) fn calls() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub(crate) fn device() -> Device {
    Device::from_raw(0x1000 as *mut std::ffi::c_void).unwrap()
}

pub(crate) struct GameState {
    pub initialize_fails: bool,
    pub window: Option<Hwnd>,
    pub viewport: (u32, u32),
    pub ui_drawn: bool,
    pub cinematic: bool,
    pub instance: InstanceType,
    pub player: Option<String>,
    pub vtable: Option<NonNull<*const ()>>,
    pub camera_moves: Vec<CameraMove>,
    pub camera_unlocked: bool,
    pub chat_commands: Vec<String>,
    pub chat_hooks: Option<ChatHooks>,
    pub chat_hooks_removed: u32,
    pub chat_log: Vec<String>,
    pub cursor_fix_installed: u32,
    pub cursor_fix_removed: u32,
    pub terminated: u32,
    pub deinitialized: u32,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            initialize_fails: false,
            window: Some(Hwnd(0x1234)),
            viewport: (1280, 720),
            ui_drawn: true,
            cinematic: false,
            instance: InstanceType::Outpost,
            player: Some("Test Character".to_string()),
            vtable: None,
            camera_moves: Vec::new(),
            camera_unlocked: false,
            chat_commands: Vec::new(),
            chat_hooks: None,
            chat_hooks_removed: 0,
            chat_log: Vec::new(),
            cursor_fix_installed: 0,
            cursor_fix_removed: 0,
            terminated: 0,
            deinitialized: 0,
        }
    }
}

// SAFETY: the vtable pointer is only handed back to the caller, never read here
unsafe impl Send for GameState {}

#[derive(Default)]
pub(crate) struct MockGame {
    pub state: Mutex<GameState>,
}

impl MockGame {
    /// Type a chat line the way the game's command hook would report it.
    /// Returns false when the command is not claimed.
    pub fn type_command(&self, line: &str) -> bool {
        let name = line.trim_start_matches('/').split_whitespace().next().unwrap_or("");
        let hooks = {
            let state = self.state.lock();
            if !state.chat_commands.iter().any(|c| c == name) {
                return false;
            }
            state.chat_hooks
        };
        match hooks {
            Some(hooks) => {
                (hooks.on_command)(line);
                true
            }
            None => false,
        }
    }

    /// Deliver an incoming chat line. Returns true when it was hidden.
    pub fn receive_chat(&self, text: &str) -> bool {
        let hooks = self.state.lock().chat_hooks;
        hooks.is_some_and(|hooks| (hooks.on_message)(text))
    }
}

impl GameApi for MockGame {
    fn initialize(&self) -> Result<(), HostError> {
        if self.state.lock().initialize_fails {
            return Err(HostError::InitializeFailed("pattern scan failed".into()));
        }
        Ok(())
    }

    fn install_cursor_fix(&self) -> Result<(), HostError> {
        self.state.lock().cursor_fix_installed += 1;
        Ok(())
    }

    fn uninstall_cursor_fix(&self) {
        self.state.lock().cursor_fix_removed += 1;
    }

    fn device_vtable(&self) -> Option<NonNull<*const ()>> {
        self.state.lock().vtable
    }

    fn window_handle(&self) -> Option<Hwnd> {
        self.state.lock().window
    }

    fn viewport_size(&self) -> (u32, u32) {
        self.state.lock().viewport
    }

    fn is_ui_drawn(&self) -> bool {
        self.state.lock().ui_drawn
    }

    fn is_in_cinematic(&self) -> bool {
        self.state.lock().cinematic
    }

    fn instance_type(&self) -> InstanceType {
        self.state.lock().instance
    }

    fn player_name(&self) -> Option<String> {
        self.state.lock().player.clone()
    }

    fn unlock_camera(&self, unlocked: bool) {
        self.state.lock().camera_unlocked = unlocked;
    }

    fn move_camera(&self, movement: CameraMove) {
        self.state.lock().camera_moves.push(movement);
    }

    fn install_chat_hooks(&self, commands: &[&str], hooks: ChatHooks) -> Result<(), HostError> {
        let mut state = self.state.lock();
        state.chat_commands = commands.iter().map(|c| c.to_string()).collect();
        state.chat_hooks = Some(hooks);
        Ok(())
    }

    fn remove_chat_hooks(&self) {
        let mut state = self.state.lock();
        state.chat_commands.clear();
        state.chat_hooks = None;
        state.chat_hooks_removed += 1;
    }

    fn write_chat(&self, text: &str) {
        self.state.lock().chat_log.push(text.to_string());
    }

    fn terminate(&self) {
        self.state.lock().terminated += 1;
    }

    fn deinitialize(&self) {
        self.state.lock().deinitialized += 1;
    }
}

#[derive(Default)]
pub(crate) struct PlatformState {
    pub tick: u32,
    pub keys_down: HashSet<u16>,
    pub async_down: HashSet<u16>,
    pub pressed: HashSet<u16>,
    pub minimized: bool,
    pub replaced: u32,
    pub restored: u32,
    pub forwarded: Vec<WindowMessage>,
    pub errors: Vec<(String, String)>,
}

#[derive(Default)]
pub(crate) struct MockPlatform {
    pub state: Mutex<PlatformState>,
}

impl MockPlatform {
    pub fn hold_async(&self, keys: &[u16]) {
        self.state.lock().async_down.extend(keys.iter().copied());
    }

    pub fn press(&self, vk: u16) {
        self.state.lock().pressed.insert(vk);
    }

    pub fn advance(&self, ms: u32) {
        let mut state = self.state.lock();
        state.tick = state.tick.wrapping_add(ms);
    }
}

unsafe extern "system" fn host_wnd_proc(_: Hwnd, _: u32, _: usize, _: isize) -> isize {
    0
}

impl Platform for MockPlatform {
    fn tick_count(&self) -> u32 {
        self.state.lock().tick
    }

    fn is_key_down(&self, vk: u16) -> bool {
        self.state.lock().keys_down.contains(&vk)
    }

    fn is_async_key_down(&self, vk: u16) -> bool {
        self.state.lock().async_down.contains(&vk)
    }

    fn was_key_pressed(&self, vk: u16) -> bool {
        self.state.lock().pressed.remove(&vk)
    }

    fn is_minimized(&self, _hwnd: Hwnd) -> bool {
        self.state.lock().minimized
    }

    unsafe fn replace_window_proc(
        &self,
        _hwnd: Hwnd,
        _detour: WndProc,
    ) -> Result<Option<WndProc>, HostError> {
        self.state.lock().replaced += 1;
        Ok(Some(host_wnd_proc))
    }

    unsafe fn restore_window_proc(
        &self,
        _hwnd: Hwnd,
        _previous: Option<WndProc>,
    ) -> Result<(), HostError> {
        self.state.lock().restored += 1;
        Ok(())
    }

    fn call_window_proc(&self, _previous: Option<WndProc>, _hwnd: Hwnd, msg: WindowMessage) -> isize {
        self.state.lock().forwarded.push(msg);
        0
    }

    fn show_error(&self, title: &str, text: &str) {
        self.state
            .lock()
            .errors
            .push((title.to_string(), text.to_string()));
    }
}

/// What the UI backend was asked to do
#[derive(Default)]
pub(crate) struct UiState {
    pub calls: Vec<String>,
    pub fail_init: bool,
    pub want_capture_mouse: bool,
    pub want_text_input: bool,
    pub styles: Vec<ThemeStyle>,
}

pub(crate) struct MockUi(pub Arc<Mutex<UiState>>);

impl UiBackend for MockUi {
    fn init(&mut self, _hwnd: Hwnd, _device: Device) -> Result<(), UiError> {
        let mut state = self.0.lock();
        state.calls.push("init".into());
        if state.fail_init {
            return Err(UiError::ContextCreation("no device".into()));
        }
        Ok(())
    }

    fn set_layout_path(&mut self, _path: &Path) {
        self.0.lock().calls.push("layout".into());
    }

    fn load_fonts(&mut self, _path: &Path) -> Result<(), UiError> {
        self.0.lock().calls.push("fonts".into());
        Ok(())
    }

    fn apply_style(&mut self, style: &ThemeStyle) {
        self.0.lock().styles.push(*style);
    }

    fn new_frame(&mut self, io: &mut UiIo) {
        let mut state = self.0.lock();
        state.calls.push("new_frame".into());
        io.take_frame_input();
        io.want_capture_mouse = state.want_capture_mouse;
        io.want_text_input = state.want_text_input;
    }

    fn render(&mut self) {
        self.0.lock().calls.push("render".into());
    }

    fn invalidate_device_objects(&mut self) {
        self.0.lock().calls.push("invalidate".into());
    }

    fn shutdown(&mut self) {
        self.0.lock().calls.push("shutdown".into());
    }
}

pub(crate) struct TestFixture {
    pub toolbox: Toolbox,
    pub game: Arc<MockGame>,
    pub platform: Arc<MockPlatform>,
    pub ui: Arc<Mutex<UiState>>,
    pub dir: tempfile::TempDir,
}

/// A toolbox over mocks and a fresh data directory
pub(crate) fn fixture() -> TestFixture {
    let dir = tempfile::tempdir().unwrap();
    let config = ToolboxConfig {
        update_url: String::new(),
        ..Default::default()
    };
    let paths = ToolboxPaths::new(dir.path(), &config);
    let game = Arc::new(MockGame::default());
    let platform = Arc::new(MockPlatform::default());
    let ui = Arc::new(Mutex::new(UiState::default()));

    let toolbox = Toolbox::builder(
        config,
        paths,
        game.clone(),
        platform.clone(),
        Box::new(MockUi(ui.clone())),
    )
    .fetcher(Arc::new(StaticFetcher::default()))
    .plugin_source(FakeSource)
    .build()
    .unwrap();

    TestFixture {
        toolbox,
        game,
        platform,
        ui,
        dir,
    }
}
