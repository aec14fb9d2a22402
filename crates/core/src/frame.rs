//! Frame driver
//!
//! [`on_frame`] is called by the render hook once per frame. It owns a
//! forward-only state machine:
//!
//! ```text
//! Uninitialized -> Initializing -> Running -> SelfDestructing -> Destroyed
//!       |                                                           ^
//!       +------------------ self-destruct before init --------------+
//! ```
//!
//! Initialization is retried every frame until the game window exists.
//! Teardown always completes within the frame that observes the request.

use std::sync::atomic::{AtomicBool, Ordering};

use gwtb_host::HostError;
use gwtb_sdk::messages::vk;
use gwtb_sdk::{Device, Hwnd};

use crate::hooks::{self, HookError};
use crate::modules::{FileStatus, Resources};
use crate::tasks::process_queued_tasks;
use crate::toolbox::Toolbox;
use crate::ui::{Modifiers, UiError};

/// Font file fetched into the data directory on first initialization
pub const FONT_FILE: &str = "Font.ttf";

/// Flags shared between the render thread and the worker thread
#[derive(Debug, Default)]
pub struct LifecycleFlags {
    initialized: AtomicBool,
    destroyed: AtomicBool,
    self_destruct: AtomicBool,
}

impl LifecycleFlags {
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    pub fn is_self_destruct_requested(&self) -> bool {
        self.self_destruct.load(Ordering::Acquire)
    }

    /// Ask the render thread to tear everything down on its next frame
    pub fn request_self_destruct(&self) {
        self.self_destruct.store(true, Ordering::Release);
    }

    pub(crate) fn set_initialized(&self) {
        self.initialized.store(true, Ordering::Release);
    }

    pub(crate) fn set_destroyed(&self) {
        self.destroyed.store(true, Ordering::Release);
    }
}

/// Where the frame driver is in the overlay's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum FramePhase {
    #[default]
    Uninitialized,
    Initializing,
    Running,
    SelfDestructing,
    Destroyed,
}

/// Frame driver errors. All of them are retried on the next frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("Host: {0}")]
    Host(#[from] HostError),

    #[error("Hook: {0}")]
    Hook(#[from] HookError),

    #[error("UI: {0}")]
    Ui(#[from] UiError),
}

/// Per-frame state owned by the toolbox
#[derive(Debug, Default)]
pub struct FrameState {
    phase: FramePhase,
    last_tick: u32,
    hwnd: Option<Hwnd>,
    ui_ready: bool,
}

impl FrameState {
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    pub fn hwnd(&self) -> Option<Hwnd> {
        self.hwnd
    }

    fn enter(&mut self, phase: FramePhase) {
        debug_assert!(phase > self.phase, "{:?} -> {:?}", self.phase, phase);
        tracing::debug!("Frame phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }
}

/// Run one rendered frame
pub fn on_frame(toolbox: &mut Toolbox, device: Device) {
    match toolbox.frame.phase {
        FramePhase::Destroyed | FramePhase::SelfDestructing => return,
        FramePhase::Uninitialized => {
            if toolbox.flags.is_self_destruct_requested() {
                tracing::info!("Self-destruct requested before initialization");
                toolbox.frame.enter(FramePhase::Destroyed);
                toolbox.flags.set_destroyed();
                return;
            }
            toolbox.frame.enter(FramePhase::Initializing);
        }
        FramePhase::Initializing | FramePhase::Running => {}
    }

    if toolbox.flags.is_self_destruct_requested() {
        self_destruct(toolbox);
        return;
    }

    if toolbox.frame.phase == FramePhase::Initializing {
        match begin(toolbox, device) {
            Ok(()) => toolbox.frame.enter(FramePhase::Running),
            Err(FrameError::Host(HostError::Unavailable(what))) => {
                tracing::trace!("Waiting for {}", what);
                return;
            }
            Err(e) => {
                tracing::error!("Toolbox initialization failed, retrying: {}", e);
                return;
            }
        }
    }

    run(toolbox, device);
}

/// Release device objects before the host resets the device
pub fn on_reset(toolbox: &mut Toolbox, _device: Device) {
    if toolbox.frame.phase == FramePhase::Running && toolbox.frame.ui_ready {
        toolbox.ui.invalidate_device_objects();
    }
}

/// One-time setup. Every step is skipped when an earlier attempt got past it.
#[tracing::instrument(skip_all)]
fn begin(toolbox: &mut Toolbox, device: Device) -> Result<(), FrameError> {
    let hwnd = toolbox
        .game
        .window_handle()
        .filter(|hwnd| !hwnd.is_null())
        .ok_or(HostError::Unavailable("game window"))?;
    toolbox.frame.hwnd = Some(hwnd);

    if !toolbox.wndproc.is_installed() {
        // SAFETY: safe_wnd_proc is a static function and outlives the hook
        unsafe {
            toolbox
                .wndproc
                .install(toolbox.platform.as_ref(), hwnd, hooks::safe_wnd_proc)?
        };
    }

    if !toolbox.frame.ui_ready {
        toolbox.ui.init(hwnd, device)?;
        toolbox.frame.ui_ready = true;
        let layout = toolbox.paths.layout_file();
        toolbox.ui.set_layout_path(&layout);
    }

    toolbox.initialize();
    request_fonts(toolbox);

    toolbox.frame.last_tick = toolbox.platform.tick_count();
    toolbox.flags.set_initialized();
    tracing::info!("Toolbox running");
    Ok(())
}

fn request_fonts(toolbox: &mut Toolbox) {
    let url = toolbox.config.resource_url(FONT_FILE);
    let Some(resources) = toolbox.modules.get_mut::<Resources>() else {
        tracing::error!("Resources unavailable, cannot load font!");
        return;
    };

    let requested = resources.ensure_file_exists(FONT_FILE, &url, |toolbox, success| {
        if success {
            load_fonts(toolbox);
        } else {
            tracing::error!("Cannot load font!");
        }
    });
    match requested {
        Ok(FileStatus::Present) => load_fonts(toolbox),
        Ok(FileStatus::Fetching) => {}
        Err(e) => tracing::error!("Cannot load font! {}", e),
    }
}

fn load_fonts(toolbox: &mut Toolbox) {
    let path = toolbox.paths.path(FONT_FILE);
    if let Err(e) = toolbox.ui.load_fonts(&path) {
        tracing::error!("{}", e);
    }
}

/// Steady-state frame: tasks, module updates, then drawing
fn run(toolbox: &mut Toolbox, device: Device) {
    let (width, height) = toolbox.game.viewport_size();
    if width == 0 || height == 0 {
        return;
    }

    let now = toolbox.platform.tick_count();
    let dt = now.wrapping_sub(toolbox.frame.last_tick) as f32 / 1000.0;
    toolbox.frame.last_tick = now;

    process_queued_tasks(toolbox);
    toolbox.modules.update(dt);

    if !toolbox.game.is_ui_drawn() || toolbox.game.is_in_cinematic() {
        return;
    }
    if let Some(hwnd) = toolbox.frame.hwnd {
        if toolbox.platform.is_minimized(hwnd) {
            return;
        }
    }

    toolbox.ui.new_frame(&mut toolbox.io);
    reconcile_modifiers(toolbox);

    if let Some(resources) = toolbox.modules.get_mut::<Resources>() {
        resources.dx_update(device);
    }
    toolbox.modules.draw(toolbox.ui.as_mut(), device);
    toolbox.ui.render();
}

/// Key-up is not delivered while the window is unfocused, so modifiers are
/// read from the OS every frame
fn reconcile_modifiers(toolbox: &mut Toolbox) {
    let mut modifiers = Modifiers::empty();
    for (key, flag) in [
        (vk::CONTROL, Modifiers::CTRL),
        (vk::SHIFT, Modifiers::SHIFT),
        (vk::MENU, Modifiers::ALT),
    ] {
        let down = toolbox.platform.is_key_down(key);
        toolbox.io.set_key_down(key as usize, down);
        modifiers.set(flag, down);
    }
    toolbox.io.modifiers = modifiers;
}

/// Tear everything down. Runs to completion in one call.
#[tracing::instrument(skip_all)]
fn self_destruct(toolbox: &mut Toolbox) {
    toolbox.frame.enter(FramePhase::SelfDestructing);
    tracing::info!("Destroying Toolbox");

    if toolbox.is_initialized() {
        toolbox.terminate();
    }

    if toolbox.frame.ui_ready {
        toolbox.ui.shutdown();
        toolbox.frame.ui_ready = false;
    }

    if let Err(e) = toolbox.wndproc.restore(toolbox.platform.as_ref()) {
        tracing::error!("Failed to restore window procedure: {}", e);
    }

    if !hooks::render::restore() {
        tracing::debug!("Render hooks were not installed");
    }

    toolbox.game.terminate();

    toolbox.frame.enter(FramePhase::Destroyed);
    toolbox.flags.set_destroyed();
    tracing::info!("Toolbox destroyed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::render::tests::SERIAL;
    use crate::modules::tests::Recorder;
    use crate::modules::ModuleOrigin;
    use crate::testing::{calls, device, fixture, TestFixture};

    #[test]
    fn test_first_frame_initializes_and_runs() {
        let TestFixture { mut toolbox, ui, dir: _dir, .. } = fixture();

        on_frame(&mut toolbox, device());

        assert_eq!(toolbox.frame.phase(), FramePhase::Running);
        assert!(toolbox.flags().is_initialized());
        assert!(toolbox.is_initialized());
        let ui_calls = ui.lock().calls.clone();
        assert_eq!(&ui_calls[..2], ["init", "layout"]);
        assert!(ui_calls.contains(&"render".to_string()));
    }

    #[test]
    fn test_waits_for_window() {
        let TestFixture { mut toolbox, game, dir: _dir, .. } = fixture();
        game.state.lock().window = None;

        on_frame(&mut toolbox, device());
        on_frame(&mut toolbox, device());
        assert_eq!(toolbox.frame.phase(), FramePhase::Initializing);
        assert!(!toolbox.is_initialized());

        game.state.lock().window = Some(Hwnd(0x99));
        on_frame(&mut toolbox, device());
        assert_eq!(toolbox.frame.phase(), FramePhase::Running);
        assert_eq!(toolbox.frame.hwnd(), Some(Hwnd(0x99)));
    }

    #[test]
    fn test_ui_failure_does_not_reinstall_wndproc() {
        let TestFixture {
            mut toolbox,
            platform,
            ui,
            dir: _dir,
            ..
        } = fixture();
        ui.lock().fail_init = true;

        on_frame(&mut toolbox, device());
        on_frame(&mut toolbox, device());
        assert_eq!(toolbox.frame.phase(), FramePhase::Initializing);

        ui.lock().fail_init = false;
        on_frame(&mut toolbox, device());
        assert_eq!(toolbox.frame.phase(), FramePhase::Running);
        assert_eq!(platform.state.lock().replaced, 1);
    }

    #[test]
    fn test_reset_after_init_keeps_single_wndproc() {
        let TestFixture {
            mut toolbox,
            platform,
            ui,
            dir: _dir,
            ..
        } = fixture();

        on_frame(&mut toolbox, device());
        on_reset(&mut toolbox, device());
        on_frame(&mut toolbox, device());
        on_reset(&mut toolbox, device());
        on_frame(&mut toolbox, device());

        assert_eq!(platform.state.lock().replaced, 1);
        let invalidated = ui.lock().calls.iter().filter(|c| *c == "invalidate").count();
        assert_eq!(invalidated, 2);
    }

    #[test]
    fn test_reset_before_init_is_ignored() {
        let TestFixture { mut toolbox, ui, dir: _dir, .. } = fixture();
        on_reset(&mut toolbox, device());
        assert!(ui.lock().calls.is_empty());
    }

    #[test]
    fn test_modules_update_with_elapsed_time() {
        let log = calls();
        let TestFixture {
            mut toolbox,
            platform,
            dir: _dir,
            ..
        } = fixture();
        on_frame(&mut toolbox, device());
        let recorder = Recorder {
            ui: true,
            ..Recorder::new("recorder", &log)
        };
        toolbox
            .modules_mut()
            .register(Box::new(recorder), ModuleOrigin::Optional);

        platform.advance(250);
        on_frame(&mut toolbox, device());

        assert_eq!(toolbox.modules().get::<Recorder>().map(|p| p.last_dt), Some(0.25));
        let log = log.lock().clone();
        assert!(log.contains(&"recorder:update".to_string()));
        assert!(log.contains(&"recorder:draw".to_string()));
    }

    #[test]
    fn test_hidden_ui_still_updates() {
        let log = calls();
        let TestFixture {
            mut toolbox,
            game,
            platform,
            ui,
            dir: _dir,
            ..
        } = fixture();
        on_frame(&mut toolbox, device());
        let recorder = Recorder {
            ui: true,
            ..Recorder::new("recorder", &log)
        };
        toolbox
            .modules_mut()
            .register(Box::new(recorder), ModuleOrigin::Optional);
        ui.lock().calls.clear();

        game.state.lock().cinematic = true;
        on_frame(&mut toolbox, device());
        game.state.lock().cinematic = false;
        platform.state.lock().minimized = true;
        on_frame(&mut toolbox, device());

        let log = log.lock().clone();
        assert_eq!(log.iter().filter(|c| c.starts_with("recorder:update")).count(), 2);
        assert!(!log.contains(&"recorder:draw".to_string()));
        assert!(ui.lock().calls.is_empty());
    }

    #[test]
    fn test_modifiers_follow_os_state() {
        let TestFixture {
            mut toolbox,
            platform,
            dir: _dir,
            ..
        } = fixture();
        toolbox.io.modifiers = Modifiers::ALT;
        platform.state.lock().keys_down.insert(vk::SHIFT);

        on_frame(&mut toolbox, device());

        assert_eq!(toolbox.io.modifiers, Modifiers::SHIFT);
        assert!(toolbox.io.is_key_down(vk::SHIFT as usize));
        assert!(!toolbox.io.is_key_down(vk::MENU as usize));
    }

    #[test]
    fn test_present_font_loads_immediately() {
        let TestFixture {
            mut toolbox,
            dir,
            ui,
            ..
        } = fixture();
        std::fs::write(dir.path().join(FONT_FILE), b"font").unwrap();

        on_frame(&mut toolbox, device());

        assert!(ui.lock().calls.contains(&"fonts".to_string()));
    }

    #[test]
    fn test_self_destruct_tears_down_once() {
        let _serial = SERIAL.lock();
        let log = calls();
        let TestFixture {
            mut toolbox,
            game,
            platform,
            ui,
            dir: _dir,
            ..
        } = fixture();
        on_frame(&mut toolbox, device());
        toolbox
            .modules_mut()
            .register(Box::new(Recorder::new("recorder", &log)), ModuleOrigin::Optional);
        log.lock().clear();

        toolbox.flags().request_self_destruct();
        on_frame(&mut toolbox, device());
        on_frame(&mut toolbox, device());

        assert_eq!(toolbox.frame.phase(), FramePhase::Destroyed);
        assert!(toolbox.flags().is_destroyed());
        assert_eq!(*log.lock(), vec!["recorder:save", "recorder:terminate"]);
        assert_eq!(ui.lock().calls.last().map(String::as_str), Some("shutdown"));
        assert_eq!(platform.state.lock().restored, 1);
        assert_eq!(game.state.lock().terminated, 1);
    }

    #[test]
    fn test_self_destruct_before_first_frame() {
        let TestFixture {
            mut toolbox,
            game,
            platform,
            ui,
            dir: _dir,
            ..
        } = fixture();
        toolbox.flags().request_self_destruct();

        on_frame(&mut toolbox, device());

        assert_eq!(toolbox.frame.phase(), FramePhase::Destroyed);
        assert!(toolbox.flags().is_destroyed());
        assert!(!toolbox.is_initialized());
        assert!(ui.lock().calls.is_empty());
        assert_eq!(platform.state.lock().replaced, 0);
        assert_eq!(game.state.lock().terminated, 0);
    }

    #[test]
    fn test_self_destruct_while_waiting_for_window() {
        let _serial = SERIAL.lock();
        let TestFixture { mut toolbox, game, dir: _dir, .. } = fixture();
        game.state.lock().window = None;
        on_frame(&mut toolbox, device());

        toolbox.flags().request_self_destruct();
        on_frame(&mut toolbox, device());

        assert_eq!(toolbox.frame.phase(), FramePhase::Destroyed);
        assert!(!toolbox.is_initialized());
        assert_eq!(game.state.lock().terminated, 1);
    }
}
