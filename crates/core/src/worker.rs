//! Worker thread entry
//!
//! Runs on a dedicated thread for the overlay's whole life: brings up the
//! game API, installs the render hooks, then polls until the render thread
//! reports that teardown finished. Hooks come down in reverse order.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use gwtb_host::{GameApi, Platform};
use gwtb_sdk::messages::vk;

use crate::config::ToolboxConfig;
use crate::hooks::{self, HookError, RenderCallbackKey};
use crate::modules::panic_message;
use crate::overlay::{self, Overlay};

/// Title of the error box shown when the game API cannot start
pub const ERROR_TITLE: &str = "GWToolbox++ API Error";

/// How the worker thread ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Self-destruct ran and everything was unhooked
    Completed,
    /// The game API could not find what it needs; nothing was hooked
    ApiInitFailed,
    /// The render hooks could not be installed; everything else was undone
    HookInstallFailed,
    Panicked,
}

/// Worker body
///
/// `close_log` is called once, after the last hook is gone and before the
/// game API is released.
#[tracing::instrument(skip_all)]
pub fn run(
    config: &ToolboxConfig,
    game: Arc<dyn GameApi>,
    platform: Arc<dyn Platform>,
    overlay: Arc<Overlay>,
    close_log: impl FnOnce(),
) -> WorkerExit {
    tracing::info!("Initializing API");
    if let Err(e) = game.initialize() {
        tracing::error!("{}", e);
        platform.show_error(
            ERROR_TITLE,
            "Initialize failed at finding all addresses, contact Developers about this.",
        );
        close_log();
        return WorkerExit::ApiInitFailed;
    }

    if let Err(e) = game.install_cursor_fix() {
        tracing::warn!("Cursor fix unavailable: {}", e);
    }

    if let Err(e) = overlay::install(overlay.clone()) {
        tracing::error!("{}", e);
    }
    let callbacks = register_callbacks(&overlay);

    tracing::info!("Installing render hooks");
    if let Err(e) = install_render_hooks(game.as_ref()) {
        tracing::error!("Failed to install render hooks: {}", e);
        unregister_callbacks(callbacks);
        overlay::uninstall();
        game.uninstall_cursor_fix();
        close_log();
        game.deinitialize();
        return WorkerExit::HookInstallFailed;
    }
    tracing::info!("Installed render hooks");

    while !overlay.is_destroyed() {
        if config.unload_hotkey && platform.was_key_pressed(vk::END) {
            overlay.request_self_destruct();
        }
        std::thread::sleep(config.poll_interval());
    }

    tracing::info!("Destroying API");
    tracing::debug!(
        "Render hooks ran {} frames, last frame took {}us",
        hooks::frame_count(),
        hooks::last_frame_time_ns() / 1_000
    );
    let settle = config.settle_delay();
    std::thread::sleep(settle);
    unregister_callbacks(callbacks);
    overlay::uninstall();
    game.uninstall_cursor_fix();

    std::thread::sleep(settle);
    tracing::info!("Closing log");
    close_log();

    std::thread::sleep(settle);
    game.deinitialize();
    WorkerExit::Completed
}

/// [`run`] behind a fault barrier
pub fn run_guarded(
    config: &ToolboxConfig,
    game: Arc<dyn GameApi>,
    platform: Arc<dyn Platform>,
    overlay: Arc<Overlay>,
    close_log: impl FnOnce(),
) -> WorkerExit {
    match catch_unwind(AssertUnwindSafe(|| run(config, game, platform, overlay, close_log))) {
        Ok(exit) => exit,
        Err(payload) => {
            tracing::error!("Worker thread panicked: {}", panic_message(payload.as_ref()));
            WorkerExit::Panicked
        }
    }
}

fn register_callbacks(overlay: &Arc<Overlay>) -> [RenderCallbackKey; 2] {
    let frame = overlay.clone();
    let reset = overlay.clone();
    [
        hooks::register_render_callback(move |device| frame.on_frame(device)),
        hooks::register_reset_callback(move |device| reset.on_reset(device)),
    ]
}

fn unregister_callbacks(keys: [RenderCallbackKey; 2]) {
    for key in keys {
        hooks::unregister_callback(key);
    }
}

fn install_render_hooks(game: &dyn GameApi) -> Result<(), HookError> {
    let vtable = game.device_vtable().ok_or(HookError::NotFound)?;
    // SAFETY: the game API hands out the live device's vtable
    unsafe { hooks::render::install(vtable) }
}
