//! Overlay runtime
//!
//! The [`Overlay`] is the single owner of the [`Toolbox`]. Host callbacks
//! (render, reset, window messages, chat) reach it through [`current`] and
//! take the toolbox lock without blocking: a callback that finds the lock
//! taken, or that re-enters from inside another callback, passes through
//! untouched.
//!
//! Every entry point is a fault barrier. A panic inside the toolbox is logged
//! and the host sees a pass-through.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use gwtb_host::Platform;
use gwtb_sdk::{Device, Hwnd, WindowMessage};
use parking_lot::{Mutex, RwLock};

use crate::frame::{self, LifecycleFlags};
use crate::hooks::{HookError, OriginalWndProc, ReentrancyGuard, ThreadAffinity};
use crate::input::{self, InputOutcome};
use crate::modules::panic_message;
use crate::tasks::TaskSender;
use crate::toolbox::Toolbox;

/// Process-wide overlay slot
static CURRENT: RwLock<Option<Arc<Overlay>>> = parking_lot::const_rwlock(None);

/// Make `overlay` reachable from host callbacks
pub fn install(overlay: Arc<Overlay>) -> Result<(), HookError> {
    let mut current = CURRENT.write();
    if current.is_some() {
        return Err(HookError::AlreadyInstalled("overlay"));
    }
    *current = Some(overlay);
    Ok(())
}

/// The installed overlay, if any
pub fn current() -> Option<Arc<Overlay>> {
    CURRENT.read().clone()
}

/// Remove the installed overlay, returning it
pub fn uninstall() -> Option<Arc<Overlay>> {
    CURRENT.write().take()
}

/// The toolbox behind its lock, plus what callbacks need without the lock
pub struct Overlay {
    toolbox: Mutex<Toolbox>,
    flags: Arc<LifecycleFlags>,
    original: OriginalWndProc,
    platform: Arc<dyn Platform>,
    tasks: TaskSender,
    render_thread: ThreadAffinity,
}

impl Overlay {
    pub fn new(toolbox: Toolbox) -> Self {
        Self {
            flags: toolbox.flags().clone(),
            original: toolbox.wndproc.original().clone(),
            platform: toolbox.platform().clone(),
            tasks: toolbox.tasks().sender(),
            toolbox: Mutex::new(toolbox),
            render_thread: ThreadAffinity::new(),
        }
    }

    pub fn flags(&self) -> &Arc<LifecycleFlags> {
        &self.flags
    }

    pub fn request_self_destruct(&self) {
        tracing::info!("Self-destruct requested");
        self.flags.request_self_destruct();
    }

    pub fn is_destroyed(&self) -> bool {
        self.flags.is_destroyed()
    }

    /// Run `f` with the toolbox locked. Blocks while a callback holds it.
    #[cfg(test)]
    pub(crate) fn with_toolbox<R>(&self, f: impl FnOnce(&mut Toolbox) -> R) -> R {
        f(&mut self.toolbox.lock())
    }

    /// Render callback
    pub fn on_frame(&self, device: Device) {
        if !self.render_thread.check("on_frame") {
            return;
        }
        self.enter("frame", |toolbox| frame::on_frame(toolbox, device));
    }

    /// Device reset callback
    pub fn on_reset(&self, device: Device) {
        if !self.render_thread.check("on_reset") {
            return;
        }
        self.enter("reset", |toolbox| frame::on_reset(toolbox, device));
    }

    /// Route one window message and return the value the host expects.
    ///
    /// The toolbox lock is released before forwarding, so the original
    /// procedure may send nested messages back through us.
    pub fn handle_message(&self, hwnd: Hwnd, msg: WindowMessage) -> isize {
        if !self.flags.is_initialized() || self.flags.is_destroyed() {
            return self.forward(hwnd, msg);
        }

        let outcome = self
            .enter("window message", |toolbox| input::route_message(toolbox, msg))
            .unwrap_or(InputOutcome::Forward);

        match outcome {
            InputOutcome::Consumed(result) => result,
            InputOutcome::Forward => self.forward(hwnd, msg),
        }
    }

    /// Chat command callback. The command runs on the next frame.
    pub fn on_chat_command(&self, line: &str) {
        if self.flags.is_destroyed() {
            return;
        }
        let line = line.to_string();
        let _ = self.tasks.post(move |toolbox| {
            toolbox.execute_chat_command(&line);
        });
    }

    /// Chat message callback. `true` hides the line.
    pub fn on_chat_message(&self, text: &str) -> bool {
        if !self.flags.is_initialized() || self.flags.is_destroyed() {
            return false;
        }
        self.enter("chat message", |toolbox| toolbox.should_filter_chat(text))
            .unwrap_or(false)
    }

    fn forward(&self, hwnd: Hwnd, msg: WindowMessage) -> isize {
        self.platform.call_window_proc(self.original.get(), hwnd, msg)
    }

    /// Guarded, non-blocking, panic-safe access to the toolbox.
    ///
    /// `None` when the call re-entered, the lock was busy or `f` panicked.
    fn enter<R>(&self, what: &str, f: impl FnOnce(&mut Toolbox) -> R) -> Option<R> {
        let Some(_guard) = ReentrancyGuard::enter() else {
            tracing::trace!("Reentrant {} passed through", what);
            return None;
        };
        let Some(mut toolbox) = self.toolbox.try_lock() else {
            tracing::trace!("Toolbox busy, {} passed through", what);
            return None;
        };

        match catch_unwind(AssertUnwindSafe(|| f(&mut toolbox))) {
            Ok(result) => Some(result),
            Err(payload) => {
                tracing::error!("Panic during {}: {}", what, panic_message(payload.as_ref()));
                None
            }
        }
    }
}
