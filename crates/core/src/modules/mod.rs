//! Feature modules and the module registry
//!
//! Every feature unit - built-in or loaded from a plugin library - implements
//! [`ToolboxModule`]. The [`ModuleRegistry`] keeps them in insertion order,
//! which is also the order every lifecycle call, input message and draw call
//! is dispatched in.
//!
//! Modules are independent: a module that fails or panics during any call is
//! logged, marked [`ModuleState::Failed`], and skipped from then on. The rest
//! of the sequence continues.
//!
//! # Example
//!
//! ```ignore
//! use gwtb_core::modules::{ModuleContext, ModuleError, ToolboxModule};
//!
//! #[derive(Default)]
//! struct Clock {
//!     elapsed: f32,
//! }
//!
//! impl ToolboxModule for Clock {
//!     fn name(&self) -> &str {
//!         "Clock"
//!     }
//!
//!     fn update(&mut self, dt: f32) {
//!         self.elapsed += dt;
//!     }
//! }
//! ```

pub mod chat_commands;
pub mod chat_filter;
pub mod game_settings;
pub mod resources;
pub mod theme;
pub mod toolbox_settings;
pub mod updater;

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use gwtb_host::GameApi;
use gwtb_sdk::{Device, WindowMessage};
use slotmap::{new_key_type, SlotMap};

use crate::config::{ToolboxConfig, ToolboxPaths};
use crate::settings::{SettingsError, SettingsStore};
use crate::tasks::TaskSender;
use crate::ui::UiBackend;

pub use chat_commands::{ChatCommands, CommandOutcome};
pub use chat_filter::ChatFilter;
pub use game_settings::GameSettings;
pub use resources::{FileStatus, Resources};
pub use theme::Theme;
pub use toolbox_settings::{OptionalModule, ToolboxSettings};
pub use updater::Updater;

new_key_type! {
    /// Handle for a registered module
    pub struct ModuleKey;
}

/// Error type for module lifecycle calls
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error("{0}")]
    Failed(String),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Resource error: {0}")]
    Resource(#[from] resources::ResourceError),

    #[error("Panicked during {operation}: {message}")]
    Panicked {
        operation: &'static str,
        message: String,
    },
}

/// Downcasting support for registered modules
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// What a module gets to see while initializing
pub struct ModuleContext<'a> {
    pub config: &'a ToolboxConfig,
    pub paths: &'a ToolboxPaths,
    pub tasks: &'a TaskSender,
    pub game: &'a Arc<dyn GameApi>,
}

/// Lifecycle contract for a feature unit
///
/// All methods run on the host's render thread (input on its UI thread,
/// which is the same thread for this host). Every method has a no-op
/// default so modules only implement what they use.
pub trait ToolboxModule: AsAny + Send {
    /// Display name, also used in logs
    fn name(&self) -> &str;

    fn initialize(&mut self, _ctx: &mut ModuleContext<'_>) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Advance state by `dt` seconds. Runs every frame, even when nothing is
    /// drawn.
    fn update(&mut self, _dt: f32) {}

    fn load_settings(&mut self, _settings: &SettingsStore) -> Result<(), ModuleError> {
        Ok(())
    }

    fn save_settings(&mut self, _settings: &mut SettingsStore) -> Result<(), ModuleError> {
        Ok(())
    }

    fn terminate(&mut self) {}

    /// Offer a window message. Return `true` to capture it.
    fn wnd_proc(&mut self, _msg: &WindowMessage) -> bool {
        false
    }

    /// UI elements are drawn once per drawn frame, in registry order
    fn is_ui_element(&self) -> bool {
        false
    }

    fn draw(&mut self, _ui: &mut dyn UiBackend, _device: Device) {}
}

/// Where a module came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleOrigin {
    /// Built into the toolbox, always present
    Core,
    /// Loaded from a plugin library
    Plugin,
    /// Built in, enabled by the user through toolbox settings
    Optional,
}

/// Lifecycle state of a registered module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    Registered,
    Active,
    /// A lifecycle call failed; the module is skipped from now on
    Failed,
    Terminated,
}

/// Registered module information
struct ModuleEntry {
    module: Box<dyn ToolboxModule>,
    origin: ModuleOrigin,
    state: ModuleState,
}

impl ModuleEntry {
    fn is_live(&self) -> bool {
        matches!(self.state, ModuleState::Registered | ModuleState::Active)
    }
}

/// Run a module call inside a panic barrier
fn guarded<R>(
    operation: &'static str,
    f: impl FnOnce() -> Result<R, ModuleError>,
) -> Result<R, ModuleError> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(ModuleError::Panicked {
            operation,
            message: panic_message(payload.as_ref()),
        }),
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Ordered collection of modules
#[derive(Default)]
pub struct ModuleRegistry {
    modules: SlotMap<ModuleKey, ModuleEntry>,
    order: Vec<ModuleKey>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a module; it is dispatched after every module already present
    pub fn register(&mut self, module: Box<dyn ToolboxModule>, origin: ModuleOrigin) -> ModuleKey {
        tracing::debug!("Registered {:?} module: {}", origin, module.name());
        let key = self.modules.insert(ModuleEntry {
            module,
            origin,
            state: ModuleState::Registered,
        });
        self.order.push(key);
        key
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Keys in dispatch order
    pub fn keys(&self) -> &[ModuleKey] {
        &self.order
    }

    pub fn origin(&self, key: ModuleKey) -> Option<ModuleOrigin> {
        self.modules.get(key).map(|e| e.origin)
    }

    pub fn state(&self, key: ModuleKey) -> Option<ModuleState> {
        self.modules.get(key).map(|e| e.state)
    }

    pub fn name(&self, key: ModuleKey) -> Option<&str> {
        self.modules.get(key).map(|e| e.module.name())
    }

    /// Module names in dispatch order
    pub fn names(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter_map(|key| self.name(*key))
            .collect()
    }

    /// Find the first live module of a concrete type
    pub fn get<T: ToolboxModule>(&self) -> Option<&T> {
        self.order.iter().find_map(|key| {
            let entry = self.modules.get(*key).filter(|e| e.is_live())?;
            AsAny::as_any(entry.module.as_ref()).downcast_ref::<T>()
        })
    }

    /// Find the first live module of a concrete type, mutably
    pub fn get_mut<T: ToolboxModule>(&mut self) -> Option<&mut T> {
        let key = self.order.iter().copied().find(|key| {
            self.modules
                .get(*key)
                .filter(|e| e.is_live())
                .map(|e| AsAny::as_any(e.module.as_ref()).is::<T>())
                .unwrap_or(false)
        })?;
        let entry = self.modules.get_mut(key)?;
        AsAny::as_any_mut(entry.module.as_mut()).downcast_mut::<T>()
    }

    fn fail(entry: &mut ModuleEntry, operation: &str, error: &ModuleError) {
        tracing::error!(
            "Module '{}' failed during {}: {}",
            entry.module.name(),
            operation,
            error
        );
        entry.state = ModuleState::Failed;
    }

    /// Initialize one module. A failure leaves it inert.
    pub fn initialize(&mut self, key: ModuleKey, ctx: &mut ModuleContext<'_>) -> bool {
        let Some(entry) = self.modules.get_mut(key) else {
            return false;
        };
        if entry.state != ModuleState::Registered {
            return false;
        }

        let module = &mut entry.module;
        match guarded("initialize", || module.initialize(ctx)) {
            Ok(()) => {
                entry.state = ModuleState::Active;
                tracing::debug!("Initialized module: {}", entry.module.name());
                true
            }
            Err(e) => {
                Self::fail(entry, "initialize", &e);
                false
            }
        }
    }

    /// Load settings for every live module accepted by `filter`
    pub fn load_settings(&mut self, settings: &SettingsStore, filter: impl Fn(ModuleOrigin) -> bool) {
        for key in &self.order {
            let Some(entry) = self.modules.get_mut(*key) else {
                continue;
            };
            if !entry.is_live() || !filter(entry.origin) {
                continue;
            }
            let module = &mut entry.module;
            if let Err(e) = guarded("load_settings", || module.load_settings(settings)) {
                Self::fail(entry, "load_settings", &e);
            }
        }
    }

    /// Let every live module write its settings
    pub fn save_settings(&mut self, settings: &mut SettingsStore) {
        for key in &self.order {
            let Some(entry) = self.modules.get_mut(*key) else {
                continue;
            };
            if !entry.is_live() {
                continue;
            }
            let module = &mut entry.module;
            if let Err(e) = guarded("save_settings", || module.save_settings(settings)) {
                // Keep the module running; only its settings are lost
                tracing::error!("Module '{}' failed to save settings: {}", module.name(), e);
            }
        }
    }

    pub fn update(&mut self, dt: f32) {
        for key in &self.order {
            let Some(entry) = self.modules.get_mut(*key) else {
                continue;
            };
            if !entry.is_live() {
                continue;
            }
            let module = &mut entry.module;
            if let Err(e) = guarded("update", || {
                module.update(dt);
                Ok(())
            }) {
                Self::fail(entry, "update", &e);
            }
        }
    }

    /// Offer a message to modules in order.
    ///
    /// With `first_capture_wins`, dispatch stops at the first module that
    /// captures; otherwise every module sees the message. Returns whether any
    /// module captured it.
    pub fn dispatch_message(&mut self, msg: &WindowMessage, first_capture_wins: bool) -> bool {
        let mut captured = false;
        for key in &self.order {
            let Some(entry) = self.modules.get_mut(*key) else {
                continue;
            };
            if !entry.is_live() {
                continue;
            }
            let module = &mut entry.module;
            match guarded("wnd_proc", || Ok(module.wnd_proc(msg))) {
                Ok(true) => {
                    captured = true;
                    if first_capture_wins {
                        break;
                    }
                }
                Ok(false) => {}
                Err(e) => Self::fail(entry, "wnd_proc", &e),
            }
        }
        captured
    }

    /// Draw every live UI element in registry order
    pub fn draw(&mut self, ui: &mut dyn UiBackend, device: Device) {
        for key in &self.order {
            let Some(entry) = self.modules.get_mut(*key) else {
                continue;
            };
            if !entry.is_live() || !entry.module.is_ui_element() {
                continue;
            }
            let module = &mut entry.module;
            if let Err(e) = guarded("draw", || {
                module.draw(&mut *ui, device);
                Ok(())
            }) {
                Self::fail(entry, "draw", &e);
            }
        }
    }

    /// Terminate every live module in registry order
    pub fn terminate(&mut self) {
        for key in &self.order {
            let Some(entry) = self.modules.get_mut(*key) else {
                continue;
            };
            if !entry.is_live() {
                continue;
            }
            let module = &mut entry.module;
            if let Err(e) = guarded("terminate", || {
                module.terminate();
                Ok(())
            }) {
                tracing::error!("Module '{}' failed to terminate: {}", module.name(), e);
            }
            entry.state = ModuleState::Terminated;
        }
    }
}
