//! GWToolbox Core - Overlay Orchestration
//!
//! This crate contains everything the injected toolbox does between the
//! host's render/message callbacks and the feature modules:
//!
//! - [`frame`] - per-frame lifecycle state machine
//! - [`input`] - window message arbitration between UI, modules and game
//! - [`toolbox`] - lifecycle controller owning modules and settings
//! - [`plugins`] - dynamic plugin discovery and loading
//! - [`worker`] - the worker thread that installs and removes hooks
//! - [`overlay`] - process-wide slot host callbacks reach the toolbox through
//!
//! # Re-exports
//!
//! - [`sdk`] - host type definitions shared with plugins

// Allow the crate to refer to itself as `gwtb_core` for proc macro compatibility
extern crate self as gwtb_core;

pub use gwtb_sdk as sdk;

pub use gwtb_macros::toolbox_plugin;

pub mod config;
pub mod frame;
pub mod hooks;
pub mod input;
pub mod modules;
pub mod overlay;
pub mod plugins;
pub mod settings;
pub mod tasks;
pub mod toolbox;
pub mod ui;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ConfigError, ConfigResult, ToolboxConfig, ToolboxPaths};
pub use frame::{FramePhase, LifecycleFlags};
pub use hooks::HookError;
pub use input::InputOutcome;
pub use modules::{ModuleContext, ModuleError, ModuleOrigin, ModuleState, ToolboxModule};
pub use overlay::Overlay;
pub use plugins::PluginError;
pub use settings::{SettingsError, SettingsStore};
pub use tasks::TaskSender;
pub use toolbox::{Toolbox, ToolboxBuilder};
pub use ui::{Modifiers, ThemeStyle, UiBackend, UiError, UiIo};
pub use worker::WorkerExit;
