//! Hook system
//!
//! Three kinds of hooks attach the toolbox to the host:
//! - VTable hooks on the render device (EndScene / Reset)
//! - A replaced window procedure on the game window
//! - Chat command and message callbacks registered with the game layer
//!
//! Installation and removal each happen at most once per lifetime.

pub mod chat;
pub mod guard;
pub mod render;
pub mod vtable;
pub mod wndproc;

use gwtb_host::HostError;

pub use chat::chat_hooks;
pub use guard::{ReentrancyGuard, ThreadAffinity};
pub use render::{
    frame_count, last_frame_time_ns, register_render_callback, register_reset_callback,
    unregister_callback, RenderCallbackKey,
};
pub use vtable::VTableHookKey;
pub use wndproc::{safe_wnd_proc, OriginalWndProc, WndProcHook};

/// Hook errors
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("Hook not found")]
    NotFound,

    #[error("Memory protection failed: {0}")]
    MemoryProtection(String),

    #[error("Invalid address: {0:x}")]
    InvalidAddress(usize),

    #[error("{0} hook already installed")]
    AlreadyInstalled(&'static str),

    #[error("Window procedure: {0}")]
    WindowProc(#[from] HostError),
}
