//! Game-memory API contract
//!
//! Implemented by the injected DLL on top of the reverse-engineered game
//! API. Only the handful of primitives the orchestration core needs are
//! exposed; feature modules talk to the game through their own channels.

use std::ptr::NonNull;

use gwtb_sdk::{Hwnd, InstanceType};

use crate::error::HostError;

/// Camera displacement for one frame, in game units
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraMove {
    pub forward: f32,
    pub side: f32,
    pub vertical: f32,
}

impl CameraMove {
    pub fn is_zero(&self) -> bool {
        self.forward == 0.0 && self.side == 0.0 && self.vertical == 0.0
    }
}

/// Entry points the game layer calls from its chat hooks
///
/// Both may run on whatever thread the game processes chat on.
#[derive(Debug, Clone, Copy)]
pub struct ChatHooks {
    /// A registered command was typed. Receives the whole line, slash
    /// included, e.g. `/cam speed 2`.
    pub on_command: fn(&str),
    /// A chat line is about to be printed. Returning `true` hides it.
    pub on_message: fn(&str) -> bool,
}

/// Game-memory layer used by the toolbox
pub trait GameApi: Send + Sync {
    /// Locate every game address the layer needs
    ///
    /// Called once from the worker thread before any hook is installed.
    fn initialize(&self) -> Result<(), HostError>;

    /// Install the cursor clipping workaround
    fn install_cursor_fix(&self) -> Result<(), HostError>;

    /// Remove the cursor clipping workaround
    fn uninstall_cursor_fix(&self);

    /// Vtable of the game's render device, once the device exists
    fn device_vtable(&self) -> Option<NonNull<*const ()>>;

    /// Handle of the game window (may be None before the window exists)
    fn window_handle(&self) -> Option<Hwnd>;

    /// Current viewport size in pixels
    fn viewport_size(&self) -> (u32, u32);

    /// Whether the game is currently drawing its own UI
    fn is_ui_drawn(&self) -> bool;

    /// Whether a cinematic is playing
    fn is_in_cinematic(&self) -> bool;

    /// Kind of map instance currently loaded
    fn instance_type(&self) -> InstanceType;

    /// Name of the controlled character, if a live session with a valid
    /// player exists
    fn player_name(&self) -> Option<String>;

    /// Detach or reattach the camera from the player
    fn unlock_camera(&self, unlocked: bool);

    /// Move a detached camera
    fn move_camera(&self, movement: CameraMove);

    /// Claim `commands` (names without the slash) and start passing chat
    /// traffic to `hooks`
    fn install_chat_hooks(&self, commands: &[&str], hooks: ChatHooks) -> Result<(), HostError>;

    /// Release every command and callback taken by [`GameApi::install_chat_hooks`]
    fn remove_chat_hooks(&self);

    /// Print a line to the player's chat log
    fn write_chat(&self, text: &str);

    /// Tear down game API state. Called once from the render thread at the
    /// end of self-destruct.
    fn terminate(&self);

    /// Release hook memory. Called once from the worker thread after every
    /// hook has been removed.
    fn deinitialize(&self);
}
