//! Chat commands and the free camera
//!
//! `/cam unlock` detaches the camera from the player. While unlocked, the
//! movement keys drive the camera instead of the character; the input router
//! asks [`ChatCommands::handle_camera_input`] before anything else sees a
//! keyboard message.

use std::sync::Arc;

use gwtb_host::{CameraMove, GameApi};
use gwtb_sdk::messages::*;
use serde::{Deserialize, Serialize};

use super::{ModuleContext, ModuleError, ToolboxModule};
use crate::settings::SettingsStore;

const SECTION: &str = "Chat Commands";

/// Units per second at speed 1.0
const CAMERA_BASE_SPEED: f32 = 500.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct Stored {
    cam_speed: f32,
}

impl Default for Stored {
    fn default() -> Self {
        Self { cam_speed: 1.0 }
    }
}

/// Result of a chat command
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// Not a command this module knows
    Unknown,
    Handled,
    /// Known command with bad arguments
    Usage(&'static str),
}

#[derive(Debug, Default, Clone, Copy)]
struct HeldKeys {
    forward: bool,
    back: bool,
    left: bool,
    right: bool,
    up: bool,
    down: bool,
}

impl HeldKeys {
    fn axis(positive: bool, negative: bool) -> f32 {
        match (positive, negative) {
            (true, false) => 1.0,
            (false, true) => -1.0,
            _ => 0.0,
        }
    }

    fn direction(&self) -> CameraMove {
        CameraMove {
            forward: Self::axis(self.forward, self.back),
            side: Self::axis(self.right, self.left),
            vertical: Self::axis(self.up, self.down),
        }
    }

    fn slot(&mut self, vk: u16) -> Option<&mut bool> {
        match vk {
            0x57 => Some(&mut self.forward), // W
            0x53 => Some(&mut self.back),    // S
            0x41 => Some(&mut self.left),    // A
            0x44 => Some(&mut self.right),   // D
            0x5A => Some(&mut self.up),      // Z
            0x58 => Some(&mut self.down),    // X
            _ => None,
        }
    }
}

fn is_movement_char(c: usize) -> bool {
    u8::try_from(c)
        .map(|c| matches!(c.to_ascii_uppercase(), b'W' | b'S' | b'A' | b'D' | b'Z' | b'X'))
        .unwrap_or(false)
}

#[derive(Default)]
pub struct ChatCommands {
    game: Option<Arc<dyn GameApi>>,
    camera_unlocked: bool,
    camera_speed: f32,
    held: HeldKeys,
}

impl ChatCommands {
    /// Commands claimed from the game, without the slash
    pub const COMMANDS: &'static [&'static str] = &["cam", "camera"];

    pub fn is_camera_unlocked(&self) -> bool {
        self.camera_unlocked
    }

    pub fn camera_speed(&self) -> f32 {
        self.camera_speed
    }

    fn set_camera_unlocked(&mut self, unlocked: bool) {
        if self.camera_unlocked == unlocked {
            return;
        }
        self.camera_unlocked = unlocked;
        self.held = HeldKeys::default();
        if let Some(game) = &self.game {
            game.unlock_camera(unlocked);
        }
        tracing::info!("Camera {}", if unlocked { "unlocked" } else { "locked" });
    }

    /// Run a chat command such as `/cam unlock`
    pub fn execute(&mut self, line: &str) -> CommandOutcome {
        let mut args = line.split_whitespace();
        match args.next() {
            Some("/cam") | Some("/camera") => {}
            _ => return CommandOutcome::Unknown,
        }

        const USAGE: &str = "/cam [unlock|lock|speed <value>]";
        match (args.next(), args.next()) {
            (Some("unlock"), None) => self.set_camera_unlocked(true),
            (Some("lock"), None) => self.set_camera_unlocked(false),
            (None, None) => self.set_camera_unlocked(!self.camera_unlocked),
            (Some("speed"), Some(value)) => match value.parse::<f32>() {
                Ok(speed) if speed > 0.0 && speed.is_finite() => self.camera_speed = speed,
                _ => return CommandOutcome::Usage(USAGE),
            },
            _ => return CommandOutcome::Usage(USAGE),
        }
        CommandOutcome::Handled
    }

    /// Consume movement input while the camera is unlocked.
    ///
    /// Returns `true` when the message drove the camera and must not reach
    /// the game.
    pub fn handle_camera_input(&mut self, msg: &WindowMessage) -> bool {
        if !self.camera_unlocked {
            return false;
        }
        match msg.msg {
            WM_KEYDOWN | WM_KEYUP => {
                let down = msg.msg == WM_KEYDOWN;
                match u16::try_from(msg.wparam).ok().and_then(|vk| self.held.slot(vk)) {
                    Some(slot) => {
                        *slot = down;
                        true
                    }
                    None => false,
                }
            }
            // Characters generated by the swallowed key presses
            WM_CHAR => is_movement_char(msg.wparam),
            _ => false,
        }
    }
}

impl ToolboxModule for ChatCommands {
    fn name(&self) -> &str {
        "Chat Commands"
    }

    fn initialize(&mut self, ctx: &mut ModuleContext<'_>) -> Result<(), ModuleError> {
        self.game = Some(ctx.game.clone());
        if self.camera_speed <= 0.0 {
            self.camera_speed = Stored::default().cam_speed;
        }
        Ok(())
    }

    fn load_settings(&mut self, settings: &SettingsStore) -> Result<(), ModuleError> {
        let stored: Stored = settings.section(SECTION)?;
        self.camera_speed = if stored.cam_speed > 0.0 {
            stored.cam_speed
        } else {
            Stored::default().cam_speed
        };
        Ok(())
    }

    fn save_settings(&mut self, settings: &mut SettingsStore) -> Result<(), ModuleError> {
        settings.set_section(
            SECTION,
            &Stored {
                cam_speed: self.camera_speed,
            },
        )?;
        Ok(())
    }

    fn update(&mut self, dt: f32) {
        if !self.camera_unlocked {
            return;
        }
        let direction = self.held.direction();
        if direction.is_zero() {
            return;
        }
        let scale = CAMERA_BASE_SPEED * self.camera_speed * dt;
        if let Some(game) = &self.game {
            game.move_camera(CameraMove {
                forward: direction.forward * scale,
                side: direction.side * scale,
                vertical: direction.vertical * scale,
            });
        }
    }

    fn terminate(&mut self) {
        self.set_camera_unlocked(false);
    }
}
