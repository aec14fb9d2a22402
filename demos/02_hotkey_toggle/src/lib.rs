//! # Hotkey Toggle Example
//!
//! Watches window messages for a configurable key and flips a flag each time
//! it goes down. Shows how a module reads input without stealing it from the
//! game, and why key releases matter.
//!
//! ## Features Demonstrated
//! - `wnd_proc` - every module sees keyboard messages in registry order
//! - Edge detection on key-down with auto-repeat filtered out
//! - Plain typed settings accessors
//!
//! ## Settings
//!
//! ```toml
//! ["Hotkey Toggle"]
//! key = 120  # F9
//! active = false
//! ```

use gwtb_core::sdk::messages::{WM_KEYDOWN, WM_KEYUP, WM_SYSKEYDOWN, WM_SYSKEYUP};
use gwtb_core::sdk::WindowMessage;
use gwtb_core::settings::SettingsStore;
use gwtb_core::{toolbox_plugin, ModuleError, ToolboxModule};

const NAME: &str = "Hotkey Toggle";

/// VK_F9
const DEFAULT_KEY: i64 = 0x78;

pub struct HotkeyToggle {
    key: usize,
    held: bool,
    active: bool,
}

impl Default for HotkeyToggle {
    fn default() -> Self {
        Self {
            key: DEFAULT_KEY as usize,
            held: false,
            active: false,
        }
    }
}

impl HotkeyToggle {
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl ToolboxModule for HotkeyToggle {
    fn name(&self) -> &str {
        NAME
    }

    fn wnd_proc(&mut self, msg: &WindowMessage) -> bool {
        if msg.wparam != self.key {
            return false;
        }
        match msg.msg {
            WM_KEYDOWN | WM_SYSKEYDOWN if !self.held => {
                self.held = true;
                self.active = !self.active;
                tracing::info!("{} {}", NAME, if self.active { "on" } else { "off" });
            }
            WM_KEYUP | WM_SYSKEYUP => self.held = false,
            _ => {}
        }
        // Never capture; the game keeps its own binding for the key
        false
    }

    fn load_settings(&mut self, settings: &SettingsStore) -> Result<(), ModuleError> {
        let key = settings.get_int(NAME, "key", DEFAULT_KEY);
        self.key = usize::try_from(key)
            .map_err(|_| ModuleError::Failed(format!("invalid key code {}", key)))?;
        self.active = settings.get_bool(NAME, "active", false);
        Ok(())
    }

    fn save_settings(&mut self, settings: &mut SettingsStore) -> Result<(), ModuleError> {
        settings.set_int(NAME, "key", self.key as i64);
        settings.set_bool(NAME, "active", self.active);
        Ok(())
    }
}

#[toolbox_plugin]
fn create() -> HotkeyToggle {
    HotkeyToggle::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(msg: u32, vk: usize) -> WindowMessage {
        WindowMessage::new(msg, vk, 0)
    }

    #[test]
    fn test_auto_repeat_toggles_once() {
        let mut toggle = HotkeyToggle::default();
        let vk = DEFAULT_KEY as usize;

        toggle.wnd_proc(&key(WM_KEYDOWN, vk));
        toggle.wnd_proc(&key(WM_KEYDOWN, vk));
        toggle.wnd_proc(&key(WM_KEYDOWN, vk));
        assert!(toggle.is_active());

        toggle.wnd_proc(&key(WM_KEYUP, vk));
        toggle.wnd_proc(&key(WM_KEYDOWN, vk));
        assert!(!toggle.is_active());
    }

    #[test]
    fn test_other_keys_are_ignored() {
        let mut toggle = HotkeyToggle::default();
        assert!(!toggle.wnd_proc(&key(WM_KEYDOWN, 0x41)));
        assert!(!toggle.is_active());
    }

    #[test]
    fn test_negative_key_code_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SettingsStore::open(dir.path().join("GWToolbox.toml")).unwrap();
        store.set_int(NAME, "key", -1);

        let mut toggle = HotkeyToggle::default();
        assert!(matches!(
            toggle.load_settings(&store),
            Err(ModuleError::Failed(_))
        ));
    }
}
