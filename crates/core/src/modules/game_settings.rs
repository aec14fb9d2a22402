//! Game-side tweaks

use serde::{Deserialize, Serialize};

use super::{ModuleError, ToolboxModule};
use crate::settings::SettingsStore;

const SECTION: &str = "Game Settings";

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
struct Stored {
    borderless_window: bool,
}

/// Window and game behavior settings
#[derive(Debug, Default)]
pub struct GameSettings {
    /// The game runs in a borderless window; Alt+Enter must not reach it
    pub borderless_window: bool,
}

impl ToolboxModule for GameSettings {
    fn name(&self) -> &str {
        "Game Settings"
    }

    fn load_settings(&mut self, settings: &SettingsStore) -> Result<(), ModuleError> {
        let stored: Stored = settings.section(SECTION)?;
        self.borderless_window = stored.borderless_window;
        Ok(())
    }

    fn save_settings(&mut self, settings: &mut SettingsStore) -> Result<(), ModuleError> {
        settings.set_section(
            SECTION,
            &Stored {
                borderless_window: self.borderless_window,
            },
        )?;
        Ok(())
    }
}
