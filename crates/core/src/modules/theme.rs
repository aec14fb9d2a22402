//! UI theme

use gwtb_sdk::Device;
use serde::{Deserialize, Serialize};

use super::{ModuleError, ToolboxModule};
use crate::settings::SettingsStore;
use crate::ui::{ThemeStyle, UiBackend};

const SECTION: &str = "Theme";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct Stored {
    window_rounding: f32,
    alpha: f32,
    font_scale: f32,
}

impl Default for Stored {
    fn default() -> Self {
        Self {
            window_rounding: 6.0,
            alpha: 0.9,
            font_scale: 1.0,
        }
    }
}

impl From<&Stored> for ThemeStyle {
    fn from(stored: &Stored) -> Self {
        Self {
            window_rounding: stored.window_rounding.max(0.0),
            alpha: stored.alpha.clamp(0.1, 1.0),
            font_scale: stored.font_scale.clamp(0.5, 3.0),
        }
    }
}

/// Applies style values to the UI on the next drawn frame after they change
#[derive(Debug)]
pub struct Theme {
    style: ThemeStyle,
    dirty: bool,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            style: ThemeStyle::from(&Stored::default()),
            dirty: true,
        }
    }
}

impl Theme {
    pub fn style(&self) -> ThemeStyle {
        self.style
    }

    pub fn set_style(&mut self, style: ThemeStyle) {
        if style != self.style {
            self.style = style;
            self.dirty = true;
        }
    }
}

impl ToolboxModule for Theme {
    fn name(&self) -> &str {
        "Theme"
    }

    fn load_settings(&mut self, settings: &SettingsStore) -> Result<(), ModuleError> {
        let stored: Stored = settings.section(SECTION)?;
        self.style = ThemeStyle::from(&stored);
        self.dirty = true;
        Ok(())
    }

    fn save_settings(&mut self, settings: &mut SettingsStore) -> Result<(), ModuleError> {
        settings.set_section(
            SECTION,
            &Stored {
                window_rounding: self.style.window_rounding,
                alpha: self.style.alpha,
                font_scale: self.style.font_scale,
            },
        )?;
        Ok(())
    }

    fn is_ui_element(&self) -> bool {
        true
    }

    fn draw(&mut self, ui: &mut dyn UiBackend, _device: Device) {
        if self.dirty {
            ui.apply_style(&self.style);
            self.dirty = false;
        }
    }
}
