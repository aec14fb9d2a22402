//! # Session Clock Example
//!
//! The smallest useful toolbox plugin: counts time spent in outposts and in
//! explorable areas, and remembers the totals across sessions.
//!
//! ## Features Demonstrated
//! - `#[toolbox_plugin]` - exporting a module from a plugin library
//! - `update(dt)` - runs every frame, even when nothing is drawn
//! - Typed settings sections with serde
//!
//! ## Settings
//!
//! ```toml
//! ["Session Clock"]
//! outpost_seconds = 812.5
//! explorable_seconds = 4410.0
//! ```
//!
//! Build with `cargo build -p session_clock --release` and copy the library
//! into the toolbox `plugins` folder.

use std::sync::Arc;

use gwtb_core::sdk::InstanceType;
use gwtb_core::settings::SettingsStore;
use gwtb_core::{toolbox_plugin, ModuleContext, ModuleError, ToolboxModule};
use gwtb_host::GameApi;
use serde::{Deserialize, Serialize};

const NAME: &str = "Session Clock";

/// Persisted totals
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Totals {
    pub outpost_seconds: f64,
    pub explorable_seconds: f64,
}

#[derive(Default)]
pub struct SessionClock {
    game: Option<Arc<dyn GameApi>>,
    totals: Totals,
}

impl SessionClock {
    pub fn totals(&self) -> Totals {
        self.totals
    }

    fn add(&mut self, instance: InstanceType, dt: f32) {
        match instance {
            InstanceType::Outpost => self.totals.outpost_seconds += f64::from(dt),
            InstanceType::Explorable => self.totals.explorable_seconds += f64::from(dt),
            InstanceType::Loading => {}
        }
    }
}

impl ToolboxModule for SessionClock {
    fn name(&self) -> &str {
        NAME
    }

    fn initialize(&mut self, ctx: &mut ModuleContext<'_>) -> Result<(), ModuleError> {
        self.game = Some(ctx.game.clone());
        Ok(())
    }

    fn update(&mut self, dt: f32) {
        if let Some(instance) = self.game.as_ref().map(|game| game.instance_type()) {
            self.add(instance, dt);
        }
    }

    fn load_settings(&mut self, settings: &SettingsStore) -> Result<(), ModuleError> {
        self.totals = settings.section(NAME)?;
        Ok(())
    }

    fn save_settings(&mut self, settings: &mut SettingsStore) -> Result<(), ModuleError> {
        settings.set_section(NAME, &self.totals)?;
        Ok(())
    }

    fn terminate(&mut self) {
        tracing::info!(
            "Session clock: {:.0}s in outposts, {:.0}s exploring",
            self.totals.outpost_seconds,
            self.totals.explorable_seconds
        );
    }
}

#[toolbox_plugin]
fn create() -> SessionClock {
    SessionClock::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loading_screens_do_not_count() {
        let mut clock = SessionClock::default();
        clock.add(InstanceType::Outpost, 2.0);
        clock.add(InstanceType::Loading, 5.0);
        clock.add(InstanceType::Explorable, 0.5);

        assert_eq!(
            clock.totals(),
            Totals {
                outpost_seconds: 2.0,
                explorable_seconds: 0.5
            }
        );
    }

    #[test]
    fn test_totals_survive_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("GWToolbox.toml");
        let mut clock = SessionClock::default();
        clock.add(InstanceType::Explorable, 30.0);

        let mut store = SettingsStore::open(&path).unwrap();
        clock.save_settings(&mut store).unwrap();
        store.save().unwrap();

        let mut restored = SessionClock::default();
        restored
            .load_settings(&SettingsStore::open(&path).unwrap())
            .unwrap();
        assert_eq!(restored.totals().explorable_seconds, 30.0);
    }

    #[test]
    fn test_exports_hand_out_the_module() {
        assert_eq!(GWTB_AbiVersion(), gwtb_core::sdk::PLUGIN_ABI_VERSION);

        let raw = GWTB_Instance();
        assert!(!raw.is_null());
        // SAFETY: GWTB_Instance returns a leaked Box<Box<dyn ToolboxModule>>
        let module = unsafe { Box::from_raw(raw as *mut Box<dyn ToolboxModule>) };
        assert_eq!(module.name(), NAME);
    }
}
