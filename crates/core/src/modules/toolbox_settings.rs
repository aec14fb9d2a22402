//! Toolbox settings
//!
//! Holds the catalogue of optional built-in modules and the user's choice of
//! which ones to run. Each entry is persisted as `use_<name>` in the
//! `[Toolbox Settings]` section.

use std::collections::BTreeMap;

use super::{ModuleError, ToolboxModule};
use crate::settings::SettingsStore;

const SECTION: &str = "Toolbox Settings";

type Factory = Box<dyn Fn() -> Box<dyn ToolboxModule> + Send>;

/// A built-in module the user can switch on or off
pub struct OptionalModule {
    name: String,
    default_enabled: bool,
    factory: Factory,
}

impl OptionalModule {
    pub fn new<F, M>(name: impl Into<String>, default_enabled: bool, factory: F) -> Self
    where
        F: Fn() -> M + Send + 'static,
        M: ToolboxModule,
    {
        Self {
            name: name.into(),
            default_enabled,
            factory: Box::new(move || Box::new(factory()) as Box<dyn ToolboxModule>),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Settings key for this entry
    pub fn setting_key(&self) -> String {
        format!("use_{}", self.name.to_lowercase().replace(' ', "_"))
    }
}

/// Optional module catalogue
#[derive(Default)]
pub struct ToolboxSettings {
    catalogue: Vec<OptionalModule>,
    enabled: BTreeMap<String, bool>,
    created: Vec<String>,
}

impl ToolboxSettings {
    pub fn new(catalogue: Vec<OptionalModule>) -> Self {
        let enabled = catalogue
            .iter()
            .map(|m| (m.name.clone(), m.default_enabled))
            .collect();
        Self {
            catalogue,
            enabled,
            created: Vec::new(),
        }
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.get(name).copied().unwrap_or(false)
    }

    /// Takes effect on the next start
    pub fn set_enabled(&mut self, name: &str, enabled: bool) {
        if let Some(flag) = self.enabled.get_mut(name) {
            *flag = enabled;
        }
    }

    /// Instantiate every enabled module not created yet, in catalogue order
    pub fn initialize_modules(&mut self) -> Vec<Box<dyn ToolboxModule>> {
        let mut modules = Vec::new();
        for entry in &self.catalogue {
            if !self.is_enabled(&entry.name) || self.created.contains(&entry.name) {
                continue;
            }
            tracing::debug!("Creating optional module: {}", entry.name);
            modules.push((entry.factory)());
            self.created.push(entry.name.clone());
        }
        modules
    }
}

impl ToolboxModule for ToolboxSettings {
    fn name(&self) -> &str {
        "Toolbox Settings"
    }

    fn load_settings(&mut self, settings: &SettingsStore) -> Result<(), ModuleError> {
        for entry in &self.catalogue {
            let on = settings.get_bool(SECTION, &entry.setting_key(), entry.default_enabled);
            self.enabled.insert(entry.name.clone(), on);
        }
        Ok(())
    }

    fn save_settings(&mut self, settings: &mut SettingsStore) -> Result<(), ModuleError> {
        for entry in &self.catalogue {
            settings.set_bool(SECTION, &entry.setting_key(), self.is_enabled(&entry.name));
        }
        Ok(())
    }
}
