//! Chat filter
//!
//! Hides chat lines containing any of the configured words. Matching is
//! case-insensitive and on substrings.

use serde::{Deserialize, Serialize};

use super::{ModuleError, ToolboxModule};
use crate::settings::SettingsStore;

const SECTION: &str = "Chat Filter";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct Stored {
    enabled: bool,
    words: Vec<String>,
}

impl Default for Stored {
    fn default() -> Self {
        Self {
            enabled: true,
            words: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct ChatFilter {
    pub enabled: bool,
    words: Vec<String>,
}

impl Default for ChatFilter {
    fn default() -> Self {
        let stored = Stored::default();
        Self {
            enabled: stored.enabled,
            words: stored.words,
        }
    }
}

impl ChatFilter {
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Replace the word list; blank entries are dropped
    pub fn set_words<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
    }

    pub fn should_filter(&self, message: &str) -> bool {
        if !self.enabled || self.words.is_empty() {
            return false;
        }
        let message = message.to_lowercase();
        self.words.iter().any(|w| message.contains(w.as_str()))
    }
}

impl ToolboxModule for ChatFilter {
    fn name(&self) -> &str {
        "Chat Filter"
    }

    fn load_settings(&mut self, settings: &SettingsStore) -> Result<(), ModuleError> {
        let stored: Stored = settings.section(SECTION)?;
        self.enabled = stored.enabled;
        self.set_words(&stored.words);
        Ok(())
    }

    fn save_settings(&mut self, settings: &mut SettingsStore) -> Result<(), ModuleError> {
        settings.set_section(
            SECTION,
            &Stored {
                enabled: self.enabled,
                words: self.words.clone(),
            },
        )?;
        Ok(())
    }
}
