//! Grouped key/value settings store
//!
//! Every module owns a section (e.g. `[Game Settings]`) and reads/writes its
//! own keys during `load_settings` / `save_settings`. The store is a TOML
//! table kept in memory and flushed on [`SettingsStore::save`].
//!
//! Keys are kept sorted, so saving an unchanged store always produces the
//! same file.

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use toml::{Table, Value};

/// Settings store errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Section [{section}] is not a table")]
    NotATable { section: String },
}

pub type SettingsResult<T> = Result<T, SettingsError>;

/// In-memory settings backed by a file
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    table: Table,
}

impl SettingsStore {
    /// Open the store at `path`.
    ///
    /// A missing file yields an empty store; it will be created on save.
    pub fn open(path: impl Into<PathBuf>) -> SettingsResult<Self> {
        let mut store = Self {
            path: path.into(),
            table: Table::new(),
        };
        store.reload()?;
        Ok(store)
    }

    /// Re-read the backing file, replacing in-memory values
    pub fn reload(&mut self) -> SettingsResult<()> {
        self.table = if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            content.parse::<Table>()?
        } else {
            Table::new()
        };
        tracing::debug!("Loaded settings from {:?} ({} sections)", self.path, self.table.len());
        Ok(())
    }

    /// Flush in-memory values to the backing file
    pub fn save(&self) -> SettingsResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(&self.table)?;
        std::fs::write(&self.path, content)?;
        tracing::debug!("Saved settings to {:?}", self.path);
        Ok(())
    }

    /// Drop every in-memory value
    pub fn reset(&mut self) {
        self.table.clear();
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.table.contains_key(section)
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }

    fn value(&self, section: &str, key: &str) -> Option<&Value> {
        self.table.get(section)?.as_table()?.get(key)
    }

    fn section_mut(&mut self, section: &str) -> &mut Table {
        let entry = self
            .table
            .entry(section.to_string())
            .or_insert_with(|| Value::Table(Table::new()));
        if !entry.is_table() {
            tracing::warn!("Settings section [{}] was not a table, replacing it", section);
            *entry = Value::Table(Table::new());
        }
        match entry {
            Value::Table(table) => table,
            _ => unreachable!("section was just made a table"),
        }
    }

    /// Set a raw value
    pub fn set_value(&mut self, section: &str, key: &str, value: impl Into<Value>) {
        self.section_mut(section).insert(key.to_string(), value.into());
    }

    pub fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.value(section, key)
            .and_then(Value::as_bool)
            .unwrap_or(default)
    }

    pub fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.value(section, key)
            .and_then(Value::as_integer)
            .unwrap_or(default)
    }

    /// Integers are accepted where floats are expected
    pub fn get_float(&self, section: &str, key: &str, default: f64) -> f64 {
        match self.value(section, key) {
            Some(Value::Float(f)) => *f,
            Some(Value::Integer(i)) => *i as f64,
            _ => default,
        }
    }

    pub fn get_str<'a>(&'a self, section: &str, key: &str, default: &'a str) -> &'a str {
        self.value(section, key)
            .and_then(Value::as_str)
            .unwrap_or(default)
    }

    pub fn get_str_list(&self, section: &str, key: &str) -> Vec<String> {
        self.value(section, key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set_bool(&mut self, section: &str, key: &str, value: bool) {
        self.set_value(section, key, value);
    }

    pub fn set_int(&mut self, section: &str, key: &str, value: i64) {
        self.set_value(section, key, value);
    }

    pub fn set_float(&mut self, section: &str, key: &str, value: f64) {
        self.set_value(section, key, value);
    }

    pub fn set_str(&mut self, section: &str, key: &str, value: &str) {
        self.set_value(section, key, value);
    }

    pub fn set_str_list(&mut self, section: &str, key: &str, values: &[String]) {
        let array: Vec<Value> = values.iter().cloned().map(Value::String).collect();
        self.set_value(section, key, array);
    }

    /// Read a whole section into a typed struct.
    ///
    /// Missing sections and missing keys fall back to `T::default()` as long
    /// as `T` uses `#[serde(default)]`.
    pub fn section<T: DeserializeOwned + Default>(&self, section: &str) -> SettingsResult<T> {
        match self.table.get(section) {
            None => Ok(T::default()),
            Some(value @ Value::Table(_)) => Ok(value.clone().try_into()?),
            Some(_) => Err(SettingsError::NotATable {
                section: section.to_string(),
            }),
        }
    }

    /// Write a typed struct as a whole section, replacing its keys
    pub fn set_section<T: Serialize>(&mut self, section: &str, value: &T) -> SettingsResult<()> {
        match Value::try_from(value)? {
            table @ Value::Table(_) => {
                self.table.insert(section.to_string(), table);
                Ok(())
            }
            _ => Err(SettingsError::NotATable {
                section: section.to_string(),
            }),
        }
    }
}
