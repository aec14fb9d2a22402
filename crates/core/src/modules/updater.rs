//! Update checker
//!
//! Queries the release feed once at startup and reports when a newer
//! version exists. Installing updates is left to the launcher.

use std::sync::Arc;
use std::thread::JoinHandle;

use serde::{Deserialize, Serialize};

use super::resources::{Fetch, ResourceError};
use super::{ModuleContext, ModuleError, ToolboxModule};
use crate::settings::SettingsStore;
use crate::tasks::TaskSender;

const SECTION: &str = "Updater";

/// Version of this build
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// What to do at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMode {
    /// Never query the feed
    Off,
    /// Query the feed and log/report a newer release
    #[default]
    Check,
}

impl UpdateMode {
    fn from_setting(value: i64) -> Self {
        match value {
            0 => Self::Off,
            _ => Self::Check,
        }
    }

    fn as_setting(self) -> i64 {
        match self {
            Self::Off => 0,
            Self::Check => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct Stored {
    mode: i64,
}

impl Default for Stored {
    fn default() -> Self {
        Self {
            mode: UpdateMode::default().as_setting(),
        }
    }
}

#[derive(Deserialize)]
struct Release {
    tag_name: String,
}

/// Pull the version out of a release feed response
pub fn parse_release(body: &[u8]) -> Result<String, ResourceError> {
    let release: Release = serde_json::from_slice(body)
        .map_err(|e| ResourceError::InvalidResponse(e.to_string()))?;
    Ok(release.tag_name.trim_start_matches('v').to_string())
}

/// Whether `remote` is a newer dotted version than `local`
pub fn is_newer(remote: &str, local: &str) -> bool {
    fn parts(v: &str) -> Vec<u64> {
        v.trim_start_matches('v')
            .split(['.', '_', '-'])
            .map_while(|p| p.parse().ok())
            .collect()
    }
    parts(remote) > parts(local)
}

pub struct Updater {
    fetcher: Arc<dyn Fetch>,
    mode: UpdateMode,
    update_url: String,
    tasks: Option<TaskSender>,
    latest: Option<String>,
    check: Option<JoinHandle<()>>,
}

impl Updater {
    pub fn new(fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            fetcher,
            mode: UpdateMode::default(),
            update_url: String::new(),
            tasks: None,
            latest: None,
            check: None,
        }
    }

    pub fn mode(&self) -> UpdateMode {
        self.mode
    }

    /// Newer release found by the last check
    pub fn available_update(&self) -> Option<&str> {
        self.latest.as_deref()
    }

    /// Start a background check. The answer arrives on a later frame.
    pub fn check_for_update(&mut self) {
        if self.mode == UpdateMode::Off || self.update_url.is_empty() {
            return;
        }
        if self.is_checking() {
            return;
        }
        let Some(tasks) = self.tasks.clone() else {
            return;
        };
        let fetcher = self.fetcher.clone();
        let url = self.update_url.clone();

        let spawned = std::thread::Builder::new()
            .name("gwtb-updater".to_string())
            .spawn(move || {
                let result = fetcher.fetch(&url).and_then(|body| parse_release(&body));
                match result {
                    Ok(version) => {
                        let _ = tasks.post(move |toolbox| {
                            if let Some(updater) = toolbox.modules_mut().get_mut::<Updater>() {
                                updater.on_release(&version);
                            }
                        });
                    }
                    Err(e) => tracing::warn!("Update check failed: {}", e),
                }
            });
        match spawned {
            Ok(handle) => self.check = Some(handle),
            Err(e) => tracing::warn!("Could not start update check: {}", e),
        }
    }

    /// Whether the background check is still running
    pub fn is_checking(&self) -> bool {
        self.check.as_ref().is_some_and(|check| !check.is_finished())
    }

    fn wait_for_check(&mut self) {
        if let Some(check) = self.check.take() {
            if check.join().is_err() {
                tracing::error!("Update check thread panicked");
            }
        }
    }

    /// Record the latest published version
    pub fn on_release(&mut self, version: &str) {
        if is_newer(version, CURRENT_VERSION) {
            tracing::info!(
                "GWToolbox++ version {} is available (running {})",
                version,
                CURRENT_VERSION
            );
            self.latest = Some(version.to_string());
        } else {
            tracing::debug!("GWToolbox++ is up to date ({})", CURRENT_VERSION);
            self.latest = None;
        }
    }
}

impl ToolboxModule for Updater {
    fn name(&self) -> &str {
        "Updater"
    }

    fn initialize(&mut self, ctx: &mut ModuleContext<'_>) -> Result<(), ModuleError> {
        self.update_url = ctx.config.update_url.clone();
        self.tasks = Some(ctx.tasks.clone());
        Ok(())
    }

    fn load_settings(&mut self, settings: &SettingsStore) -> Result<(), ModuleError> {
        let stored: Stored = settings.section(SECTION)?;
        self.mode = UpdateMode::from_setting(stored.mode);
        Ok(())
    }

    fn save_settings(&mut self, settings: &mut SettingsStore) -> Result<(), ModuleError> {
        settings.set_section(
            SECTION,
            &Stored {
                mode: self.mode.as_setting(),
            },
        )?;
        Ok(())
    }

    fn terminate(&mut self) {
        self.wait_for_check();
    }
}

impl Drop for Updater {
    fn drop(&mut self) {
        self.wait_for_check();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::resources::tests::{SlowFetcher, StaticFetcher};
    use crate::tasks::TaskQueue;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    #[test]
    fn test_parse_release() {
        let body = br#"{"tag_name": "v1.4.2", "name": "Release"}"#;
        assert_eq!(parse_release(body).unwrap(), "1.4.2");
        assert!(parse_release(b"not json").is_err());
    }

    #[test]
    fn test_version_ordering() {
        assert!(is_newer("1.2.0", "1.1.9"));
        assert!(is_newer("2.0", "1.9.9"));
        assert!(is_newer("0.1.1", "0.1.0"));
        assert!(!is_newer("0.1.0", "0.1.0"));
        assert!(!is_newer("0.0.9", "0.1.0"));
    }

    #[test]
    fn test_on_release_records_newer_only() {
        let mut updater = Updater::new(Arc::new(StaticFetcher::default()));
        updater.on_release("999.0.0");
        assert_eq!(updater.available_update(), Some("999.0.0"));

        updater.on_release(CURRENT_VERSION);
        assert_eq!(updater.available_update(), None);
    }

    #[test]
    fn test_terminate_waits_for_check() {
        let fetcher = Arc::new(SlowFetcher::new(Duration::from_millis(50)));
        let queue = TaskQueue::default();
        let mut updater = Updater::new(fetcher.clone());
        updater.update_url = "https://x/latest".to_string();
        updater.tasks = Some(queue.sender());

        updater.check_for_update();
        updater.terminate();

        assert!(!updater.is_checking());
        assert_eq!(fetcher.started.load(Ordering::SeqCst), 1);
        assert_eq!(fetcher.in_flight.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_mode_from_settings() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SettingsStore::open(dir.path().join("s.toml")).unwrap();
        store.set_int(SECTION, "mode", 0);

        let mut updater = Updater::new(Arc::new(StaticFetcher::default()));
        updater.load_settings(&store).unwrap();

        assert_eq!(updater.mode(), UpdateMode::Off);
    }
}
