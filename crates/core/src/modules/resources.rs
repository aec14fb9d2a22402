//! Resource manager
//!
//! Owns the data directory layout, fetches missing default files from the
//! remote resource repository, and queues device-dependent work (texture
//! uploads) for the next drawn frame.
//!
//! Fetches run on their own short-lived thread. Completion is never
//! delivered on that thread: the callback is posted to the render-thread
//! task queue and runs with `&mut Toolbox` on the next frame. Fetch threads
//! are joined on terminate, so none outlive the module.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use gwtb_sdk::Device;

use super::ToolboxModule;
use crate::config::ToolboxPaths;
use crate::tasks::TaskSender;
use crate::toolbox::Toolbox;

/// Folders created on startup, relative to the base directory
pub const REQUIRED_FOLDERS: &[&str] = &[
    "img",
    "img/bonds",
    "img/icons",
    "img/materials",
    "img/pcons",
    "location logs",
];

/// Resource errors
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Downloads remote resources
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ResourceError>;
}

/// Upper bound on connecting to the resource host
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on a whole request, body included
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Blocking HTTP fetcher
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, ResourceError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("gwtb/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ResourceError> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ResourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.bytes()?.to_vec())
    }
}

/// Outcome of [`Resources::ensure_file_exists`]
pub enum FileStatus {
    /// Already on disk; the callback will not be called
    Present,
    /// Being downloaded; the callback runs on a later frame
    Fetching,
}

type DxUpdate = Box<dyn FnOnce(Device) + Send>;

/// Resource manager module
pub struct Resources {
    base: PathBuf,
    fetcher: Arc<dyn Fetch>,
    tasks: TaskSender,
    dx_updates: Vec<DxUpdate>,
    fetches: Vec<JoinHandle<()>>,
}

impl Resources {
    pub fn new(paths: &ToolboxPaths, fetcher: Arc<dyn Fetch>, tasks: TaskSender) -> Self {
        Self {
            base: paths.base().to_path_buf(),
            fetcher,
            tasks,
            dx_updates: Vec::new(),
            fetches: Vec::new(),
        }
    }

    /// Resolve a path inside the data directory
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.base.join(relative)
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetch> {
        &self.fetcher
    }

    /// Create a folder (and its parents) under the data directory
    pub fn ensure_folder_exists(&self, relative: impl AsRef<Path>) -> Result<(), ResourceError> {
        let path = self.path(relative);
        if !path.is_dir() {
            std::fs::create_dir_all(&path)?;
            tracing::debug!("Created folder {:?}", path);
        }
        Ok(())
    }

    /// Create every folder in [`REQUIRED_FOLDERS`]
    pub fn ensure_required_folders(&self) -> Result<(), ResourceError> {
        for folder in REQUIRED_FOLDERS {
            self.ensure_folder_exists(folder)?;
        }
        Ok(())
    }

    /// Make sure a file exists, downloading it from `url` if missing.
    ///
    /// When the file is already present this returns [`FileStatus::Present`]
    /// and `callback` is dropped. Otherwise the download runs on a background
    /// thread and `callback(toolbox, success)` is posted to the render thread
    /// once it finishes.
    pub fn ensure_file_exists<F>(
        &mut self,
        relative: impl AsRef<Path>,
        url: &str,
        callback: F,
    ) -> Result<FileStatus, ResourceError>
    where
        F: FnOnce(&mut Toolbox, bool) + Send + 'static,
    {
        let path = self.path(relative);
        if path.exists() {
            return Ok(FileStatus::Present);
        }

        let fetcher = self.fetcher.clone();
        let tasks = self.tasks.clone();
        let url = url.to_string();

        tracing::info!("Downloading {} to {:?}", url, path);
        let handle = std::thread::Builder::new()
            .name("gwtb-fetch".to_string())
            .spawn(move || {
                let success = match download(fetcher.as_ref(), &url, &path) {
                    Ok(()) => {
                        tracing::info!("Downloaded {:?}", path);
                        true
                    }
                    Err(e) => {
                        tracing::error!("Failed to download {}: {}", url, e);
                        false
                    }
                };
                let _ = tasks.post(move |toolbox| callback(toolbox, success));
            })?;

        self.fetches.retain(|fetch| !fetch.is_finished());
        self.fetches.push(handle);
        Ok(FileStatus::Fetching)
    }

    /// Downloads whose thread is still running
    pub fn pending_fetches(&self) -> usize {
        self.fetches.iter().filter(|fetch| !fetch.is_finished()).count()
    }

    /// Block until every download thread has exited
    pub fn wait_for_fetches(&mut self) {
        if self.fetches.is_empty() {
            return;
        }
        tracing::debug!("Waiting for {} downloads", self.fetches.len());
        for fetch in self.fetches.drain(..) {
            if fetch.join().is_err() {
                tracing::error!("Download thread panicked");
            }
        }
    }

    /// Queue device-dependent work for the next drawn frame
    pub fn queue_dx_update<F>(&mut self, update: F)
    where
        F: FnOnce(Device) + Send + 'static,
    {
        self.dx_updates.push(Box::new(update));
    }

    pub fn pending_dx_updates(&self) -> usize {
        self.dx_updates.len()
    }

    /// Run queued device work. Called by the frame driver on drawn frames.
    pub fn dx_update(&mut self, device: Device) {
        for update in self.dx_updates.drain(..) {
            update(device);
        }
    }
}

fn download(fetcher: &dyn Fetch, url: &str, path: &Path) -> Result<(), ResourceError> {
    let bytes = fetcher.fetch(url)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    // Write to a sibling first so a half-written file is never picked up
    let partial = path.with_extension("part");
    std::fs::write(&partial, bytes)?;
    std::fs::rename(&partial, path)?;
    Ok(())
}

impl ToolboxModule for Resources {
    fn name(&self) -> &str {
        "Resources"
    }

    fn terminate(&mut self) {
        if !self.dx_updates.is_empty() {
            tracing::debug!("Dropping {} pending device updates", self.dx_updates.len());
        }
        self.dx_updates.clear();
        self.wait_for_fetches();
    }
}

impl Drop for Resources {
    fn drop(&mut self) {
        self.wait_for_fetches();
    }
}
