//! Worker thread body: wire the real collaborators together and run

use std::sync::Arc;

use gwtb_core::config::{core_config_path, toolbox_base_dir};
use gwtb_core::modules::resources::ResourceError;
use gwtb_core::{worker, ConfigError, Overlay, Toolbox, ToolboxConfig, ToolboxPaths, WorkerExit};
use gwtb_host::{GameApi, Platform};

use crate::bridge::{GwBridge, ImGuiBackend};
use crate::logging::{self, LoggingError};
use crate::win32::Win32Platform;

/// Title of the dialog shown when startup fails before logging exists
const STARTUP_ERROR_TITLE: &str = "GWToolbox++";

/// Failures before the worker loop starts
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error("Failed to create resource client: {0}")]
    Resources(#[from] ResourceError),
}

/// Run the toolbox for the lifetime of the injection
pub fn run() -> WorkerExit {
    let platform: Arc<dyn Platform> = Arc::new(Win32Platform);
    match start(platform.clone()) {
        Ok(exit) => exit,
        Err(e) => {
            tracing::error!("{}", e);
            platform.show_error(STARTUP_ERROR_TITLE, &e.to_string());
            WorkerExit::ApiInitFailed
        }
    }
}

fn start(platform: Arc<dyn Platform>) -> Result<WorkerExit, StartupError> {
    let base = toolbox_base_dir()?;
    let (config, config_error) = match ToolboxConfig::load_from(&core_config_path()?) {
        Ok(config) => (config, None),
        Err(e) => (ToolboxConfig::default(), Some(e)),
    };
    let paths = ToolboxPaths::new(base, &config);

    let guard = logging::init(&config, &paths)?;
    tracing::info!("GWToolbox++ starting, data directory {:?}", paths.base());
    if let Some(e) = config_error {
        tracing::warn!("Using default core config: {}", e);
    }

    let game: Arc<dyn GameApi> = Arc::new(GwBridge);
    let toolbox = Toolbox::builder(
        config.clone(),
        paths,
        game.clone(),
        platform.clone(),
        Box::new(ImGuiBackend::new()),
    )
    .build()?;
    let overlay = Arc::new(Overlay::new(toolbox));

    let exit = worker::run_guarded(&config, game, platform, overlay, move || drop(guard));
    Ok(exit)
}
