//! Lifecycle controller
//!
//! [`Toolbox`] owns everything the overlay does at runtime: the module
//! registry, the settings store, the render-thread task queue, the UI
//! backend, the window-procedure hook and the frame/input state. It is built
//! once by the worker thread, lives behind the overlay's lock, and is only
//! ever touched from the host's render thread afterwards.

use std::sync::Arc;

use gwtb_host::{GameApi, Platform};
use gwtb_sdk::InstanceType;

use crate::config::{ToolboxConfig, ToolboxPaths};
use crate::frame::{FrameState, LifecycleFlags};
use crate::hooks::{self, WndProcHook};
use crate::input::InputState;
use crate::modules::resources::{Fetch, HttpFetcher, ResourceError};
use crate::modules::{
    ChatCommands, ChatFilter, CommandOutcome, GameSettings, ModuleContext, ModuleKey,
    ModuleOrigin, ModuleRegistry, OptionalModule, Resources, Theme, ToolboxModule,
    ToolboxSettings, Updater,
};
use crate::plugins::{self, LibraryPluginSource, PluginSource};
use crate::settings::SettingsStore;
use crate::tasks::TaskQueue;
use crate::ui::{UiBackend, UiIo};

/// Builder for [`Toolbox`]
pub struct ToolboxBuilder {
    config: ToolboxConfig,
    paths: ToolboxPaths,
    game: Arc<dyn GameApi>,
    platform: Arc<dyn Platform>,
    ui: Box<dyn UiBackend>,
    fetcher: Option<Arc<dyn Fetch>>,
    plugin_source: Option<Box<dyn PluginSource>>,
    optional_modules: Vec<OptionalModule>,
    flags: Option<Arc<LifecycleFlags>>,
}

impl ToolboxBuilder {
    /// Fetcher for remote resources (defaults to HTTP)
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetch>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Where plugin modules come from (defaults to the OS loader)
    pub fn plugin_source(mut self, source: impl PluginSource + 'static) -> Self {
        self.plugin_source = Some(Box::new(source));
        self
    }

    /// Offer an optional module through toolbox settings
    pub fn optional_module(mut self, module: OptionalModule) -> Self {
        self.optional_modules.push(module);
        self
    }

    /// Share lifecycle flags with another owner (the worker thread)
    pub fn flags(mut self, flags: Arc<LifecycleFlags>) -> Self {
        self.flags = Some(flags);
        self
    }

    pub fn build(self) -> Result<Toolbox, ResourceError> {
        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpFetcher::new()?),
        };
        Ok(Toolbox {
            config: self.config,
            paths: self.paths,
            game: self.game,
            platform: self.platform,
            flags: self.flags.unwrap_or_default(),
            fetcher,
            plugin_source: self
                .plugin_source
                .unwrap_or_else(|| Box::new(LibraryPluginSource)),
            optional_modules: self.optional_modules,
            settings: None,
            modules: ModuleRegistry::new(),
            tasks: TaskQueue::default(),
            ui: self.ui,
            io: UiIo::default(),
            frame: FrameState::default(),
            input: InputState::default(),
            wndproc: WndProcHook::new(),
            chat_hooked: false,
            initialized: false,
            plugin_libraries: Vec::new(),
        })
    }
}

/// The toolbox runtime
pub struct Toolbox {
    pub(crate) config: ToolboxConfig,
    pub(crate) paths: ToolboxPaths,
    pub(crate) game: Arc<dyn GameApi>,
    pub(crate) platform: Arc<dyn Platform>,
    pub(crate) flags: Arc<LifecycleFlags>,
    fetcher: Arc<dyn Fetch>,
    plugin_source: Box<dyn PluginSource>,
    optional_modules: Vec<OptionalModule>,
    settings: Option<SettingsStore>,
    pub(crate) modules: ModuleRegistry,
    tasks: TaskQueue,
    pub(crate) ui: Box<dyn UiBackend>,
    pub(crate) io: UiIo,
    pub(crate) frame: FrameState,
    pub(crate) input: InputState,
    pub(crate) wndproc: WndProcHook,
    chat_hooked: bool,
    initialized: bool,
    /// Last field: plugin code must stay mapped until every module and
    /// queued task above has been dropped
    plugin_libraries: Vec<libloading::Library>,
}

impl Toolbox {
    pub fn builder(
        config: ToolboxConfig,
        paths: ToolboxPaths,
        game: Arc<dyn GameApi>,
        platform: Arc<dyn Platform>,
        ui: Box<dyn UiBackend>,
    ) -> ToolboxBuilder {
        ToolboxBuilder {
            config,
            paths,
            game,
            platform,
            ui,
            fetcher: None,
            plugin_source: None,
            optional_modules: Vec::new(),
            flags: None,
        }
    }

    pub fn config(&self) -> &ToolboxConfig {
        &self.config
    }

    pub fn paths(&self) -> &ToolboxPaths {
        &self.paths
    }

    pub fn game(&self) -> &Arc<dyn GameApi> {
        &self.game
    }

    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.platform
    }

    pub fn flags(&self) -> &Arc<LifecycleFlags> {
        &self.flags
    }

    pub fn tasks(&self) -> &TaskQueue {
        &self.tasks
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    pub fn modules_mut(&mut self) -> &mut ModuleRegistry {
        &mut self.modules
    }

    pub fn ui_mut(&mut self) -> &mut dyn UiBackend {
        self.ui.as_mut()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The settings store, opened on first use.
    ///
    /// `None` when the file exists but cannot be parsed; saving is then
    /// skipped so the user's file is left alone.
    pub fn settings(&mut self) -> Option<&mut SettingsStore> {
        if self.settings.is_none() {
            self.open_settings();
        }
        self.settings.as_mut()
    }

    fn open_settings(&mut self) {
        let path = self.paths.settings_file();
        match SettingsStore::open(&path) {
            Ok(store) => self.settings = Some(store),
            Err(e) => tracing::error!("Failed to open settings {:?}: {}", path, e),
        }
    }

    /// Re-read the settings file and hand it to every module
    pub fn reload_settings(&mut self) {
        match self.settings.as_mut() {
            Some(store) => {
                if let Err(e) = store.reload() {
                    tracing::error!("Failed to reload settings: {}", e);
                    return;
                }
            }
            None => self.open_settings(),
        }
        self.load_module_settings(|_| true);
    }

    fn load_module_settings(&mut self, filter: impl Fn(ModuleOrigin) -> bool) {
        if let Some(store) = self.settings.as_ref() {
            self.modules.load_settings(store, filter);
        }
    }

    fn register_and_initialize(
        &mut self,
        module: Box<dyn ToolboxModule>,
        origin: ModuleOrigin,
    ) -> ModuleKey {
        let key = self.modules.register(module, origin);
        let sender = self.tasks.sender();
        let mut ctx = ModuleContext {
            config: &self.config,
            paths: &self.paths,
            tasks: &sender,
            game: &self.game,
        };
        self.modules.initialize(key, &mut ctx);
        key
    }

    /// Register and initialize core modules in order, then load their
    /// settings. A failing module is skipped; the rest still come up.
    fn initialize_core(&mut self, core: Vec<Box<dyn ToolboxModule>>) {
        for module in core {
            self.register_and_initialize(module, ModuleOrigin::Core);
        }
        self.load_module_settings(|origin| origin == ModuleOrigin::Core);
    }

    /// Bring every module up. Runs once; later calls do nothing.
    #[tracing::instrument(skip_all)]
    pub fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        self.initialized = true;
        tracing::info!("Initializing Toolbox");

        let mut resources = Resources::new(&self.paths, self.fetcher.clone(), self.tasks.sender());
        if let Err(e) = resources.ensure_required_folders() {
            tracing::error!("Failed to create data folders: {}", e);
        }

        let settings_file = self.config.settings_file.clone();
        let settings_url = self.config.resource_url(&settings_file);
        let fetched = resources.ensure_file_exists(&settings_file, &settings_url, |toolbox, success| {
            if success {
                tracing::info!("Default settings downloaded, reloading");
                toolbox.reload_settings();
            } else {
                tracing::warn!("Default settings unavailable, continuing with built-in defaults");
            }
        });
        if let Err(e) = fetched {
            tracing::error!("Failed to fetch default settings: {}", e);
        }

        self.open_settings();

        let core: Vec<Box<dyn ToolboxModule>> = vec![
            Box::new(resources),
            Box::new(Updater::new(self.fetcher.clone())),
            Box::new(GameSettings::default()),
            Box::new(ToolboxSettings::new(std::mem::take(&mut self.optional_modules))),
            Box::new(ChatFilter::default()),
            Box::new(ChatCommands::default()),
            Box::new(Theme::default()),
        ];
        self.initialize_core(core);

        match self
            .game
            .install_chat_hooks(ChatCommands::COMMANDS, hooks::chat_hooks())
        {
            Ok(()) => self.chat_hooked = true,
            Err(e) => tracing::warn!("Chat commands unavailable: {}", e),
        }

        let report = plugins::load_plugins(&self.paths.plugins_dir(), self.plugin_source.as_ref());
        for (_, plugin) in report.loaded {
            if let Some(library) = plugin.library {
                self.plugin_libraries.push(library);
            }
            self.register_and_initialize(plugin.module, ModuleOrigin::Plugin);
        }

        let optional = self
            .modules
            .get_mut::<ToolboxSettings>()
            .map(ToolboxSettings::initialize_modules)
            .unwrap_or_default();
        for module in optional {
            self.register_and_initialize(module, ModuleOrigin::Optional);
        }

        self.load_module_settings(|origin| origin != ModuleOrigin::Core);

        if let Some(updater) = self.modules.get_mut::<Updater>() {
            updater.check_for_update();
        }

        if self.game.instance_type() != InstanceType::Loading {
            if let Some(player) = self.game.player_name() {
                tracing::info!("Hello {}!", player);
            }
        }
        tracing::info!("Toolbox initialized with {} modules", self.modules.len());
    }

    /// Let every module write its settings, then flush the store
    pub fn save_settings(&mut self) {
        let Some(store) = self.settings.as_mut() else {
            return;
        };
        self.modules.save_settings(store);
        match store.save() {
            Ok(()) => tracing::debug!("Settings saved"),
            Err(e) => tracing::error!("Failed to save settings: {}", e),
        }
    }

    /// Run a chat command typed by the player, e.g. `/cam unlock`
    pub fn execute_chat_command(&mut self, line: &str) -> CommandOutcome {
        let outcome = match self.modules.get_mut::<ChatCommands>() {
            Some(commands) => commands.execute(line),
            None => CommandOutcome::Unknown,
        };
        match outcome {
            CommandOutcome::Usage(usage) => self.game.write_chat(&format!("Usage: {}", usage)),
            CommandOutcome::Unknown => tracing::debug!("Unhandled chat command: {}", line),
            CommandOutcome::Handled => {}
        }
        outcome
    }

    /// Whether an incoming chat line should be hidden
    pub fn should_filter_chat(&self, text: &str) -> bool {
        self.modules
            .get::<ChatFilter>()
            .is_some_and(|filter| filter.should_filter(text))
    }

    /// Save, release the settings store and terminate every module.
    ///
    /// Background downloads are joined here, so nothing the toolbox spawned
    /// is still running once this returns.
    #[tracing::instrument(skip_all)]
    pub fn terminate(&mut self) {
        self.save_settings();
        if let Some(mut store) = self.settings.take() {
            store.reset();
        }

        if std::mem::take(&mut self.chat_hooked) {
            self.game.remove_chat_hooks();
        }
        self.modules.terminate();

        if self.game.instance_type() != InstanceType::Loading {
            tracing::info!("Bye!");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::resources::tests::SlowFetcher;
    use crate::modules::tests::Recorder;
    use crate::modules::ModuleState;
    use crate::plugins::tests::FakeSource;
    use crate::testing::{calls, fixture, TestFixture};
    use gwtb_sdk::versions::PLUGIN_EXTENSION;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    #[test]
    fn test_core_modules_in_order() {
        let TestFixture { mut toolbox, dir: _dir, .. } = fixture();
        toolbox.initialize();

        assert_eq!(
            toolbox.modules().names(),
            vec![
                "Resources",
                "Updater",
                "Game Settings",
                "Toolbox Settings",
                "Chat Filter",
                "Chat Commands",
                "Theme"
            ]
        );
    }

    #[test]
    fn test_initialize_runs_once() {
        let TestFixture { mut toolbox, dir: _dir, .. } = fixture();
        toolbox.initialize();
        let count = toolbox.modules().len();
        toolbox.initialize();
        assert_eq!(toolbox.modules().len(), count);
    }

    #[test]
    fn test_failing_optional_module_does_not_stop_others() {
        let log = calls();
        let failing = log.clone();
        let healthy = log.clone();
        let TestFixture { toolbox, dir, .. } = fixture();
        let mut toolbox = toolbox;
        toolbox.optional_modules = vec![
            OptionalModule::new("Broken", true, move || Recorder {
                fail_init: true,
                ..Recorder::new("broken", &failing)
            }),
            OptionalModule::new("Healthy", true, move || Recorder::new("healthy", &healthy)),
        ];

        toolbox.initialize();

        let keys = toolbox.modules().keys().to_vec();
        let broken = keys
            .iter()
            .find(|k| toolbox.modules().name(**k) == Some("broken"))
            .copied()
            .unwrap();
        assert_eq!(toolbox.modules().state(broken), Some(ModuleState::Failed));
        let log = log.lock().clone();
        assert!(log.contains(&"healthy:init".to_string()));
        // Failed module never gets settings
        assert!(!log.contains(&"broken:load".to_string()));
        assert!(log.contains(&"healthy:load".to_string()));
        drop(dir);
    }

    #[test]
    fn test_failing_core_module_does_not_stop_later_ones() {
        let log = calls();
        let TestFixture { mut toolbox, dir: _dir, .. } = fixture();
        toolbox.open_settings();

        toolbox.initialize_core(vec![
            Box::new(Recorder {
                fail_init: true,
                ..Recorder::new("first", &log)
            }),
            Box::new(Recorder::new("second", &log)),
            Box::new(Recorder::new("third", &log)),
        ]);

        let keys = toolbox.modules().keys().to_vec();
        assert_eq!(toolbox.modules().state(keys[0]), Some(ModuleState::Failed));
        assert_eq!(toolbox.modules().state(keys[1]), Some(ModuleState::Active));
        assert_eq!(toolbox.modules().origin(keys[2]), Some(ModuleOrigin::Core));
        assert_eq!(
            *log.lock(),
            vec!["first:init", "second:init", "third:init", "second:load", "third:load"]
        );
    }

    #[test]
    fn test_one_good_plugin_one_bad() {
        let TestFixture { toolbox, dir, .. } = fixture();
        let plugins = dir.path().join("plugins");
        std::fs::create_dir_all(&plugins).unwrap();
        std::fs::write(plugins.join(format!("good.{}", PLUGIN_EXTENSION)), b"").unwrap();
        std::fs::write(plugins.join(format!("noexport.{}", PLUGIN_EXTENSION)), b"").unwrap();
        let mut toolbox = toolbox;
        toolbox.plugin_source = Box::new(FakeSource);

        toolbox.initialize();

        let plugin_count = toolbox
            .modules()
            .keys()
            .iter()
            .filter(|k| toolbox.modules().origin(**k) == Some(ModuleOrigin::Plugin))
            .count();
        assert_eq!(plugin_count, 1);
    }

    #[test]
    fn test_save_settings_twice_is_stable() {
        let TestFixture { mut toolbox, dir: _dir, .. } = fixture();
        toolbox.initialize();
        let path = toolbox.paths().settings_file();

        toolbox.save_settings();
        let first = std::fs::read_to_string(&path).unwrap();
        toolbox.save_settings();
        let second = std::fs::read_to_string(&path).unwrap();

        assert_eq!(first, second);
        assert!(first.contains("[\"Game Settings\"]"));
    }

    #[test]
    fn test_terminate_saves_and_releases_store() {
        let log = calls();
        let recorder_log = log.clone();
        let TestFixture { toolbox, dir: _dir, .. } = fixture();
        let mut toolbox = toolbox;
        toolbox.optional_modules =
            vec![OptionalModule::new("Recorder", true, move || Recorder::new("recorder", &recorder_log))];
        toolbox.initialize();
        log.lock().clear();

        toolbox.terminate();

        assert_eq!(*log.lock(), vec!["recorder:save", "recorder:terminate"]);
        assert!(toolbox.settings.is_none());
        let saved = SettingsStore::open(toolbox.paths().settings_file()).unwrap();
        assert!(saved.get_bool("recorder", "saved", false));
    }

    #[test]
    fn test_terminate_joins_background_fetches() {
        let fetcher = Arc::new(SlowFetcher::new(Duration::from_millis(50)));
        let TestFixture { mut toolbox, dir: _dir, .. } = fixture();
        toolbox.fetcher = fetcher.clone();
        toolbox.config.update_url = "https://x/latest".to_string();

        toolbox.initialize();
        toolbox.terminate();

        // Default settings download plus the update check
        assert_eq!(fetcher.started.load(Ordering::SeqCst), 2);
        assert_eq!(fetcher.in_flight.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_chat_hooks_follow_lifecycle() {
        let TestFixture { mut toolbox, game, dir: _dir, .. } = fixture();
        toolbox.initialize();
        assert_eq!(game.state.lock().chat_commands, vec!["cam", "camera"]);

        assert_eq!(toolbox.execute_chat_command("/cam unlock"), CommandOutcome::Handled);
        assert!(game.state.lock().camera_unlocked);
        assert!(matches!(
            toolbox.execute_chat_command("/cam speed fast"),
            CommandOutcome::Usage(_)
        ));
        assert_eq!(game.state.lock().chat_log.len(), 1);

        toolbox.terminate();

        let state = game.state.lock();
        assert!(state.chat_hooks.is_none());
        assert_eq!(state.chat_hooks_removed, 1);
        // Terminating chat commands relocks the camera
        assert!(!state.camera_unlocked);
    }

    #[test]
    fn test_unparseable_settings_are_left_alone() {
        let TestFixture { mut toolbox, dir: _dir, .. } = fixture();
        let path = toolbox.paths().settings_file();
        std::fs::write(&path, "this is = = not toml").unwrap();

        toolbox.initialize();
        toolbox.save_settings();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "this is = = not toml");
    }
}
