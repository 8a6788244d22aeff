pub mod config;
pub mod error;
pub mod host;
pub mod models;
pub mod plugin;
pub mod provisioner;
pub mod routes;
pub mod server;
pub mod upstream;

pub use config::{
    get_config_dir, get_data_dir, plugin_route_prefix, BotConfig, FailureStatus, HostSettings,
    LoggingConfig, ServerConfig, UpstreamConfig, WatcherConfig, PLAYBOOKS_API_PATH,
};
pub use error::{CliErrorDisplay, WatcherError, WatcherResult};
pub use host::{
    get_json, set_json, DynHostApi, DynKvStore, FileKvStore, HostApi, InMemoryKvStore, KvStore,
    RestHostApi,
};
pub use models::{
    mask_secret, BotCredential, BotSpec, HostConfig, PlaybookRun, PlaybookRunList,
    UserAccessToken, DEFAULT_BOT_DISPLAY_NAME, DEFAULT_BOT_USERNAME,
};
pub use plugin::{
    Activation, ConfigurationStore, DynPlugin, PlaybookWatcherPlugin, Plugin, PluginEvent,
    PluginInfo, PluginSettings, PluginState, PLUGIN_ID,
};
pub use provisioner::{bot_token_key, BotProvisioner, BOT_TOKEN_KEY_PREFIX};
pub use routes::{build_router, RouterState, HELLO_BODY};
pub use server::{build_host_router, WatcherServer};
pub use upstream::UpstreamClient;
