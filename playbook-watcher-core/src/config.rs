use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{WatcherError, WatcherResult};
use crate::models::{BotSpec, DEFAULT_BOT_DISPLAY_NAME, DEFAULT_BOT_USERNAME};

/// Path appended to the site URL to reach the playbooks REST API.
pub const PLAYBOOKS_API_PATH: &str = "/plugins/playbooks/api/v0";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WatcherConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub host: HostSettings,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_plugin_id")]
    pub plugin_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSettings {
    #[serde(default)]
    pub site_url: String,

    #[serde(default)]
    pub admin_token: String,

    #[serde(default)]
    pub kv_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_api_path")]
    pub api_path: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub failure_status: FailureStatus,
}

/// Status `/runs` answers with when the upstream call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailureStatus {
    /// `200` with a `null` body.
    #[default]
    Ok,
    /// `502` with a `null` body.
    BadGateway,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_bot_username")]
    pub username: String,

    #[serde(default = "default_bot_display_name")]
    pub display_name: String,

    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json_format: bool,
}

fn default_bind_address() -> String {
    "127.0.0.1:8065".to_string()
}

fn default_plugin_id() -> String {
    "playbook-watcher".to_string()
}

fn default_api_path() -> String {
    PLAYBOOKS_API_PATH.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_bot_username() -> String {
    DEFAULT_BOT_USERNAME.to_string()
}

fn default_bot_display_name() -> String {
    DEFAULT_BOT_DISPLAY_NAME.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            plugin_id: default_plugin_id(),
        }
    }
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            site_url: String::new(),
            admin_token: String::new(),
            kv_path: String::new(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_path: default_api_path(),
            timeout_secs: default_timeout(),
            failure_status: FailureStatus::default(),
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            username: default_bot_username(),
            display_name: default_bot_display_name(),
            description: String::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl WatcherConfig {
    pub fn load() -> WatcherResult<Self> {
        Self::load_from_paths(get_config_paths())
    }

    pub fn load_from_paths(paths: Vec<PathBuf>) -> WatcherResult<Self> {
        load_dotenv_files();

        let mut builder = ConfigBuilder::builder();

        for path in paths {
            if path.exists() {
                builder = builder.add_source(File::from(path).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("WATCHER")
                .separator("__")
                .try_parsing(true),
        );

        let mut watcher_config: WatcherConfig = builder.build()?.try_deserialize()?;

        if let Ok(url) = std::env::var("WATCHER_SITE_URL") {
            watcher_config.host.site_url = url;
        }

        if let Ok(token) = std::env::var("WATCHER_ADMIN_TOKEN") {
            watcher_config.host.admin_token = token;
        }

        if let Ok(level) = std::env::var("WATCHER_LOG_LEVEL") {
            watcher_config.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            watcher_config.logging.level = level;
        }

        watcher_config.validate()?;

        Ok(watcher_config)
    }

    pub fn validate(&self) -> WatcherResult<()> {
        if self.host.site_url.is_empty() {
            return Err(WatcherError::MissingConfig("host.site_url".to_string()));
        }

        if !self.host.site_url.starts_with("http://") && !self.host.site_url.starts_with("https://")
        {
            return Err(WatcherError::InvalidConfigValue {
                key: "host.site_url".to_string(),
                message: "Must start with http:// or https://".to_string(),
            });
        }

        if !self.upstream.api_path.starts_with('/') {
            return Err(WatcherError::InvalidConfigValue {
                key: "upstream.api_path".to_string(),
                message: "Must start with '/'".to_string(),
            });
        }

        if self.upstream.timeout_secs == 0 {
            return Err(WatcherError::InvalidConfigValue {
                key: "upstream.timeout_secs".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if self.bot.username.trim().is_empty() {
            return Err(WatcherError::MissingConfig("bot.username".to_string()));
        }

        if self.server.plugin_id.is_empty() || self.server.plugin_id.contains('/') {
            return Err(WatcherError::InvalidConfigValue {
                key: "server.plugin_id".to_string(),
                message: "Must be a non-empty path segment".to_string(),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        let level_lower = self.logging.level.to_lowercase();
        if !valid_levels.contains(&level_lower.as_str()) && !level_lower.contains('=') {
            return Err(WatcherError::InvalidConfigValue {
                key: "logging.level".to_string(),
                message: format!(
                    "Invalid log level '{}'. Must be one of: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        Ok(())
    }

    pub fn site_url(&self) -> &str {
        self.host.site_url.trim_end_matches('/')
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.timeout_secs)
    }

    pub fn bot_spec(&self) -> BotSpec {
        BotSpec::new(&self.bot.username, &self.bot.display_name)
            .with_description(&self.bot.description)
    }

    /// Location of the key-value store file, falling back to the data directory.
    pub fn kv_path(&self) -> PathBuf {
        if !self.host.kv_path.is_empty() {
            return PathBuf::from(&self.host.kv_path);
        }
        get_data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kv.json")
    }
}

/// Path prefix the host mounts a plugin's routes under.
pub fn plugin_route_prefix(plugin_id: &str) -> String {
    format!("/plugins/{}", plugin_id)
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join("config").join("default.toml"));
        paths.push(cwd.join("config").join("local.toml"));
        paths.push(cwd.join("playbook-watcher.toml"));
    }

    if let Some(config_dir) = get_config_dir() {
        paths.push(config_dir.join("config.toml"));
    }

    paths
}

fn load_dotenv_files() {
    let mut env_paths = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        env_paths.push(cwd.join(".env"));
        env_paths.push(cwd.join(".env.local"));
    }

    if let Some(config_dir) = get_config_dir() {
        env_paths.push(config_dir.join(".env"));
    }

    for path in env_paths {
        if path.exists() {
            let _ = dotenvy::from_path(&path);
        }
    }
}

pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("playbook-watcher"))
}

pub fn get_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("playbook-watcher"))
}
