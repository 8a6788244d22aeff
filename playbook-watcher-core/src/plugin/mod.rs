//! Plugin lifecycle.
//!
//! [`PlaybookWatcherPlugin`] is constructed once by the host and shared behind
//! an `Arc`. Activation provisions the bot, builds the upstream client and the
//! router; after that the activation is immutable and every request is served
//! from a snapshot of it, so `serve_http` can run concurrently without locking
//! beyond a brief read.

mod configuration;
mod types;

use async_trait::async_trait;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::collections::VecDeque;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tower::ServiceExt;
use tracing::{error, info, warn};

use crate::config::{WatcherConfig, PLAYBOOKS_API_PATH};
use crate::error::{WatcherError, WatcherResult};
use crate::host::{DynHostApi, DynKvStore};
use crate::models::{BotCredential, BotSpec};
use crate::provisioner::BotProvisioner;
use crate::routes::{build_router, RouterState};
use crate::upstream::UpstreamClient;

pub use configuration::{ConfigurationStore, PluginSettings};
pub use types::{PluginEvent, PluginInfo, PluginState};

pub const PLUGIN_ID: &str = "playbook-watcher";

/// Oldest lifecycle events are dropped past this many.
pub const MAX_EVENTS: usize = 64;

#[async_trait]
pub trait Plugin: Send + Sync {
    fn info(&self) -> &PluginInfo;

    async fn on_activate(&self) -> WatcherResult<()>;

    async fn on_deactivate(&self) -> WatcherResult<()>;

    async fn state(&self) -> PluginState;

    fn on_configuration_change(&self, settings: PluginSettings) -> WatcherResult<()>;

    /// Handles one request whose path is relative to the plugin prefix.
    async fn serve_http(&self, request: Request) -> Response;
}

pub type DynPlugin = Arc<dyn Plugin>;

/// Everything produced by a successful activation.
pub struct Activation {
    pub credential: BotCredential,
    pub upstream: Arc<UpstreamClient>,
    pub router: Router,
}

struct Runtime {
    state: PluginState,
    activation: Option<Arc<Activation>>,
}

pub struct PlaybookWatcherPlugin {
    info: PluginInfo,
    host: DynHostApi,
    kv: DynKvStore,
    bot: BotSpec,
    api_path: String,
    timeout: Duration,
    settings: Arc<ConfigurationStore>,
    runtime: RwLock<Runtime>,
    events: RwLock<VecDeque<PluginEvent>>,
}

impl PlaybookWatcherPlugin {
    pub fn new(host: DynHostApi, kv: DynKvStore) -> Self {
        Self {
            info: PluginInfo::new(PLUGIN_ID, env!("CARGO_PKG_VERSION"))
                .with_name("Playbook Watcher")
                .with_description("Relays playbook runs through a dedicated bot account"),
            host,
            kv,
            bot: BotSpec::default(),
            api_path: PLAYBOOKS_API_PATH.to_string(),
            timeout: Duration::from_secs(30),
            settings: Arc::new(ConfigurationStore::default()),
            runtime: RwLock::new(Runtime {
                state: PluginState::Inactive,
                activation: None,
            }),
            events: RwLock::new(VecDeque::with_capacity(MAX_EVENTS)),
        }
    }

    pub fn from_config(config: &WatcherConfig, host: DynHostApi, kv: DynKvStore) -> Self {
        let mut plugin = Self::new(host, kv)
            .with_bot(config.bot_spec())
            .with_api_path(&config.upstream.api_path)
            .with_timeout(config.upstream_timeout())
            .with_settings(PluginSettings::from_config(config));
        plugin.info.id = config.server.plugin_id.clone();
        plugin
    }

    pub fn with_bot(mut self, bot: BotSpec) -> Self {
        self.bot = bot;
        self
    }

    pub fn with_api_path(mut self, api_path: impl Into<String>) -> Self {
        self.api_path = api_path.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_settings(self, settings: PluginSettings) -> Self {
        self.settings.set(settings);
        self
    }

    pub fn settings(&self) -> Arc<PluginSettings> {
        self.settings.get()
    }

    fn runtime(&self) -> RwLockReadGuard<'_, Runtime> {
        self.runtime.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn runtime_mut(&self) -> RwLockWriteGuard<'_, Runtime> {
        self.runtime.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub async fn activation(&self) -> Option<Arc<Activation>> {
        self.runtime().activation.clone()
    }

    pub async fn credential(&self) -> Option<BotCredential> {
        self.activation().await.map(|a| a.credential.clone())
    }

    pub async fn upstream(&self) -> Option<Arc<UpstreamClient>> {
        self.activation().await.map(|a| Arc::clone(&a.upstream))
    }

    /// Recorded lifecycle events, oldest first.
    pub fn events(&self) -> Vec<PluginEvent> {
        let events = self.events.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        events.iter().cloned().collect()
    }

    fn record(&self, event: PluginEvent) {
        let mut events = self.events.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        if events.len() == MAX_EVENTS {
            events.pop_front();
        }
        events.push_back(event);
    }

    async fn initialize_api(&self) -> WatcherResult<Activation> {
        let provisioner = BotProvisioner::new(
            Arc::clone(&self.host),
            Arc::clone(&self.kv),
            self.bot.clone(),
        );
        let credential = provisioner.ensure_bot_ready().await?;

        let site_url = self
            .host
            .get_config()
            .site_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| WatcherError::MissingConfig("host.site_url".to_string()))?;

        let upstream = Arc::new(UpstreamClient::with_api_path(
            &site_url,
            &self.api_path,
            credential.token.clone(),
            self.timeout,
        )?);

        let router = build_router(RouterState {
            upstream: Arc::clone(&upstream),
            settings: Arc::clone(&self.settings),
        });

        Ok(Activation {
            credential,
            upstream,
            router,
        })
    }
}

/// Resets an in-flight activation to `Inactive` when dropped while armed.
struct ActivationGuard<'a> {
    plugin: &'a PlaybookWatcherPlugin,
    armed: bool,
}

impl<'a> ActivationGuard<'a> {
    fn new(plugin: &'a PlaybookWatcherPlugin) -> Self {
        Self {
            plugin,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ActivationGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut runtime = self.plugin.runtime_mut();
        if runtime.state == PluginState::Activating {
            runtime.activation = None;
            runtime.state = PluginState::Inactive;
            warn!(
                plugin_id = %self.plugin.info.id,
                "Activation did not complete, plugin left inactive"
            );
        }
    }
}

#[async_trait]
impl Plugin for PlaybookWatcherPlugin {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    async fn on_activate(&self) -> WatcherResult<()> {
        {
            let mut runtime = self.runtime_mut();
            if !runtime.state.can_activate() {
                return Err(WatcherError::PluginAlreadyActive(self.info.id.clone()));
            }
            runtime.state = PluginState::Activating;
        }
        let guard = ActivationGuard::new(self);

        info!(plugin_id = %self.info.id, bot = %self.bot.username, "Activating plugin");

        match self.initialize_api().await {
            Ok(activation) => {
                let bot_id = activation.credential.bot_id.clone();
                let api_url = activation.upstream.api_url().to_string();
                {
                    let mut runtime = self.runtime_mut();
                    runtime.activation = Some(Arc::new(activation));
                    runtime.state = PluginState::Active;
                }
                guard.disarm();
                self.record(PluginEvent::activated(&self.info.id, &bot_id));
                info!(
                    plugin_id = %self.info.id,
                    bot_id = %bot_id,
                    api_url = %api_url,
                    "Plugin activated"
                );
                Ok(())
            }
            Err(e) => {
                drop(guard);
                self.record(PluginEvent::activation_failed(&self.info.id, e.to_string()));
                error!(
                    plugin_id = %self.info.id,
                    error_code = e.error_code(),
                    "Plugin activation failed: {}", e
                );
                Err(e)
            }
        }
    }

    async fn on_deactivate(&self) -> WatcherResult<()> {
        {
            let mut runtime = self.runtime_mut();
            if runtime.state != PluginState::Active {
                return Err(WatcherError::PluginNotActive(self.info.id.clone()));
            }
            runtime.activation = None;
            runtime.state = PluginState::Deactivated;
        }

        self.record(PluginEvent::deactivated(&self.info.id));
        info!(plugin_id = %self.info.id, "Plugin deactivated");
        Ok(())
    }

    async fn state(&self) -> PluginState {
        self.runtime().state
    }

    fn on_configuration_change(&self, settings: PluginSettings) -> WatcherResult<()> {
        info!(
            plugin_id = %self.info.id,
            failure_status = ?settings.failure_status,
            "Plugin configuration changed"
        );
        self.settings.set(settings);
        self.record(PluginEvent::configuration_changed(&self.info.id));
        Ok(())
    }

    async fn serve_http(&self, request: Request) -> Response {
        let Some(activation) = self.activation().await else {
            warn!(plugin_id = %self.info.id, uri = %request.uri(), "Request for inactive plugin");
            return (StatusCode::SERVICE_UNAVAILABLE, "plugin is not active").into_response();
        };

        match activation.router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }
}
