//! Host collaborators the plugin depends on.
//!
//! The host exposes two narrow surfaces: [`HostApi`] for bot management and
//! configuration, and [`KvStore`] for plugin-scoped persistence. Both are
//! object safe so the plugin can hold them as `Arc<dyn ...>`.

mod kv;
mod rest;

use async_trait::async_trait;

use crate::error::WatcherResult;
use crate::models::{BotSpec, HostConfig, UserAccessToken};

pub use kv::{get_json, set_json, FileKvStore, InMemoryKvStore};
pub use rest::RestHostApi;

#[async_trait]
pub trait HostApi: Send + Sync {
    /// Returns the id of the bot named by `bot`, creating it if needed.
    async fn ensure_bot(&self, bot: &BotSpec) -> WatcherResult<String>;

    async fn create_access_token(
        &self,
        user_id: &str,
        description: &str,
    ) -> WatcherResult<UserAccessToken>;

    fn get_config(&self) -> HostConfig;
}

#[async_trait]
pub trait KvStore: Send + Sync {
    /// Returns `None` when the key has never been set.
    async fn get(&self, key: &str) -> WatcherResult<Option<Vec<u8>>>;

    async fn set(&self, key: &str, value: Vec<u8>) -> WatcherResult<()>;
}

pub type DynHostApi = std::sync::Arc<dyn HostApi>;
pub type DynKvStore = std::sync::Arc<dyn KvStore>;
