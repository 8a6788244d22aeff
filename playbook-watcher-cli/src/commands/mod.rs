mod config;
mod provision;
mod runs;
mod serve;

use anyhow::Result;
use playbook_watcher_core::{
    DynHostApi, DynKvStore, FileKvStore, PlaybookWatcherPlugin, RestHostApi, WatcherConfig,
    WatcherError,
};
use std::sync::Arc;
use tracing::debug;

pub use config::cmd_config;
pub use provision::cmd_provision;
pub use runs::{cmd_runs, RunsFormat};
pub use serve::cmd_serve;

/// Host adapters backed by the chat server REST API and the on-disk kv file.
pub(crate) async fn build_host(config: &WatcherConfig) -> Result<(DynHostApi, DynKvStore)> {
    if config.host.admin_token.is_empty() {
        return Err(WatcherError::MissingConfig("host.admin_token".to_string()).into());
    }

    let host = RestHostApi::new(
        config.site_url(),
        &config.host.admin_token,
        config.upstream_timeout(),
    )?;

    let kv_path = config.kv_path();
    debug!(path = %kv_path.display(), "Opening kv store");
    let kv = FileKvStore::open(kv_path).await?;

    Ok((Arc::new(host), Arc::new(kv)))
}

pub(crate) async fn build_plugin(config: &WatcherConfig) -> Result<PlaybookWatcherPlugin> {
    let (host, kv) = build_host(config).await?;
    Ok(PlaybookWatcherPlugin::from_config(config, host, kv))
}
