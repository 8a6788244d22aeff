//! Stand-in for the host's HTTP surface.
//!
//! Requests under `/plugins/<plugin_id>` have the prefix stripped and are
//! forwarded to [`Plugin::serve_http`], which is how the host dispatches to a
//! plugin's router.

use axum::{extract::Request, routing::get, Json, Router};
use std::convert::Infallible;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::plugin_route_prefix;
use crate::error::{WatcherError, WatcherResult};
use crate::plugin::DynPlugin;

pub struct WatcherServer {
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
    local_addr: SocketAddr,
    plugin_id: String,
}

pub fn build_host_router(plugin_id: &str, plugin: DynPlugin) -> Router {
    let health_plugin = plugin.clone();
    let forward = tower::service_fn(move |request: Request| {
        let plugin = plugin.clone();
        async move { Ok::<_, Infallible>(plugin.serve_http(request).await) }
    });

    Router::new()
        .route(
            "/health",
            get(move || {
                let plugin = health_plugin.clone();
                async move {
                    Json(serde_json::json!({
                        "status": "ok",
                        "plugin": plugin.info().id,
                        "state": plugin.state().await.to_string(),
                    }))
                }
            }),
        )
        .nest_service(&plugin_route_prefix(plugin_id), forward)
        .layer(TraceLayer::new_for_http())
}

impl WatcherServer {
    pub async fn start(
        bind_address: &str,
        plugin_id: &str,
        plugin: DynPlugin,
    ) -> WatcherResult<Self> {
        let app = build_host_router(plugin_id, plugin);

        let listener = TcpListener::bind(bind_address)
            .await
            .map_err(|e| WatcherError::ServerBindFailed {
                address: bind_address.to_string(),
                message: e.to_string(),
            })?;
        let local_addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        });

        info!(address = %local_addr, plugin_id = %plugin_id, "Server listening");

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
            local_addr,
            plugin_id: plugin_id.to_string(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    /// Base URL of the plugin's routes, e.g. `http://127.0.0.1:8065/plugins/playbook-watcher`.
    pub fn plugin_url(&self) -> String {
        format!("{}{}", self.url(), plugin_route_prefix(&self.plugin_id))
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Waits for the serve task to finish, which happens after [`stop`](Self::stop).
    pub async fn wait(&mut self) -> WatcherResult<()> {
        if let Some(handle) = self.handle.take() {
            handle
                .await
                .map_err(|e| WatcherError::internal(format!("Server task failed: {}", e)))?;
        }
        Ok(())
    }
}

impl Drop for WatcherServer {
    fn drop(&mut self) {
        self.stop();
    }
}
