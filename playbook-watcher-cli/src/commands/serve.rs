use anyhow::Result;
use colored::Colorize;
use playbook_watcher_core::{DynPlugin, Plugin, WatcherConfig, WatcherServer};
use std::sync::Arc;
use tracing::{info, warn};

use super::build_plugin;

pub async fn cmd_serve(config: WatcherConfig, bind: Option<String>) -> Result<()> {
    let plugin: DynPlugin = Arc::new(build_plugin(&config).await?);
    plugin.on_activate().await?;

    let bind_address = bind.unwrap_or_else(|| config.server.bind_address.clone());
    let mut server =
        WatcherServer::start(&bind_address, &config.server.plugin_id, Arc::clone(&plugin)).await?;

    println!("{}", "Playbook Watcher is running".green().bold());
    println!("  {} {}/hello", "→".blue(), server.plugin_url());
    println!("  {} {}/runs", "→".blue(), server.plugin_url());
    println!("  {} {}/health", "→".blue(), server.url());
    println!();
    println!("{}", "Press Ctrl-C to stop.".dimmed());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    server.stop();
    server.wait().await?;

    if let Err(e) = plugin.on_deactivate().await {
        warn!("Deactivation failed: {}", e);
    }

    Ok(())
}
