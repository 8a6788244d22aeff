use anyhow::Result;
use playbook_watcher_core::{mask_secret, WatcherConfig};

pub fn cmd_config(config: &WatcherConfig, show_secrets: bool) -> Result<()> {
    print!("{}", render_config(config, show_secrets)?);
    Ok(())
}

fn render_config(config: &WatcherConfig, show_secrets: bool) -> Result<String> {
    let mut shown = config.clone();
    if !show_secrets && !shown.host.admin_token.is_empty() {
        shown.host.admin_token = mask_secret(&shown.host.admin_token);
    }
    Ok(toml::to_string_pretty(&shown)?)
}
