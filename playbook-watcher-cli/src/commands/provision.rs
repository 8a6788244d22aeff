use anyhow::Result;
use colored::Colorize;
use playbook_watcher_core::{bot_token_key, BotProvisioner, WatcherConfig};

use super::build_host;

pub async fn cmd_provision(config: WatcherConfig) -> Result<()> {
    let (host, kv) = build_host(&config).await?;
    let provisioner = BotProvisioner::new(host, kv, config.bot_spec());

    println!("{}", "Provisioning bot account...".cyan().bold());
    println!();
    println!("  {} Site URL: {}", "→".blue(), config.site_url());
    println!("  {} Bot:      {}", "→".blue(), provisioner.bot().username);

    let credential = provisioner.ensure_bot_ready().await?;

    println!();
    println!("  {:<10} {}", "Bot ID:".bold(), credential.bot_id);
    println!("  {:<10} {}", "Token:".bold(), credential.masked_token());
    println!(
        "  {:<10} {}",
        "KV key:".bold(),
        bot_token_key(&credential.bot_id).dimmed()
    );
    println!();
    println!("{} {}", "✓".green().bold(), "Bot is ready".green());

    Ok(())
}
