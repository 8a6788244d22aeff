use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use playbook_watcher_core::{Plugin, PlaybookRun, WatcherConfig};

use super::build_plugin;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunsFormat {
    Table,
    Json,
}

pub async fn cmd_runs(config: WatcherConfig, format: RunsFormat) -> Result<()> {
    let plugin = build_plugin(&config).await?;
    plugin.on_activate().await?;

    let upstream = plugin
        .upstream()
        .await
        .ok_or_else(|| anyhow::anyhow!("plugin has no upstream client after activation"))?;
    let runs = upstream.list_runs().await?;

    if format == RunsFormat::Json {
        println!("{}", serde_json::to_string_pretty(&runs.items)?);
        return Ok(());
    }

    if runs.is_empty() {
        println!("{}", "No playbook runs found.".yellow());
        return Ok(());
    }

    println!("{}", "Playbook Runs".cyan().bold());
    println!("{}", "═".repeat(60).dimmed());
    println!();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").fg(comfy_table::Color::Cyan),
            Cell::new("Name").fg(comfy_table::Color::Cyan),
            Cell::new("Status").fg(comfy_table::Color::Cyan),
        ]);

    for run in &runs.items {
        table.add_row(run_row(run));
    }

    println!("{table}");
    println!();
    println!(
        "  {} of {} run(s){}",
        runs.len(),
        runs.total_count,
        if runs.has_more { ", more available" } else { "" }
    );

    Ok(())
}

fn run_row(run: &PlaybookRun) -> Vec<Cell> {
    vec![
        Cell::new(run.id().unwrap_or("-")),
        Cell::new(run.name().unwrap_or("-")),
        Cell::new(run.current_status().unwrap_or("-")),
    ]
}
