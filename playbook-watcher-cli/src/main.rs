use clap::{Parser, Subcommand};
use colored::Colorize;
use playbook_watcher_core::{CliErrorDisplay, LoggingConfig, WatcherConfig, WatcherError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

use commands::{cmd_config, cmd_provision, cmd_runs, cmd_serve, RunsFormat};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = env!("CARGO_PKG_NAME");

#[derive(Parser)]
#[command(name = "playbook-watcher")]
#[command(version = VERSION)]
#[command(about = "Playbook Watcher - relay playbook runs through a dedicated bot account")]
#[command(long_about = r#"
Playbook Watcher provisions a bot account on the chat server, keeps an access
token for it in a local key-value store, and exposes the playbook runs visible
to that bot over HTTP.

Use 'playbook-watcher provision' to create the bot and its token, then
'playbook-watcher serve' to expose /plugins/<id>/hello and /plugins/<id>/runs.
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[arg(short, long, global = true, help = "Path to a TOML configuration file")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Activate the plugin and serve its routes until Ctrl-C")]
    Serve {
        #[arg(short, long, help = "Override server.bind_address")]
        bind: Option<String>,
    },

    #[command(about = "Ensure the bot account and its access token exist")]
    Provision,

    #[command(about = "Fetch playbook runs once as the bot")]
    Runs {
        #[arg(short, long, value_enum, default_value_t = RunsFormat::Table)]
        format: RunsFormat,
    },

    #[command(about = "Print the effective configuration as TOML")]
    Config {
        #[arg(long, help = "Print the admin token unmasked")]
        show_secrets: bool,
    },

    #[command(about = "Show version information")]
    Version {
        #[arg(short, long)]
        detailed: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<WatcherError>() {
                Some(err) => eprint!("{}: {}", "Error".red().bold(), CliErrorDisplay::new(err)),
                None => eprintln!("{}: {}", "Error".red().bold(), e),
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool, logging: Option<&LoggingConfig>) {
    let default_level = match (verbose, logging) {
        (true, _) => "debug".to_string(),
        (false, Some(l)) => l.level.clone(),
        (false, None) => "warn".to_string(),
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_level));

    let json = logging.map(|l| l.json_format).unwrap_or(false);
    let registry = tracing_subscriber::registry().with(filter);

    let result = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()
    };

    if let Err(e) = result {
        eprintln!("{}: failed to initialize logging: {}", "Warning".yellow(), e);
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<WatcherConfig> {
    let config = match path {
        Some(p) => {
            if !p.exists() {
                anyhow::bail!("configuration file not found: {}", p.display());
            }
            WatcherConfig::load_from_paths(vec![p])?
        }
        None => WatcherConfig::load()?,
    };
    Ok(config)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Version { detailed } = cli.command {
        init_logging(cli.verbose, None);
        return cmd_version(detailed);
    }

    let config = load_config(cli.config)?;
    init_logging(cli.verbose, Some(&config.logging));

    match cli.command {
        Commands::Serve { bind } => cmd_serve(config, bind).await,
        Commands::Provision => cmd_provision(config).await,
        Commands::Runs { format } => cmd_runs(config, format).await,
        Commands::Config { show_secrets } => cmd_config(&config, show_secrets),
        Commands::Version { .. } => Ok(()),
    }
}

fn cmd_version(detailed: bool) -> anyhow::Result<()> {
    if detailed {
        println!("{}", "Playbook Watcher Version Information".cyan().bold());
        println!("{}", "═".repeat(40).dimmed());
        println!("  {:<15} {}", "Version:".bold(), VERSION);
        println!("  {:<15} {}", "Name:".bold(), NAME);
        println!("  {:<15} Apache-2.0", "License:".bold());
        println!();
        println!("  {}", "Routes:".bold());
        println!("    /plugins/<id>/hello");
        println!("    /plugins/<id>/runs");
        println!();
        println!("  {}", "Build Information:".bold());
        println!("    Rust Edition: 2021");
        #[cfg(debug_assertions)]
        println!("    Build:        Debug");
        #[cfg(not(debug_assertions))]
        println!("    Build:        Release");
    } else {
        println!("playbook-watcher {}", VERSION);
    }

    Ok(())
}
