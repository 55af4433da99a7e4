//! geocache - cached reverse geocoding
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use geocache::cli::{Cli, Commands};
use geocache::config::ConfigManager;
use geocache::error::GeocacheResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> GeocacheResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    // 0 = warn (spinners only), 1 = info, 2+ = debug
    let verbosity = cli.verbose.max(u8::from(config.general.verbose));
    let filter = match verbosity {
        0 => EnvFilter::new("geocache=warn"),
        1 => EnvFilter::new("geocache=info"),
        _ => EnvFilter::new("geocache=debug"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr);
    if config.general.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    debug!("Using config {}", config_manager.path().display());

    match cli.command {
        Commands::Resolve(args) => geocache::cli::commands::resolve(args, &config).await,
        Commands::Batch(args) => geocache::cli::commands::batch(args, &config).await,
        Commands::Cache(args) => geocache::cli::commands::cache(args, &config).await,
        Commands::Config(args) => {
            geocache::cli::commands::config(args, &config_manager, &config).await
        }
    }
}
