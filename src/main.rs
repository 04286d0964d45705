//! shellcache - offline app-shell cache worker
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use shellcache::cli::commands;
use shellcache::cli::{Cli, Commands};
use shellcache::config::{Config, ConfigManager};
use shellcache::error::{ShellcacheError, ShellcacheResult};
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
            if e.is_retryable() {
                eprintln!(
                    "{} the failure looks transient; try again once the network is back",
                    style("Retry:").dim()
                );
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> ShellcacheResult<()> {
    let cli = Cli::parse();

    // Completions need neither config nor logging
    if let Commands::Completions { shell } = cli.command {
        return commands::completions(shell);
    }

    let manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    let local_config_path = if cli.no_local {
        None
    } else {
        let cwd = std::env::current_dir()
            .map_err(|e| ShellcacheError::io("getting current directory", e))?;
        ConfigManager::find_local_config(&cwd)
    };

    let config = manager.load_merged(local_config_path.as_deref()).await?;
    init_logging(cli.verbose, &config);

    if let Some(path) = &local_config_path {
        debug!("Merged local config: {}", path.display());
    }
    debug!("Using config {}", manager.path().display());

    if !cli.ephemeral {
        ConfigManager::ensure_state_dirs(&config).await?;
    }

    let ephemeral = cli.ephemeral;
    match cli.command {
        Commands::Completions { .. } => unreachable!("completions handled above"),
        Commands::Install => commands::install(&config, ephemeral).await,
        Commands::Activate => commands::activate(&config, ephemeral).await,
        Commands::Fetch(args) => commands::fetch(args, &config, ephemeral).await,
        Commands::Status => commands::status(&config, ephemeral).await,
        Commands::Cache(args) => commands::cache(args, &config, ephemeral).await,
        Commands::Config(args) => commands::config(args, &config, &manager).await,
    }
}

/// 0 = warn, 1 = info, 2+ = debug; `RUST_LOG` wins when set
fn init_logging(verbose: u8, config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("shellcache=warn"),
        1 => EnvFilter::new("shellcache=info"),
        _ => EnvFilter::new("shellcache=debug"),
    });

    if config.general.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
            .init();
    }
}
