//! CLI argument definitions using clap derive

use crate::net::Method;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// shellcache - offline app-shell cache worker
///
/// Pre-caches an app's static assets under a named generation, purges old
/// generations on activation and answers requests cache-first.
#[derive(Parser, Debug)]
#[command(name = "shellcache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "SHELLCACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip local .shellcache.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,

    /// Use an in-memory store that is discarded on exit
    #[arg(long, global = true)]
    pub ephemeral: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install the configured worker version and pre-cache its manifest
    Install,

    /// Activate the waiting worker and purge old generations
    Activate,

    /// Send one request through the active worker
    Fetch(FetchArgs),

    /// Show worker state and stored generations
    Status,

    /// Inspect or clear the cache store
    Cache(CacheArgs),

    /// Show or edit configuration
    Config(ConfigArgs),

    /// Print shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// Arguments for the fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// URL to request (relative URLs resolve against the scope)
    pub url: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: Method,

    /// Request body to send
    #[arg(short, long)]
    pub data: Option<String>,

    /// Write the body to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// URL of the page issuing the request (defaults to the scope)
    #[arg(long)]
    pub client_url: Option<String>,
}

/// Output format for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// One entry per line
    Plain,
}

#[derive(Parser, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List generations and their entries
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,

        /// Only this generation
        #[arg(short, long)]
        generation: Option<String>,
    },

    /// Delete every generation and forget the registration
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., worker.generation)
        key: String,
        /// Value to set; lists are comma-separated
        value: String,
        /// Write to project-local .shellcache.toml instead of global config
        #[arg(long)]
        local: bool,
    },
}
