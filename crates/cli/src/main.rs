//! Volition CLI: the main entry point.
//!
//! Commands:
//! - `init`     Write a default config and create the state directory
//! - `run`      Run the decision loop for a number of ticks
//! - `status`   Show loop state, affect and pending work
//! - `history`  Show recent decisions
//! - `catalog`  List the available actions
//! - `reset`    Delete persisted artifacts or bandit arms
//! - `config`   Validate, show or locate the configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "volition",
    about = "Volition: an autonomous agent's action-selection and learning loop",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ~/.volition/config.toml)
    #[arg(short, long, global = true, env = "VOLITION_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file and create the state directory
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Run the decision loop
    Run {
        /// Number of ticks to run
        #[arg(short = 'n', long, default_value_t = 1)]
        ticks: u64,

        /// Seed the random source for a reproducible run
        #[arg(long)]
        seed: Option<u64>,

        /// Ignore any configured text generator
        #[arg(long)]
        offline: bool,
    },

    /// Show loop state
    Status,

    /// Show recent decisions
    History {
        /// How many entries to show
        #[arg(short, long, default_value_t = 10)]
        last: usize,
    },

    /// List the action catalog
    Catalog,

    /// Delete persisted state
    Reset {
        /// Artifact to delete, or "all"
        artifact: String,

        /// With the `bandit` artifact, forget only this action's arm
        #[arg(long)]
        action: Option<String>,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Parse and validate the config file
    Validate,
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Init { force } => commands::init::run(config_path, force).await?,
        Commands::Run { ticks, seed, offline } => commands::run::run(config_path, ticks, seed, offline).await?,
        Commands::Status => commands::status::run(config_path).await?,
        Commands::History { last } => commands::history::run(config_path, last).await?,
        Commands::Catalog => commands::catalog::run(config_path).await?,
        Commands::Reset { artifact, action } => commands::reset::run(config_path, &artifact, action.as_deref()).await?,
        Commands::Config(ConfigCommand::Validate) => commands::config_cmd::validate(config_path).await?,
        Commands::Config(ConfigCommand::Show) => commands::config_cmd::show(config_path).await?,
        Commands::Config(ConfigCommand::Path) => commands::config_cmd::path(config_path).await?,
    }

    Ok(())
}
