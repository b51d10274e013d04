//! crashsync - Crashlytics to Wrike/Slack reconciliation
//!
//! Meant to run once a day from CI. Inputs can come from flags or from the
//! GitHub Actions `INPUT_*` environment.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;

#[derive(Parser)]
#[command(name = "crashsync")]
#[command(about = "Sync daily Crashlytics crashes into Wrike tasks and a Slack summary")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the day's crashes, reconcile tasks and notify Slack
    Run {
        /// Path to the config file (JSON or TOML)
        #[arg(short, long, env = "INPUT_CONFIG_PATH")]
        config: Option<PathBuf>,

        /// Day to process (YYYYMMDD or YYYY-MM-DD); defaults to the configured offset from today
        #[arg(short = 'd', long, env = "INPUT_TARGET_DATE")]
        target_date: Option<String>,

        /// Show what would change without writing tasks or posting to Slack
        #[arg(long)]
        dry_run: bool,
    },

    /// Show or generate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the expanded configuration with secrets masked
    Show {
        /// Path to the config file
        #[arg(short, long, env = "INPUT_CONFIG_PATH")]
        config: Option<PathBuf>,
    },
    /// Print an example configuration
    Example,
    /// Print the default config location
    Path,
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run {
            config,
            target_date,
            dry_run,
        } => commands::run(config, target_date, dry_run, cli.json).await,
        Commands::Config { command } => match command {
            Some(ConfigCommands::Show { config }) => commands::config_show(config, cli.json),
            Some(ConfigCommands::Example) => commands::config_example(),
            Some(ConfigCommands::Path) => commands::config_path(),
            None => commands::config_show(None, cli.json),
        },
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            commands::report_failure(&err);
            ExitCode::FAILURE
        }
    }
}
