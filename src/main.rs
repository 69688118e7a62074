mod cmd;
mod config;
mod context;
mod domain;
mod error;
mod infra;
mod services;
mod workflow;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cmd::config::{self as config_cmd, ConfigArgs};
use crate::cmd::sprint::{self, PhaseArgs};
use crate::config::AppConfig;
use crate::context::AppContext;
use crate::domain::ticket::Phase;
use crate::error::AppResult;
use crate::infra::jira::JiraClient;

#[derive(Parser)]
#[command(
    name = "sprintdeck",
    author,
    version,
    about = "Provision sprint closing and planning tickets in Jira"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the sprint closing backlog and operate on it.
    Closing(PhaseArgs),
    /// Build the sprint planning backlog and operate on it.
    Planning(PhaseArgs),
    /// Manage CLI configuration.
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "sprintdeck=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> AppResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Config(args) => {
            config_cmd::run(args.command)?;
            Ok(())
        }
        Commands::Closing(args) => run_phase(Phase::Closing, args).await,
        Commands::Planning(args) => run_phase(Phase::Planning, args).await,
    }
}

async fn run_phase(phase: Phase, args: PhaseArgs) -> AppResult<()> {
    let config = AppConfig::load()?;

    if config.jira.domain.is_none() {
        eprintln!("Warning: Jira domain not configured; tracker operations will fail.");
    }
    if config.jira.username.is_none() || config.jira.password.is_none() {
        eprintln!("Warning: Jira credentials not configured; tracker operations will fail.");
    }

    let issue_tracker = Arc::new(JiraClient::new(&config.jira));
    let context = AppContext::new(config, issue_tracker);

    sprint::run(&context, phase, args).await
}
