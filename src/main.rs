//! Flatter - Flatpak repositories built in CI
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use flatter::action::{ActionContext, GithubContext};
use flatter::cli::{Cli, Commands};
use flatter::config::{Config, ConfigManager};
use flatter::error::FlatterResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> FlatterResult<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging: 0 = info, 1 = debug, 2+ = trace
    let filter = match cli.verbose {
        0 => EnvFilter::new("flatter=info"),
        1 => EnvFilter::new("flatter=debug"),
        _ => EnvFilter::new("flatter=trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    // Key command doesn't need config loading
    if let Commands::Key(args) = cli.command {
        flatter::cli::commands::key(args).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let ctx = GithubContext::from_env();

    let manager = cli.config.clone().map(ConfigManager::with_path);
    let config = match &manager {
        Some(manager) => manager.load().await?,
        None => {
            debug!("Reading configuration from action inputs");
            Config::from_context(&ctx)?
        }
    };

    // Dispatch to command
    match cli.command {
        Commands::Key(_) => unreachable!("Key handled above"),
        Commands::Pre => flatter::cli::commands::pre(&ctx, &config).await?,
        Commands::Main => flatter::cli::commands::build(&ctx, &config).await?,
        Commands::Post => flatter::cli::commands::post(&ctx, &config).await?,
        Commands::Run => flatter::cli::commands::run(&ctx, &config).await?,
        Commands::Config(args) => {
            let path = manager.as_ref().map(ConfigManager::path);
            flatter::cli::commands::config(args, &config, path)?
        }
    }

    if ctx.is_failed() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
