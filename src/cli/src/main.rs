//! Jobboard CLI - browse and control jobs served by a jobboard server.
//!
//! Provides commands for job listing, job detail, health, and configuration.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{config, health, jobs};
use output::OutputFormat;

/// Jobboard - job listing dashboard CLI
#[derive(Parser)]
#[command(
    name = "jobboard",
    version,
    about = "Jobboard - job listing with live flow-service data",
    long_about = "CLI tool for listing jobs, inspecting their live data, and stopping them through a jobboard server.",
    propagate_version = true
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// API server URL
    #[arg(long, global = true, env = "JOBBOARD_API_URL")]
    api_url: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Job queries and actions
    #[command(subcommand)]
    Jobs(jobs::JobCommands),

    /// Check server health
    Health(health::HealthArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let api_url = cli
        .api_url
        .clone()
        .or_else(config::load_api_url)
        .unwrap_or_else(|| "http://localhost:8080".to_string());

    let client = client::ApiClient::new(&api_url)?;
    let format = cli.output;

    let result = match cli.command {
        Commands::Jobs(cmd) => jobs::execute(cmd, &client, format).await,
        Commands::Health(args) => health::execute(args, &client, format).await,
        Commands::Config(cmd) => config::execute(cmd, format).await,
    };

    if let Err(e) = result {
        output::notice(output::Notice::Error, &format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_list_with_options() {
        let cli = Cli::try_parse_from([
            "jobboard", "-o", "json", "jobs", "list", "--page", "2", "--size", "5", "--order", "asc",
        ])
        .unwrap();
        assert!(matches!(cli.output, OutputFormat::Json));
        assert!(matches!(
            cli.command,
            Commands::Jobs(jobs::JobCommands::List {
                page: 2,
                size: Some(5),
                order: jobs::SortOrder::Asc,
                ..
            })
        ));
    }

    #[test]
    fn test_party_id_must_be_numeric() {
        assert!(Cli::try_parse_from(["jobboard", "jobs", "get", "j1", "guest", "ten"]).is_err());
    }
}
