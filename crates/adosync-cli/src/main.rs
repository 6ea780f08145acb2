use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "adosync")]
#[command(about = "Sync Azure DevOps builds, test runs, and coverage into Port")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one full sync pass (the default).
    Sync,
    /// List Port blueprints and check the configured identifiers against them.
    Blueprints,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    match run(cli.command.unwrap_or(Commands::Sync)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("aborted: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Sync => {
            let summary = adosync_sync::run_sync_once_from_env().await?;
            println!(
                "sync complete: run_id={} projects={} builds={} test_runs={} test_results={} coverage_rows={} upserts_failed={}",
                summary.run_id,
                summary.projects,
                summary.builds,
                summary.test_runs,
                summary.test_results,
                summary.coverage_rows,
                summary.upserts_failed
            );
        }
        Commands::Blueprints => {
            let report = adosync_sync::list_blueprints_from_env().await?;
            for blueprint in &report.available {
                println!(
                    "{} ({})",
                    blueprint.identifier,
                    blueprint.title.as_deref().unwrap_or("-")
                );
            }
            for check in &report.checks {
                let status = if check.present { "ok" } else { "missing" };
                println!("{:<12} {:<28} {status}", check.role, check.identifier);
            }
        }
    }

    Ok(())
}
