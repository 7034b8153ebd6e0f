//! tabtrain - Main Entry Point
//!
//! Runs the web server by default, or one of the CLI commands.

use clap::Parser;
use tabtrain::cli::{cmd_columns, cmd_features, cmd_predict, cmd_serve, cmd_train, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tabtrain=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Train { data, target, models_dir, delimiter }) => {
            cmd_train(&data, &target, &models_dir, &delimiter)?;
        }
        Some(Commands::Features { models_dir }) => {
            cmd_features(&models_dir)?;
        }
        Some(Commands::Predict { models_dir, model, fields, input }) => {
            cmd_predict(&models_dir, model.as_deref(), &fields, input.as_deref())?;
        }
        Some(Commands::Columns { data, delimiter }) => {
            cmd_columns(&data, &delimiter)?;
        }
        Some(Commands::Serve { port, host, models_dir }) => {
            cmd_serve(&host, port, &models_dir).await?;
        }
        None => {
            // Default: serve with environment configuration
            tabtrain::server::run_server(tabtrain::server::ServerConfig::default()).await?;
        }
    }

    Ok(())
}
