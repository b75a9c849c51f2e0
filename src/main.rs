//! KOI Portal - Main Entry Point
//!
//! Disposition prediction service for Kepler Objects of Interest, with
//! CLI and server modes.

use clap::Parser;
use koi_portal::cli::{cmd_info, cmd_predict, cmd_serve, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "koi=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { host, port, model }) => {
            cmd_serve(&host, port, model.as_deref()).await?;
        }
        Some(Commands::Predict {
            model,
            data,
            output,
        }) => {
            cmd_predict(&model, &data, output.as_deref())?;
        }
        Some(Commands::Info { data }) => {
            cmd_info(&data)?;
        }
        None => {
            // Default: serve with env-derived configuration
            let config = koi_portal::server::ServerConfig::default();
            koi_portal::server::run_server(config).await?;
        }
    }

    Ok(())
}
