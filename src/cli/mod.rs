//! KOI Portal CLI Module
//!
//! Command-line interface for serving the API and running predictions
//! against local files.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;

use crate::ingest;
use crate::server::{run_server, ServerConfig};
use crate::service::PredictionService;

fn step_ok(msg: &str) {
    println!("  {} {}", "✓".green(), msg);
}

#[derive(Parser)]
#[command(name = "koi-portal")]
#[command(about = "KOI disposition prediction service", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Port to listen on
        #[arg(short, long, default_value_t = 8000)]
        port: u16,
        /// Path to the classifier bundle
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Classify a local data file
    Predict {
        /// Path to the classifier bundle
        #[arg(short, long)]
        model: String,
        /// Input data file (CSV, TSV, XLS, XLSX)
        #[arg(short, long)]
        data: String,
        /// Write the JSON result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show a summary of a data file
    Info {
        /// Input data file
        #[arg(short, long)]
        data: String,
    },
}

/// Start the server, with CLI flags overriding the env-derived defaults
pub async fn cmd_serve(host: &str, port: u16, model: Option<&str>) -> anyhow::Result<()> {
    let mut config = ServerConfig::default();
    config.host = host.to_string();
    config.port = port;
    if let Some(model) = model {
        config.model_path = model.to_string();
    }
    run_server(config).await
}

/// Classify every row of a local file and print or save the result
pub fn cmd_predict(model: &str, data: &str, output: Option<&std::path::Path>) -> anyhow::Result<()> {
    let bytes = std::fs::read(data)?;
    let df = ingest::read_table(&bytes, data)?;
    step_ok(&format!("Parsed {} rows x {} columns", df.height(), df.width()));

    let service = PredictionService::load(model)?;
    let batch = service.predict_table(&df)?;
    step_ok(&format!(
        "Classified {} rows: {} candidate, {} confirmed, {} false positive",
        batch.total_samples,
        batch.summary.candidate,
        batch.summary.confirmed,
        batch.summary.false_positive
    ));

    let json = serde_json::to_string_pretty(&batch)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            step_ok(&format!("Result written to {}", path.display()));
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Print a column summary of a local file
pub fn cmd_info(data: &str) -> anyhow::Result<()> {
    let bytes = std::fs::read(data)?;
    let df = ingest::read_table(&bytes, data)?;

    println!("{}", format!("{data}").bold());
    println!("  rows: {}  columns: {}", df.height(), df.width());
    for col in df.get_columns() {
        let nulls = col.null_count();
        println!(
            "  {:<24} {:<10} {} missing",
            col.name().to_string(),
            format!("{:?}", col.dtype()),
            nulls
        );
    }
    Ok(())
}
