//! KOI Portal Server Module
//!
//! HTTP surface for the disposition service: file upload and download,
//! batch and single-sample prediction, health and system status. All of
//! the actual engineering lives in the pipeline; this layer only moves
//! payloads and translates errors.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: String,
    pub model_path: String,
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            upload_dir: std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string()),
            model_path: std::env::var("MODEL_PATH")
                .unwrap_or_else(|_| "./models/koi_softmax.json".to_string()),
            max_upload_size: std::env::var("MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100 * 1024 * 1024), // 100MB
        }
    }
}

/// Start the server with the given configuration
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();
    info!(
        upload_dir = %config.upload_dir,
        model_path = %config.model_path,
        started_at = %start_time.to_rfc3339(),
        "Initializing server directories"
    );

    std::fs::create_dir_all(&config.upload_dir)?;

    let state = Arc::new(AppState::new(config.clone()));
    if state.service.is_none() {
        warn!(
            model_path = %config.model_path,
            "Classifier bundle unavailable; prediction endpoints will return 503 until it is fixed"
        );
    }
    let app = create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(
        host = %config.host,
        port = config.port,
        max_upload_size_mb = config.max_upload_size / 1024 / 1024,
        "KOI Portal server starting"
    );
    info!(url = %format!("http://{}/api/health", addr), "Health endpoint available");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening and ready to accept connections");

    let shutdown_signal = async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        let uptime = chrono::Utc::now().signed_duration_since(start_time);
        info!(
            uptime_secs = uptime.num_seconds(),
            "Shutdown signal received, stopping server gracefully"
        );
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.max_upload_size, 100 * 1024 * 1024);
        assert!(!config.upload_dir.is_empty());
    }
}
