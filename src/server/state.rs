//! Application state management

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use crate::service::PredictionService;

use super::ServerConfig;

/// Uploaded file information
#[derive(Debug, Clone, serde::Serialize)]
pub struct UploadInfo {
    pub id: String,
    pub filename: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub rows: usize,
    pub columns: usize,
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
}

/// Application state shared across handlers
pub struct AppState {
    pub config: ServerConfig,
    /// None when the classifier bundle failed to load at startup; not
    /// retried per-request
    pub service: Option<Arc<PredictionService>>,
    pub uploads: RwLock<HashMap<String, UploadInfo>>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let service = match PredictionService::load(&config.model_path) {
            Ok(service) => Some(Arc::new(service)),
            Err(e) => {
                warn!(error = %e, model_path = %config.model_path, "Failed to load classifier bundle");
                None
            }
        };

        Self {
            config,
            service,
            uploads: RwLock::new(HashMap::new()),
        }
    }

    pub fn generate_id() -> String {
        Uuid::new_v4().to_string()[..8].to_string()
    }

    /// Persist the original upload bytes and register the upload
    pub async fn store_upload(
        &self,
        filename: &str,
        bytes: &[u8],
        rows: usize,
        columns: usize,
    ) -> std::io::Result<UploadInfo> {
        let id = Self::generate_id();
        let path = PathBuf::from(&self.config.upload_dir).join(format!("{id}_{filename}"));
        tokio::fs::write(&path, bytes).await?;

        let info = UploadInfo {
            id: id.clone(),
            filename: filename.to_string(),
            path,
            rows,
            columns,
            uploaded_at: chrono::Utc::now(),
        };
        self.uploads.write().await.insert(id, info.clone());
        Ok(info)
    }

    /// Get system information
    pub fn get_system_info(&self) -> serde_json::Value {
        use sysinfo::System;

        let mut sys = System::new_all();
        sys.refresh_all();

        let cpu_usage: f32 =
            sys.cpus().iter().map(|c| c.cpu_usage()).sum::<f32>() / sys.cpus().len().max(1) as f32;

        serde_json::json!({
            "cpu_count": sys.cpus().len(),
            "cpu_usage": cpu_usage,
            "total_memory_gb": sys.total_memory() as f64 / 1024.0 / 1024.0 / 1024.0,
            "used_memory_gb": sys.used_memory() as f64 / 1024.0 / 1024.0 / 1024.0,
            "memory_usage_percent": (sys.used_memory() as f64 / sys.total_memory().max(1) as f64) * 100.0,
        })
    }
}
