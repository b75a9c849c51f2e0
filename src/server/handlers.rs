//! HTTP request handlers

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use polars::prelude::*;
use serde::Deserialize;
use tracing::info;

use crate::error::KoiError;
use crate::ingest;
use crate::service::PredictionService;

use super::error::{Result, ServerError};
use super::state::AppState;

/// Rows included in upload previews
const PREVIEW_ROWS: usize = 10;

fn service(state: &AppState) -> Result<Arc<PredictionService>> {
    state.service.clone().ok_or_else(|| {
        ServerError::from(KoiError::ModelUnavailable(
            "classifier bundle was not loaded at startup".to_string(),
        ))
    })
}

/// Pull the first file field out of a multipart body
async fn read_upload(multipart: &mut Multipart) -> Result<(String, Vec<u8>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(e.to_string()))?
    {
        let file_name = field.file_name().unwrap_or("data.csv").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ServerError::BadRequest(e.to_string()))?;
        if data.is_empty() {
            return Err(ServerError::BadRequest("Uploaded file is empty".to_string()));
        }
        return Ok((file_name, data.to_vec()));
    }
    Err(ServerError::BadRequest("No file uploaded".to_string()))
}

/// First `n` rows of a frame as JSON records
fn preview_records(df: &DataFrame, n: usize) -> Vec<serde_json::Value> {
    let head = df.head(Some(n));
    let columns = head.get_columns();

    (0..head.height())
        .map(|row| {
            let mut record = serde_json::Map::new();
            for col in columns {
                let value = match col.get(row) {
                    Ok(AnyValue::Float64(v)) => serde_json::json!(v),
                    Ok(AnyValue::Float32(v)) => serde_json::json!(v),
                    Ok(AnyValue::Int64(v)) => serde_json::json!(v),
                    Ok(AnyValue::Int32(v)) => serde_json::json!(v),
                    Ok(AnyValue::String(v)) => serde_json::json!(v),
                    Ok(AnyValue::Boolean(v)) => serde_json::json!(v),
                    Ok(AnyValue::Null) => serde_json::Value::Null,
                    other => serde_json::json!(other.map(|v| format!("{v:?}")).unwrap_or_default()),
                };
                record.insert(col.name().to_string(), value);
            }
            serde_json::Value::Object(record)
        })
        .collect()
}

// ============================================================================
// Data Handlers
// ============================================================================

/// Upload and parse a data file
pub async fn upload_data(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>> {
    let (file_name, data) = read_upload(&mut multipart).await?;
    info!(filename = %file_name, bytes = data.len(), "Received upload");

    let df = ingest::read_table(&data, &file_name).map_err(ServerError::from)?;
    let upload = state
        .store_upload(&file_name, &data, df.height(), df.width())
        .await?;

    let column_names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    Ok(Json(serde_json::json!({
        "success": true,
        "upload_id": upload.id,
        "filename": upload.filename,
        "total_rows": df.height(),
        "columns": column_names,
        "data": preview_records(&df, PREVIEW_ROWS),
        "showing_rows": df.height().min(PREVIEW_ROWS),
    })))
}

/// Stream back the original bytes of a previous upload
pub async fn download_data(
    State(state): State<Arc<AppState>>,
    Path(upload_id): Path<String>,
) -> Result<impl IntoResponse> {
    let uploads = state.uploads.read().await;
    let upload = uploads
        .get(&upload_id)
        .ok_or_else(|| ServerError::NotFound(format!("Upload not found: {upload_id}")))?;

    let bytes = tokio::fs::read(&upload.path).await?;

    let media_type = if upload.filename.ends_with(".csv") {
        "text/csv"
    } else if upload.filename.ends_with(".xlsx") {
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    } else if upload.filename.ends_with(".xls") {
        "application/vnd.ms-excel"
    } else {
        "application/octet-stream"
    };

    let disposition = format!("attachment; filename=\"{}\"", upload.filename);
    Ok((
        StatusCode::OK,
        [
            (
                axum::http::header::CONTENT_TYPE,
                axum::http::HeaderValue::from_static(media_type),
            ),
            (
                axum::http::header::CONTENT_DISPOSITION,
                axum::http::HeaderValue::from_str(&disposition)
                    .map_err(|e| ServerError::Internal(format!("Invalid header: {e}")))?,
            ),
        ],
        bytes,
    ))
}

// ============================================================================
// Prediction Handlers
// ============================================================================

/// Run an uploaded file through the full pipeline and classifier
pub async fn predict(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>> {
    let service = service(&state)?;
    let (file_name, data) = read_upload(&mut multipart).await?;

    let df = ingest::read_table(&data, &file_name).map_err(ServerError::from)?;
    let batch = service.predict_table(&df).map_err(ServerError::from)?;

    info!(
        filename = %file_name,
        rows = batch.total_samples,
        "Batch prediction completed"
    );

    Ok(Json(serde_json::json!({
        "success": true,
        "data": batch,
        "model_accuracy": service.accuracy(),
    })))
}

#[derive(Deserialize)]
pub struct PredictSingleRequest {
    pub features: HashMap<String, f64>,
}

/// Classify a single flat feature mapping
pub async fn predict_single(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictSingleRequest>,
) -> Result<Json<serde_json::Value>> {
    let service = service(&state)?;
    let record = service
        .predict_single(&request.features)
        .map_err(ServerError::from)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "data": record,
        "model_accuracy": service.accuracy(),
    })))
}

// ============================================================================
// System Handlers
// ============================================================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "model_loaded": state.service.is_some(),
    }))
}

pub async fn get_system_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let system_info = state.get_system_info();
    let uploads = state.uploads.read().await;
    let fitted = state
        .service
        .as_ref()
        .map(|s| s.is_fitted())
        .unwrap_or(false);

    Json(serde_json::json!({
        "system": system_info,
        "uploads_count": uploads.len(),
        "model_loaded": state.service.is_some(),
        "pipeline_fitted": fitted,
        "status": "healthy",
    }))
}
