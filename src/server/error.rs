//! Error types for the server

use crate::error::KoiError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] KoiError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ServerError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            ServerError::Io(e) => {
                tracing::error!(detail = %e, "IO error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A file system error occurred".to_string(),
                )
            }
            ServerError::Json(_) => (StatusCode::BAD_REQUEST, "Invalid JSON format".to_string()),
            ServerError::Core(core) => match core {
                KoiError::UnreadableFormat { .. }
                | KoiError::EmptyDataset(_)
                | KoiError::SchemaMismatch(_)
                | KoiError::DataError(_) => (StatusCode::BAD_REQUEST, core.to_string()),
                KoiError::ModelUnavailable(msg) => {
                    tracing::error!(detail = %msg, "Model unavailable");
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "Prediction model is unavailable".to_string(),
                    )
                }
                other => {
                    tracing::error!(detail = %other, "Prediction pipeline error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Prediction failed. Check server logs for details.".to_string(),
                    )
                }
            },
        };

        let body = Json(json!({
            "error": true,
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
