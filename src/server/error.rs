//! Error types for the server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::error::TabtrainError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Request failed server-side; the message is safe to show
    #[error("{0}")]
    Failed(String),

    /// Details are logged, not returned
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<TabtrainError> for ServerError {
    fn from(err: TabtrainError) -> Self {
        match err {
            TabtrainError::InvalidInput(msg) => ServerError::BadRequest(msg),
            TabtrainError::InvalidTarget(_) => {
                ServerError::BadRequest("Invalid target variable".to_string())
            }
            TabtrainError::NoDatasetLoaded => ServerError::BadRequest("No data uploaded".to_string()),
            TabtrainError::NoModelTrained => ServerError::NotFound("No model trained".to_string()),
            TabtrainError::TrainingFailure { model, reason } => {
                tracing::error!(model = %model, reason = %reason, "Training failed");
                ServerError::Failed("An error occurred during model training".to_string())
            }
            TabtrainError::PredictionFailure(msg) => {
                ServerError::Failed(format!("An error occurred during prediction: {}", msg))
            }
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ServerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ServerError::Failed(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ServerError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
