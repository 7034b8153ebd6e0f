//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::preprocessing::record_from_json;
use crate::training::ModelKind;

use super::error::{Result, ServerError};
use super::state::AppState;

/// Run blocking session work off the async executor
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ServerError::Internal(format!("worker task failed: {}", e)))?
}

// ============================================================================
// Data Handlers
// ============================================================================

/// Upload a delimited table in the multipart `file` field
pub async fn upload_data(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ServerError::BadRequest(e.to_string()))?;
        upload = Some((file_name, data));
        break;
    }

    let (file_name, data) = upload.ok_or_else(|| ServerError::BadRequest("No file part".to_string()))?;
    if file_name.is_empty() {
        return Err(ServerError::BadRequest("No selected file".to_string()));
    }
    if !file_name.ends_with(".csv") {
        return Err(ServerError::BadRequest("Invalid file format".to_string()));
    }

    info!(file = %file_name, bytes = data.len(), "Received file");

    let columns = blocking(move || {
        state.session.upload(&data).map_err(|e| {
            warn!(error = %e, "Could not parse uploaded table");
            ServerError::Failed("Error reading CSV file".to_string())
        })
    })
    .await?;

    Ok(Json(json!({ "columns": columns })))
}

// ============================================================================
// Training Handlers
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TrainRequest {
    pub target_variable: Option<String>,
}

/// Train the roster against the current dataset
pub async fn train(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TrainRequest>,
) -> Result<Json<serde_json::Value>> {
    if !state.session.state().dataset_loaded {
        return Err(ServerError::BadRequest("No data uploaded".to_string()));
    }
    let target = request
        .target_variable
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ServerError::BadRequest("Invalid target variable".to_string()))?;

    let result = blocking(move || state.session.train(&target).map_err(ServerError::from)).await?;
    info!(
        target = %result.target,
        features = result.feature_names.len(),
        "Training request completed"
    );

    Ok(Json(json!({ "prediction_url": result.prediction_url })))
}

/// Feature names of the latest training run
pub async fn get_features(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>> {
    let features = blocking(move || state.session.features().map_err(ServerError::from)).await?;
    Ok(Json(json!({ "features": features })))
}

// ============================================================================
// Inference Handlers
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PredictQuery {
    pub model: Option<String>,
}

/// Classify one record given as a JSON object of field values
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PredictQuery>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>> {
    let kind = match query.model.as_deref() {
        Some(name) => name.parse::<ModelKind>()?,
        None => ModelKind::DEFAULT,
    };
    let record = match body {
        serde_json::Value::Object(map) => record_from_json(map),
        _ => {
            return Err(ServerError::BadRequest(
                "Prediction input must be a JSON object".to_string(),
            ))
        }
    };

    let label = blocking(move || {
        state
            .session
            .predict_with(kind, &record)
            .map_err(ServerError::from)
    })
    .await?;

    Ok(Json(json!({
        "prediction": label.to_json(),
        "model": kind.name(),
    })))
}

// ============================================================================
// System Handlers
// ============================================================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let session = state.session.state();
    let uptime = chrono::Utc::now().signed_duration_since(state.started_at);
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "dataset_loaded": session.dataset_loaded,
        "model_trained": session.model_trained,
        "uptime_secs": uptime.num_seconds(),
        "inference": state.session.inference_stats(),
    }))
}
