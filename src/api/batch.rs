use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::Json;
use axum::extract::State;
use ndarray::Array2;

use super::AppState;
use crate::error::AppError;
use crate::model::NUM_FEATURES;
use crate::schema::{BatchPrediction, BatchRequest};

pub async fn home() -> &'static str {
    "Wine class prediction API is working as expected. \
     This version accepts batches: POST {\"batches\": [[13 floats], ...]} to /predict."
}

/// Stacks the submitted vectors into one matrix and runs a single
/// prediction pass, so larger batches amortize per-request overhead.
/// Every inner vector must have exactly 13 values; the first offender
/// rejects the whole request before the model is invoked.
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchPrediction>, AppError> {
    for (i, row) in request.batches.iter().enumerate() {
        if row.len() != NUM_FEATURES {
            return Err(AppError::Validation(format!(
                "batches[{i}]: expected {NUM_FEATURES} values, got {}",
                row.len()
            )));
        }
    }

    let n_rows = request.batches.len();
    let flat = request.batches.concat();
    let matrix = Array2::from_shape_vec((n_rows, NUM_FEATURES), flat)
        .map_err(|e| AppError::Internal(format!("failed to stack batch: {e}")))?;

    let predictions = state.pipeline.predict_batch(&matrix)?;

    state.total_requests.fetch_add(1, Ordering::Relaxed);

    Ok(Json(BatchPrediction { predictions }))
}
