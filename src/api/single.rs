use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::Json;
use axum::extract::State;

use super::AppState;
use crate::error::AppError;
use crate::schema::{SinglePrediction, WineFeatures};

pub async fn home() -> &'static str {
    "Wine class prediction API is working as expected. \
     POST one labeled measurement to /predict."
}

/// Assembles the 13 named fields into a single row in model input order
/// and returns the one resulting label. Field presence and types are
/// already enforced by the JSON extractor.
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(wine): Json<WineFeatures>,
) -> Result<Json<SinglePrediction>, AppError> {
    let row = wine.to_row();
    let prediction = state.pipeline.predict(&row)?;

    state.total_requests.fetch_add(1, Ordering::Relaxed);

    Ok(Json(SinglePrediction { prediction }))
}
