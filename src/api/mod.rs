pub mod batch;
pub mod health;
pub mod single;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Instant;

use axum::Router;
use axum::routing::{get, post};
use chrono::{DateTime, Utc};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::model::{ModelError, Pipeline};

pub use health::HealthResponse;

/// Shared state of a serving process. The pipeline is loaded once and
/// never mutated; handlers only read it.
pub struct AppState {
    pub pipeline: Pipeline,
    pub model_load_time_ms: f64,
    pub started_at: DateTime<Utc>,
    pub total_requests: AtomicU64,
}

impl AppState {
    pub fn load(model_path: impl AsRef<Path>) -> Result<Arc<Self>, ModelError> {
        let model_path = model_path.as_ref();
        info!("loading model from {}", model_path.display());

        let start = Instant::now();
        let pipeline = Pipeline::load(model_path)?;
        let model_load_time_ms = start.elapsed().as_secs_f64() * 1000.0;

        info!(
            "model loaded in {:.2}ms ({} pipeline steps, {} features)",
            model_load_time_ms,
            pipeline.steps.len(),
            pipeline.n_features()
        );

        Ok(Arc::new(Self {
            pipeline,
            model_load_time_ms,
            started_at: Utc::now(),
            total_requests: AtomicU64::new(0),
        }))
    }
}

/// Router for the no-batch service: one labeled record per request.
pub fn single_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(single::home))
        .route("/health", get(health::health_check))
        .route("/predict", post(single::predict))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Router for the batch service: a list of unlabeled vectors per request.
pub fn batch_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(batch::home))
        .route("/health", get(health::health_check))
        .route("/predict", post(batch::predict))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds and runs a router. Only returns on listener or server failure.
pub async fn serve(app: Router, host: &str, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!("listening on http://{host}:{port}");
    axum::serve(listener, app).await?;
    Ok(())
}
