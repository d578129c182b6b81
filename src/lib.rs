pub mod api;
pub mod error;
pub mod loadgen;
pub mod model;
pub mod schema;

pub use error::AppError;
pub use model::{FEATURE_NAMES, ModelError, NUM_FEATURES, Pipeline};
pub use schema::{BatchPrediction, BatchRequest, SinglePrediction, WineFeatures};
