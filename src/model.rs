//! The serialized model artifact: a scaler-then-classifier pipeline.
//!
//! The artifact is a JSON document loaded once at startup and shared
//! read-only across all request handlers. Prediction is a pure function
//! of the input matrix, so no locking is needed.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Width of a wine feature vector, both named and positional.
pub const NUM_FEATURES: usize = 13;

/// Model input order for the named fields of a wine measurement.
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "alcohol",
    "malic_acid",
    "ash",
    "alcalinity_of_ash",
    "magnesium",
    "total_phenols",
    "flavanoids",
    "nonflavanoid_phenols",
    "proanthocyanins",
    "color_intensity",
    "hue",
    "od280_od315_of_diluted_wines",
    "proline",
];

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse model file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("expected {expected} features per row, got {got}")]
    FeatureWidth { expected: usize, got: usize },
    #[error("model pipeline has no steps")]
    EmptyPipeline,
    #[error("model pipeline must end in a classifier step")]
    MissingClassifier,
    #[error("inconsistent model dimensions: {0}")]
    Dimensions(String),
}

/// One step of the pipeline. Transform steps may appear in any number
/// before the single trailing classifier step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineStep {
    StandardScaler {
        mean: Vec<f64>,
        scale: Vec<f64>,
    },
    LogisticRegression {
        classes: Vec<i64>,
        coef: Vec<Vec<f64>>,
        intercept: Vec<f64>,
    },
}

impl PipelineStep {
    pub fn is_scaler(&self) -> bool {
        matches!(self, PipelineStep::StandardScaler { .. })
    }

    pub fn is_classifier(&self) -> bool {
        matches!(self, PipelineStep::LogisticRegression { .. })
    }

    fn input_width(&self) -> usize {
        match self {
            PipelineStep::StandardScaler { mean, .. } => mean.len(),
            PipelineStep::LogisticRegression { coef, .. } => {
                coef.first().map(Vec::len).unwrap_or(0)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub steps: Vec<PipelineStep>,
}

impl Pipeline {
    /// Loads and validates a pipeline artifact. Callers treat any error
    /// here as fatal: a process without a model does not serve requests.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ModelError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let pipeline: Pipeline =
            serde_json::from_str(&contents).map_err(|source| ModelError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        pipeline.validate()?;
        Ok(pipeline)
    }

    fn validate(&self) -> Result<(), ModelError> {
        let Some(last) = self.steps.last() else {
            return Err(ModelError::EmptyPipeline);
        };
        if !last.is_classifier() {
            return Err(ModelError::MissingClassifier);
        }
        let n_features = self.n_features();
        for (i, step) in self.steps.iter().enumerate() {
            if step.is_classifier() && i + 1 != self.steps.len() {
                return Err(ModelError::Dimensions(format!(
                    "classifier at step {i} is not the final step"
                )));
            }
            match step {
                PipelineStep::StandardScaler { mean, scale } => {
                    if mean.len() != n_features || scale.len() != n_features {
                        return Err(ModelError::Dimensions(format!(
                            "scaler at step {i} has width {}/{}, expected {n_features}",
                            mean.len(),
                            scale.len()
                        )));
                    }
                }
                PipelineStep::LogisticRegression {
                    classes,
                    coef,
                    intercept,
                } => {
                    if classes.is_empty() {
                        return Err(ModelError::Dimensions(
                            "classifier has no classes".to_string(),
                        ));
                    }
                    if coef.len() != classes.len() || intercept.len() != classes.len() {
                        return Err(ModelError::Dimensions(format!(
                            "classifier has {} coefficient rows and {} intercepts for {} classes",
                            coef.len(),
                            intercept.len(),
                            classes.len()
                        )));
                    }
                    if coef.iter().any(|row| row.len() != n_features) {
                        return Err(ModelError::Dimensions(format!(
                            "classifier coefficient rows must all have width {n_features}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Input width this pipeline expects, taken from its first step.
    pub fn n_features(&self) -> usize {
        self.steps.first().map(PipelineStep::input_width).unwrap_or(0)
    }

    /// Predicts a single row. Used by the no-batch service.
    pub fn predict(&self, row: &[f64]) -> Result<i64, ModelError> {
        let matrix = Array2::from_shape_vec((1, row.len()), row.to_vec())
            .map_err(|e| ModelError::Dimensions(e.to_string()))?;
        let labels = self.predict_batch(&matrix)?;
        labels
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::Dimensions("empty prediction for one row".to_string()))
    }

    /// Predicts every row of the matrix in one pass, returning labels in
    /// row order. A zero-row matrix yields an empty vector.
    pub fn predict_batch(&self, rows: &Array2<f64>) -> Result<Vec<i64>, ModelError> {
        let n_features = self.n_features();
        if rows.ncols() != n_features {
            return Err(ModelError::FeatureWidth {
                expected: n_features,
                got: rows.ncols(),
            });
        }

        let mut x = rows.to_owned();
        for step in &self.steps {
            match step {
                PipelineStep::StandardScaler { mean, scale } => {
                    let mean = Array1::from_vec(mean.clone());
                    let scale = Array1::from_vec(scale.clone());
                    x = (x - &mean) / &scale;
                }
                PipelineStep::LogisticRegression {
                    classes,
                    coef,
                    intercept,
                } => {
                    let k = classes.len();
                    let flat: Vec<f64> = coef.iter().flatten().copied().collect();
                    let coef = Array2::from_shape_vec((k, n_features), flat)
                        .map_err(|e| ModelError::Dimensions(e.to_string()))?;
                    let intercept = Array1::from_vec(intercept.clone());
                    let scores = x.dot(&coef.t()) + &intercept;

                    let mut labels = Vec::with_capacity(scores.nrows());
                    for row in scores.rows() {
                        let best = row
                            .iter()
                            .enumerate()
                            .max_by(|a, b| a.1.total_cmp(b.1))
                            .map(|(i, _)| classes[i])
                            .ok_or_else(|| {
                                ModelError::Dimensions("classifier produced no scores".to_string())
                            })?;
                        labels.push(best);
                    }
                    return Ok(labels);
                }
            }
        }
        // validate() guarantees the final step is a classifier
        Err(ModelError::MissingClassifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn toy_pipeline() -> Pipeline {
        Pipeline {
            steps: vec![
                PipelineStep::StandardScaler {
                    mean: vec![1.0, 2.0],
                    scale: vec![1.0, 2.0],
                },
                PipelineStep::LogisticRegression {
                    classes: vec![0, 1],
                    coef: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
                    intercept: vec![0.0, 0.0],
                },
            ],
        }
    }

    #[test]
    fn predicts_argmax_after_scaling() {
        let p = toy_pipeline();
        // standardized: [(3-1)/1, (2-2)/2] = [2, 0] -> class 0
        assert_eq!(p.predict(&[3.0, 2.0]).unwrap(), 0);
        // standardized: [0, 3] -> class 1
        assert_eq!(p.predict(&[1.0, 8.0]).unwrap(), 1);
    }

    #[test]
    fn batch_preserves_row_order() {
        let p = toy_pipeline();
        let rows =
            Array2::from_shape_vec((2, 2), vec![3.0, 2.0, 1.0, 8.0]).unwrap();
        assert_eq!(p.predict_batch(&rows).unwrap(), vec![0, 1]);
    }

    #[test]
    fn empty_batch_yields_no_labels() {
        let p = toy_pipeline();
        let rows = Array2::from_shape_vec((0, 2), vec![]).unwrap();
        assert_eq!(p.predict_batch(&rows).unwrap(), Vec::<i64>::new());
    }

    #[test]
    fn wrong_width_is_rejected_before_prediction() {
        let p = toy_pipeline();
        let rows = Array2::from_shape_vec((1, 3), vec![1.0, 2.0, 3.0]).unwrap();
        match p.predict_batch(&rows) {
            Err(ModelError::FeatureWidth { expected: 2, got: 3 }) => {}
            other => panic!("expected FeatureWidth error, got {other:?}"),
        }
    }

    #[test]
    fn artifact_json_round_trips() {
        let json = serde_json::to_string(&toy_pipeline()).unwrap();
        let parsed: Pipeline = serde_json::from_str(&json).unwrap();
        assert!(parsed.steps[0].is_scaler());
        assert!(parsed.steps[1].is_classifier());
        assert_eq!(parsed.n_features(), 2);
    }

    #[test]
    fn load_rejects_missing_file() {
        match Pipeline::load("does/not/exist.json") {
            Err(ModelError::Read { .. }) => {}
            other => panic!("expected Read error, got {other:?}"),
        }
    }

    #[test]
    fn load_rejects_malformed_artifact() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{\"steps\": \"nope\"}").unwrap();
        match Pipeline::load(file.path()) {
            Err(ModelError::Parse { .. }) => {}
            other => panic!("expected Parse error, got {other:?}"),
        }
    }

    #[test]
    fn load_accepts_valid_artifact() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = serde_json::to_string(&toy_pipeline()).unwrap();
        file.write_all(json.as_bytes()).unwrap();
        let p = Pipeline::load(file.path()).unwrap();
        assert_eq!(p.predict(&[3.0, 2.0]).unwrap(), 0);
    }

    #[test]
    fn validation_rejects_empty_pipeline() {
        let p = Pipeline { steps: vec![] };
        assert!(matches!(p.validate(), Err(ModelError::EmptyPipeline)));
    }

    #[test]
    fn validation_rejects_trailing_transform() {
        let p = Pipeline {
            steps: vec![PipelineStep::StandardScaler {
                mean: vec![0.0],
                scale: vec![1.0],
            }],
        };
        assert!(matches!(p.validate(), Err(ModelError::MissingClassifier)));
    }

    #[test]
    fn validation_rejects_mismatched_widths() {
        let p = Pipeline {
            steps: vec![
                PipelineStep::StandardScaler {
                    mean: vec![0.0, 0.0],
                    scale: vec![1.0],
                },
                PipelineStep::LogisticRegression {
                    classes: vec![0],
                    coef: vec![vec![1.0, 1.0]],
                    intercept: vec![0.0],
                },
            ],
        };
        assert!(matches!(p.validate(), Err(ModelError::Dimensions(_))));
    }
}
