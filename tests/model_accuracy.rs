//! Offline model checks, run in CI out-of-band from the serving path:
//! hold-out accuracy and the structural shape of the pipeline artifact.

use ndarray::Array2;
use serde::Deserialize;

use wine_serving::model::{FEATURE_NAMES, NUM_FEATURES, Pipeline};

const MODEL_PATH: &str = "models/wine.json";
const TEST_DATA_PATH: &str = "data/wine_test.json";

#[derive(Deserialize)]
struct TestSet {
    feature_names: Vec<String>,
    samples: Vec<Vec<f64>>,
    labels: Vec<i64>,
}

fn load_test_set() -> TestSet {
    let contents = std::fs::read_to_string(TEST_DATA_PATH).expect("test data should be present");
    serde_json::from_str(&contents).expect("test data should parse")
}

#[test]
fn accuracy_exceeds_threshold() {
    let pipeline = Pipeline::load(MODEL_PATH).expect("model artifact should load");
    let test_set = load_test_set();
    assert_eq!(test_set.samples.len(), test_set.labels.len());
    assert!(!test_set.samples.is_empty());

    let n_rows = test_set.samples.len();
    let flat = test_set.samples.concat();
    let matrix = Array2::from_shape_vec((n_rows, NUM_FEATURES), flat).unwrap();

    let predictions = pipeline.predict_batch(&matrix).unwrap();
    let correct = predictions
        .iter()
        .zip(&test_set.labels)
        .filter(|(p, l)| p == l)
        .count();
    let accuracy = correct as f64 / n_rows as f64;

    assert!(accuracy > 0.9, "accuracy {accuracy:.3} not above 0.9");
}

#[test]
fn pipeline_is_scaler_then_classifier() {
    let pipeline = Pipeline::load(MODEL_PATH).expect("model artifact should load");

    let first = pipeline.steps.first().expect("pipeline has steps");
    assert!(first.is_scaler(), "first pipeline step must be the scaler");

    let last = pipeline.steps.last().expect("pipeline has steps");
    assert!(last.is_classifier(), "last pipeline step must be the classifier");

    assert_eq!(pipeline.n_features(), NUM_FEATURES);
}

#[test]
fn test_set_columns_match_model_input_order() {
    let test_set = load_test_set();
    assert_eq!(test_set.feature_names, FEATURE_NAMES);
    assert!(test_set.samples.iter().all(|row| row.len() == NUM_FEATURES));
}
