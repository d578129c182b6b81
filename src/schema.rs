//! Wire types shared by the servers, the load generator, and the tests.

use serde::{Deserialize, Serialize};

use crate::model::NUM_FEATURES;

/// One labeled wine measurement. Field order matches the model input
/// order; all fields are required and numeric, so the JSON extractor
/// rejects incomplete or mistyped records before any handler logic runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WineFeatures {
    pub alcohol: f64,
    pub malic_acid: f64,
    pub ash: f64,
    pub alcalinity_of_ash: f64,
    pub magnesium: f64,
    pub total_phenols: f64,
    pub flavanoids: f64,
    pub nonflavanoid_phenols: f64,
    pub proanthocyanins: f64,
    pub color_intensity: f64,
    pub hue: f64,
    pub od280_od315_of_diluted_wines: f64,
    pub proline: f64,
}

impl WineFeatures {
    /// Flattens the record into the model input order.
    pub fn to_row(&self) -> [f64; NUM_FEATURES] {
        [
            self.alcohol,
            self.malic_acid,
            self.ash,
            self.alcalinity_of_ash,
            self.magnesium,
            self.total_phenols,
            self.flavanoids,
            self.nonflavanoid_phenols,
            self.proanthocyanins,
            self.color_intensity,
            self.hue,
            self.od280_od315_of_diluted_wines,
            self.proline,
        ]
    }

    /// A record with every field set to the same value. The load
    /// generator uses this for its constant request bodies.
    pub fn uniform(value: f64) -> Self {
        Self {
            alcohol: value,
            malic_acid: value,
            ash: value,
            alcalinity_of_ash: value,
            magnesium: value,
            total_phenols: value,
            flavanoids: value,
            nonflavanoid_phenols: value,
            proanthocyanins: value,
            color_intensity: value,
            hue: value,
            od280_od315_of_diluted_wines: value,
            proline: value,
        }
    }
}

/// Body of a batch prediction request. Inner vector widths are checked
/// by the handler, not the schema, so the error can name the offending
/// row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub batches: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinglePrediction {
    #[serde(rename = "Prediction")]
    pub prediction: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPrediction {
    #[serde(rename = "Prediction")]
    pub predictions: Vec<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_order_matches_field_order() {
        let wine = WineFeatures {
            alcohol: 1.0,
            malic_acid: 2.0,
            ash: 3.0,
            alcalinity_of_ash: 4.0,
            magnesium: 5.0,
            total_phenols: 6.0,
            flavanoids: 7.0,
            nonflavanoid_phenols: 8.0,
            proanthocyanins: 9.0,
            color_intensity: 10.0,
            hue: 11.0,
            od280_od315_of_diluted_wines: 12.0,
            proline: 13.0,
        };
        let row = wine.to_row();
        assert_eq!(row.len(), NUM_FEATURES);
        for (i, v) in row.iter().enumerate() {
            assert_eq!(*v, (i + 1) as f64);
        }
    }

    #[test]
    fn uniform_fills_every_field() {
        let row = WineFeatures::uniform(1.0).to_row();
        assert!(row.iter().all(|v| *v == 1.0));
    }

    #[test]
    fn missing_field_fails_deserialization() {
        let mut body = serde_json::to_value(WineFeatures::uniform(1.0)).unwrap();
        body.as_object_mut().unwrap().remove("proline");
        assert!(serde_json::from_value::<WineFeatures>(body).is_err());
    }

    #[test]
    fn prediction_serializes_with_capitalized_key() {
        let single = serde_json::to_value(SinglePrediction { prediction: 1 }).unwrap();
        assert_eq!(single["Prediction"], 1);

        let batch = serde_json::to_value(BatchPrediction {
            predictions: vec![0, 2],
        })
        .unwrap();
        assert_eq!(batch["Prediction"][1], 2);
    }
}
