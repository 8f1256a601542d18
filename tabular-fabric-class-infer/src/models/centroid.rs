use serde::{Deserialize, Serialize};

use crate::errors::{InferError, LoadError};
use crate::models::{check_row, validate_matrix, validate_schema, Classifier};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NearestCentroid {
    pub feature_names: Vec<String>,
    pub classes: Vec<String>,
    pub centroids: Vec<Vec<f64>>,
}

impl NearestCentroid {
    pub(crate) fn validate(&self) -> Result<(), LoadError> {
        validate_schema(&self.feature_names, &self.classes)?;
        validate_matrix(
            "centroids",
            &self.centroids,
            self.classes.len(),
            self.feature_names.len(),
        )
    }
}

impl Classifier for NearestCentroid {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn predict_label(&self, row: &[f64]) -> Result<String, InferError> {
        check_row(row, self.feature_names.len())?;
        let mut best: Option<(usize, f64)> = None;
        for (idx, centroid) in self.centroids.iter().enumerate() {
            let distance: f64 = centroid
                .iter()
                .zip(row.iter())
                .map(|(c, x)| (c - x).powi(2))
                .sum();
            if !distance.is_finite() {
                return Err(InferError::NonFiniteScore {
                    class: self.classes[idx].clone(),
                });
            }
            match best {
                Some((_, best_distance)) if best_distance <= distance => {}
                _ => best = Some((idx, distance)),
            }
        }
        best.map(|(idx, _)| self.classes[idx].clone())
            .ok_or_else(|| InferError::GenericError {
                msg: "model has no centroids".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> NearestCentroid {
        NearestCentroid {
            feature_names: vec!["a".to_string(), "b".to_string()],
            classes: vec!["origin".to_string(), "far".to_string()],
            centroids: vec![vec![0.0, 0.0], vec![10.0, 10.0]],
        }
    }

    #[test]
    fn picks_closest_centroid() {
        let model = model();
        model.validate().unwrap();
        assert_eq!(model.predict_label(&[1.0, 2.0]).unwrap(), "origin");
        assert_eq!(model.predict_label(&[8.0, 9.0]).unwrap(), "far");
    }

    #[test]
    fn ties_go_to_first_class() {
        assert_eq!(model().predict_label(&[5.0, 5.0]).unwrap(), "origin");
    }

    #[test]
    fn centroid_count_must_match_classes() {
        let mut model = model();
        model.centroids.pop();
        assert!(model.validate().is_err());
    }
}
