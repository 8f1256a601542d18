pub mod centroid;
pub mod logistic;

use crate::errors::{InferError, LoadError};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

pub use centroid::NearestCentroid;
pub use logistic::LogisticRegression;

/// Point prediction over a row laid out in [`Classifier::feature_names`] order.
pub trait Classifier: Send + Sync {
    fn feature_names(&self) -> &[String];

    fn classes(&self) -> &[String];

    fn predict_label(&self, row: &[f64]) -> Result<String, InferError>;
}

/// A classifier that can also produce a distribution over [`Classifier::classes`].
pub trait ProbabilisticClassifier: Classifier {
    fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>, InferError>;
}

pub enum LoadedModel {
    Probabilistic(Box<dyn ProbabilisticClassifier>),
    PointOnly(Box<dyn Classifier>),
}

impl LoadedModel {
    pub fn feature_names(&self) -> &[String] {
        match self {
            LoadedModel::Probabilistic(model) => model.feature_names(),
            LoadedModel::PointOnly(model) => model.feature_names(),
        }
    }

    pub fn classes(&self) -> &[String] {
        match self {
            LoadedModel::Probabilistic(model) => model.classes(),
            LoadedModel::PointOnly(model) => model.classes(),
        }
    }

    pub fn supports_probability(&self) -> bool {
        matches!(self, LoadedModel::Probabilistic(_))
    }
}

/// On-disk model artifact, a JSON document tagged by `kind`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    LogisticRegression(LogisticRegression),
    NearestCentroid(NearestCentroid),
}

impl ModelArtifact {
    pub fn kind(&self) -> &'static str {
        match self {
            ModelArtifact::LogisticRegression(_) => "logistic_regression",
            ModelArtifact::NearestCentroid(_) => "nearest_centroid",
        }
    }

    pub fn into_model(self) -> Result<LoadedModel, LoadError> {
        match self {
            ModelArtifact::LogisticRegression(model) => {
                model.validate()?;
                Ok(LoadedModel::Probabilistic(Box::new(model)))
            }
            ModelArtifact::NearestCentroid(model) => {
                model.validate()?;
                Ok(LoadedModel::PointOnly(Box::new(model)))
            }
        }
    }
}

pub(crate) fn validate_schema(feature_names: &[String], classes: &[String]) -> Result<(), LoadError> {
    if feature_names.is_empty() {
        return Err(invalid("feature_names must not be empty"));
    }
    if feature_names.iter().any(|name| name.trim().is_empty()) {
        return Err(invalid("feature_names must not contain blank names"));
    }
    if let Some(name) = feature_names.iter().duplicates().next() {
        return Err(invalid(format!("duplicate feature name in schema: {}", name)));
    }
    if classes.is_empty() {
        return Err(invalid("classes must not be empty"));
    }
    if let Some(class) = classes.iter().duplicates().next() {
        return Err(invalid(format!("duplicate class label: {}", class)));
    }
    Ok(())
}

pub(crate) fn validate_matrix(
    what: &str,
    rows: &[Vec<f64>],
    expected_rows: usize,
    expected_cols: usize,
) -> Result<(), LoadError> {
    if rows.len() != expected_rows {
        return Err(invalid(format!(
            "{} has {} rows, expected {}",
            what,
            rows.len(),
            expected_rows
        )));
    }
    for (idx, row) in rows.iter().enumerate() {
        if row.len() != expected_cols {
            return Err(invalid(format!(
                "{} row {} has {} columns, expected {}",
                what,
                idx,
                row.len(),
                expected_cols
            )));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(invalid(format!("{} row {} is not finite", what, idx)));
        }
    }
    Ok(())
}

pub(crate) fn invalid(msg: impl Into<String>) -> LoadError {
    LoadError::Invalid { msg: msg.into() }
}

pub(crate) fn check_row(row: &[f64], expected: usize) -> Result<(), InferError> {
    if row.len() != expected {
        return Err(InferError::DimensionMismatch {
            expected,
            actual: row.len(),
        });
    }
    Ok(())
}

/// Index of the first maximum; `None` if any score is not finite.
pub(crate) fn first_argmax(scores: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &score) in scores.iter().enumerate() {
        if !score.is_finite() {
            return None;
        }
        match best {
            Some((_, best_score)) if best_score >= score => {}
            _ => best = Some((idx, score)),
        }
    }
    best.map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn schema_rejects_duplicates() {
        let err = validate_schema(&names(&["a", "a"]), &names(&["x"])).unwrap_err();
        assert!(err.to_string().contains("duplicate feature name"));

        let err = validate_schema(&names(&["a"]), &names(&["x", "x"])).unwrap_err();
        assert!(err.to_string().contains("duplicate class"));
    }

    #[test]
    fn schema_rejects_blank_and_empty() {
        assert!(validate_schema(&[], &names(&["x"])).is_err());
        assert!(validate_schema(&names(&[" "]), &names(&["x"])).is_err());
        assert!(validate_schema(&names(&["a"]), &[]).is_err());
    }

    #[test]
    fn argmax_prefers_first_on_ties() {
        assert_eq!(first_argmax(&[0.2, 0.4, 0.4]), Some(1));
        assert_eq!(first_argmax(&[]), None);
        assert_eq!(first_argmax(&[0.1, f64::NAN]), None);
    }

    #[test]
    fn artifact_kind_selects_capability() {
        let json = r#"{
            "kind": "nearest_centroid",
            "feature_names": ["a", "b"],
            "classes": ["low", "high"],
            "centroids": [[0.0, 0.0], [1.0, 1.0]]
        }"#;
        let artifact: ModelArtifact = serde_json::from_str(json).unwrap();
        assert_eq!(artifact.kind(), "nearest_centroid");
        let model = artifact.into_model().unwrap();
        assert!(!model.supports_probability());
        assert_eq!(model.classes(), &names(&["low", "high"])[..]);
    }

    #[test]
    fn unknown_kind_fails_to_parse() {
        let json = r#"{"kind": "random_forest", "feature_names": ["a"], "classes": ["x"]}"#;
        assert!(serde_json::from_str::<ModelArtifact>(json).is_err());
    }
}
