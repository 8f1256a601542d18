use std::path::Path;

use tracing::{debug, info};

use crate::base::{FeatureSet, Predict, Prediction};
use crate::errors::{InferError, LoadError};
use crate::models::{LoadedModel, ModelArtifact};

pub struct InferenceEngine {
    model: LoadedModel,
}

impl InferenceEngine {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LoadError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact: ModelArtifact =
            serde_json::from_str(&content).map_err(|source| LoadError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let engine = Self::from_artifact(artifact)?;
        info!(
            "model loaded from {}, features: {:?}, probability: {}",
            path.display(),
            engine.feature_names(),
            engine.supports_probability()
        );
        Ok(engine)
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, LoadError> {
        debug!("building {} model", artifact.kind());
        Ok(Self {
            model: artifact.into_model()?,
        })
    }

    pub fn feature_names(&self) -> &[String] {
        self.model.feature_names()
    }

    pub fn supports_probability(&self) -> bool {
        self.model.supports_probability()
    }

    /// Lay the features out in the model's schema order.
    fn to_row(&self, features: &FeatureSet) -> Result<Vec<f64>, InferError> {
        let schema = self.model.feature_names();
        let row = schema
            .iter()
            .map(|name| {
                features
                    .get(name)
                    .ok_or_else(|| InferError::MissingFeature { name: name.clone() })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if features.len() != schema.len() {
            if let Some(name) = features.names().find(|name| !schema.iter().any(|s| s == name)) {
                return Err(InferError::UnknownFeature {
                    name: name.to_string(),
                });
            }
        }
        Ok(row)
    }
}

impl Predict for InferenceEngine {
    fn predict(&self, features: &FeatureSet) -> Result<Prediction, InferError> {
        let row = self.to_row(features)?;
        let (label, confidence) = match &self.model {
            LoadedModel::Probabilistic(model) => {
                let label = model.predict_label(&row)?;
                let proba = model.predict_proba(&row)?;
                (label, confidence_from_distribution(&proba))
            }
            // No calibrated signal, so the engine asserts certainty.
            LoadedModel::PointOnly(model) => (model.predict_label(&row)?, 1.0),
        };
        Ok(Prediction { label, confidence })
    }
}

/// Highest class probability, or `1.0` when no entry is usable.
pub fn confidence_from_distribution(proba: &[f64]) -> f64 {
    proba
        .iter()
        .copied()
        .filter(|p| p.is_finite())
        .reduce(f64::max)
        .map(|p| p.clamp(0.0, 1.0))
        .unwrap_or(1.0)
}
