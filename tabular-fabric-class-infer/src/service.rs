use std::fmt;
use std::sync::Arc;

use tracing::{error, info};

use crate::base::{normalize, Predict};
use crate::errors::ServiceError;
use crate::proto::{Feature, HealthResponse, PredictResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Ok,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Ok => "ok",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceHealth {
    pub status: HealthStatus,
    pub model_version: String,
}

impl From<ServiceHealth> for HealthResponse {
    fn from(health: ServiceHealth) -> Self {
        HealthResponse {
            status: health.status.to_string(),
            model_version: health.model_version,
        }
    }
}

#[derive(Clone)]
pub struct PredictionService {
    engine: Arc<dyn Predict>,
    model_version: String,
}

impl PredictionService {
    pub fn new(engine: Arc<dyn Predict>, model_version: impl Into<String>) -> Self {
        Self {
            engine,
            model_version: model_version.into(),
        }
    }

    pub fn model_version(&self) -> &str {
        &self.model_version
    }

    pub fn health(&self) -> ServiceHealth {
        info!("health check called");
        ServiceHealth {
            status: HealthStatus::Ok,
            model_version: self.model_version.clone(),
        }
    }

    pub fn predict(&self, raw: Vec<Feature>) -> Result<PredictResponse, ServiceError> {
        info!(features = raw.len(), "predict called");

        let features = normalize(raw.into_iter().map(|f| (f.name, f.value))).map_err(|e| {
            error!("validation error: {}", e);
            ServiceError::from(e)
        })?;
        info!("features validated: {:?}", features);

        let prediction = self.engine.predict(&features).map_err(|e| {
            error!("internal error: {}", e);
            ServiceError::from(e)
        })?;
        info!(
            "prediction: {}, confidence: {}",
            prediction.label, prediction.confidence
        );

        Ok(PredictResponse {
            prediction: prediction.label,
            confidence: prediction.confidence,
            model_version: self.model_version.clone(),
        })
    }
}
