use std::time::Duration;

use tonic::transport::{Channel, Endpoint};
use tracing::{error, info};

use crate::proto::tonic_gen::prediction_service_client::PredictionServiceClient;
use crate::proto::{Feature, HealthRequest, HealthResponse, PredictRequest, PredictResponse};

/// Iris sample used when `predict` is called without features.
pub fn sample_features() -> Vec<Feature> {
    vec![
        Feature::new("sepal_length", 5.1),
        Feature::new("sepal_width", 3.5),
        Feature::new("petal_length", 1.4),
        Feature::new("petal_width", 0.2),
    ]
}

/// Parse `name=value` arguments.
pub fn parse_features(args: &[String]) -> Result<Vec<Feature>, String> {
    args.iter()
        .map(|arg| {
            let (name, value) = arg
                .split_once('=')
                .ok_or_else(|| format!("expected name=value, got {:?}", arg))?;
            let value = value
                .trim()
                .parse::<f64>()
                .map_err(|e| format!("invalid value for {}: {}", name, e))?;
            Ok(Feature::new(name.trim(), value))
        })
        .collect()
}

async fn connect(
    host: &str,
    port: u16,
    timeout: Duration,
) -> anyhow::Result<PredictionServiceClient<Channel>> {
    let channel = Endpoint::from_shared(format!("http://{}:{}", host, port))?
        .connect_timeout(timeout)
        .timeout(timeout)
        .connect()
        .await?;
    Ok(PredictionServiceClient::new(channel))
}

/// Call `Health`; failures are logged and come back as `None`.
pub async fn call_health(host: &str, port: u16, timeout: Duration) -> Option<HealthResponse> {
    let result = async {
        let mut client = connect(host, port, timeout).await?;
        let response = client.health(HealthRequest {}).await?.into_inner();
        anyhow::Ok(response)
    }
    .await;

    match result {
        Ok(response) => {
            info!(
                "health response: status={}, version={}",
                response.status, response.model_version
            );
            Some(response)
        }
        Err(e) => {
            error!("health call failed: {}", e);
            None
        }
    }
}

/// Call `Predict`, defaulting to [`sample_features`]; failures are logged and
/// come back as `None`.
pub async fn call_predict(
    features: Option<Vec<Feature>>,
    host: &str,
    port: u16,
    timeout: Duration,
) -> Option<PredictResponse> {
    let features = features.unwrap_or_else(sample_features);
    let result = async {
        let mut client = connect(host, port, timeout).await?;
        let response = client
            .predict(PredictRequest { features })
            .await?
            .into_inner();
        anyhow::Ok(response)
    }
    .await;

    match result {
        Ok(response) => {
            info!(
                "predict response: prediction={}, confidence={:.2}%",
                response.prediction,
                response.confidence * 100.0
            );
            Some(response)
        }
        Err(e) => {
            error!("predict call failed: {}", e);
            None
        }
    }
}
