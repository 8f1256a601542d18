//! Wire messages of the `predict.PredictionService` gRPC API.
//!
//! The messages are declared by hand with prost derives; `build.rs` only
//! generates the client and server stubs around them.

#[derive(Clone, PartialEq, prost::Message)]
pub struct HealthRequest {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct HealthResponse {
    #[prost(string, tag = "1")]
    pub status: String,
    #[prost(string, tag = "2")]
    pub model_version: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Feature {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(double, tag = "2")]
    pub value: f64,
}

impl Feature {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PredictRequest {
    /// Features in submission order.
    #[prost(message, repeated, tag = "1")]
    pub features: Vec<Feature>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PredictResponse {
    #[prost(string, tag = "1")]
    pub prediction: String,
    #[prost(double, tag = "2")]
    pub confidence: f64,
    #[prost(string, tag = "3")]
    pub model_version: String,
}

// Tonic generated RPC stubs (client + server).
pub mod tonic_gen {
    include!(concat!(env!("OUT_DIR"), "/predict.PredictionService.rs"));
}
