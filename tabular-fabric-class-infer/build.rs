use tonic_build::manual::{Method, Service};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

fn main() -> Result<()> {
    let codec_path = "tonic::codec::ProstCodec";

    let prediction_service = Service::builder()
        .name("PredictionService")
        .package("predict")
        .comment("Serves a single loaded classification model")
        .method(
            Method::builder()
                .name("health")
                .route_name("Health")
                .input_type("crate::proto::HealthRequest")
                .output_type("crate::proto::HealthResponse")
                .codec_path(codec_path)
                .build(),
        )
        .method(
            Method::builder()
                .name("predict")
                .route_name("Predict")
                .input_type("crate::proto::PredictRequest")
                .output_type("crate::proto::PredictResponse")
                .codec_path(codec_path)
                .build(),
        )
        .build();

    tonic_build::manual::Builder::new().compile(&[prediction_service]);

    Ok(())
}
