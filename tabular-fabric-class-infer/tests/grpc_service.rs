use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tabular_fabric_class_infer::base::{normalize, FeatureSet, Predict, Prediction};
use tabular_fabric_class_infer::config::Config;
use tabular_fabric_class_infer::errors::InferError;
use tabular_fabric_class_infer::errors::ServeError;
use tabular_fabric_class_infer::infer::InferenceEngine;
use tabular_fabric_class_infer::proto::tonic_gen::prediction_service_client::PredictionServiceClient;
use tabular_fabric_class_infer::proto::{Feature, HealthRequest, PredictRequest};
use tabular_fabric_class_infer::serve::{serve, PredictionServer};
use tabular_fabric_class_infer::service::PredictionService;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tonic::transport::Channel;

const IRIS_CLASSES: [&str; 3] = ["setosa", "versicolor", "virginica"];

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn config(model_path: String, port: u16) -> Config {
    Config {
        model_path,
        model_version: "v1.0.0".to_string(),
        serve_host: "127.0.0.1".to_string(),
        serve_port: port,
        max_workers: 10,
        timezone: "UTC".to_string(),
        log_format: "text".to_string(),
        log_level: "INFO".to_string(),
    }
}

fn iris(values: [f64; 4]) -> Vec<Feature> {
    vec![
        Feature::new("sepal_length", values[0]),
        Feature::new("sepal_width", values[1]),
        Feature::new("petal_length", values[2]),
        Feature::new("petal_width", values[3]),
    ]
}

/// Sleeps through every prediction and records how many overlap.
#[derive(Default)]
struct SlowPredict {
    delay: Duration,
    running: AtomicUsize,
    peak: AtomicUsize,
    finished: AtomicUsize,
}

impl SlowPredict {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Default::default()
        })
    }
}

impl Predict for SlowPredict {
    fn predict(&self, _features: &FeatureSet) -> Result<Prediction, InferError> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.running.fetch_sub(1, Ordering::SeqCst);
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(Prediction {
            label: "x".to_string(),
            confidence: 0.9,
        })
    }
}

struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    handle: JoinHandle<Result<(), ServeError>>,
}

impl TestServer {
    async fn start(model: &str, max_workers: usize) -> Self {
        let engine = InferenceEngine::load(fixture(model)).expect("engine");
        Self::start_with(Arc::new(engine), max_workers).await
    }

    async fn start_with(engine: Arc<dyn Predict>, max_workers: usize) -> Self {
        let service = PredictionService::new(engine, "v1.0.0");
        let server = PredictionServer::bind("127.0.0.1:0", service, max_workers)
            .await
            .expect("bind");
        let addr = server.local_addr().expect("local addr");
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(server.run(shutdown.clone()));
        Self {
            addr,
            shutdown,
            handle,
        }
    }

    async fn client(&self) -> PredictionServiceClient<Channel> {
        PredictionServiceClient::connect(format!("http://{}", self.addr))
            .await
            .expect("connect")
    }

    async fn stop(self) {
        self.shutdown.cancel();
        self.handle.await.expect("join").expect("serve");
    }
}

#[test_log::test(tokio::test)]
async fn health_answers_before_any_predict() {
    let server = TestServer::start("iris_logistic.json", 10).await;
    let mut client = server.client().await;

    let health = client.health(HealthRequest {}).await.expect("health").into_inner();
    assert_eq!(health.status, "ok");
    assert_eq!(health.model_version, "v1.0.0");

    server.stop().await;
}

#[test_log::test(tokio::test)]
async fn predicts_iris_sample() {
    let server = TestServer::start("iris_logistic.json", 10).await;
    let mut client = server.client().await;

    let response = client
        .predict(PredictRequest {
            features: iris([5.1, 3.5, 1.4, 0.2]),
        })
        .await
        .expect("predict")
        .into_inner();
    assert!(IRIS_CLASSES.contains(&response.prediction.as_str()));
    assert_eq!(response.prediction, "setosa");
    assert!(response.confidence > 1.0 / 3.0);
    assert!(response.confidence <= 1.0);
    assert_eq!(response.model_version, "v1.0.0");

    server.stop().await;
}

#[test_log::test(tokio::test)]
async fn point_only_model_reports_full_confidence() {
    let server = TestServer::start("iris_centroid.json", 2).await;
    let mut client = server.client().await;

    let response = client
        .predict(PredictRequest {
            features: iris([5.9, 2.8, 4.3, 1.3]),
        })
        .await
        .expect("predict")
        .into_inner();
    assert_eq!(response.prediction, "versicolor");
    assert_eq!(response.confidence, 1.0);

    server.stop().await;
}

#[test_log::test(tokio::test)]
async fn invalid_requests_are_invalid_argument() {
    let server = TestServer::start("iris_logistic.json", 10).await;
    let mut client = server.client().await;

    let status = client
        .predict(PredictRequest { features: vec![] })
        .await
        .expect_err("empty request");
    assert_eq!(status.code(), tonic::Code::InvalidArgument);
    assert_eq!(status.message(), "At least one feature is required");

    let status = client
        .predict(PredictRequest {
            features: vec![Feature::new(" ", 1.0)],
        })
        .await
        .expect_err("blank name");
    assert_eq!(status.code(), tonic::Code::InvalidArgument);
    assert_eq!(status.message(), "Feature names cannot be empty");

    let status = client
        .predict(PredictRequest {
            features: vec![Feature::new("x", 1.0), Feature::new("x", 2.0)],
        })
        .await
        .expect_err("duplicate name");
    assert_eq!(status.code(), tonic::Code::InvalidArgument);
    assert_eq!(status.message(), "Duplicate feature name: x");

    server.stop().await;
}

#[test_log::test(tokio::test)]
async fn schema_mismatch_is_internal() {
    let server = TestServer::start("iris_logistic.json", 10).await;
    let mut client = server.client().await;

    let status = client
        .predict(PredictRequest {
            features: vec![Feature::new("sepal_length", 5.1)],
        })
        .await
        .expect_err("missing features");
    assert_eq!(status.code(), tonic::Code::Internal);
    assert!(status.message().contains("sepal_width"));

    server.stop().await;
}

#[test_log::test(tokio::test)]
async fn missing_model_never_binds() {
    let scratch = std::net::TcpListener::bind("127.0.0.1:0").expect("scratch bind");
    let port = scratch.local_addr().expect("scratch addr").port();
    drop(scratch);

    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("model.json");
    let config = config(missing.display().to_string(), port);

    let err = serve(&config, CancellationToken::new())
        .await
        .expect_err("load must fail");
    assert!(matches!(err, ServeError::Load(_)));

    // The port is still free, so nothing was ever bound to it.
    std::net::TcpListener::bind(("127.0.0.1", port)).expect("port still free");
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
async fn concurrent_predictions_match_sequential() {
    let server = TestServer::start("iris_logistic.json", 3).await;
    let client = server.client().await;
    let engine = InferenceEngine::load(fixture("iris_logistic.json")).expect("engine");

    let inputs = (0..24)
        .map(|i| {
            let step = i as f64 * 0.1;
            [4.5 + step, 3.4 - step * 0.3, 1.0 + step * 2.0, 0.1 + step]
        })
        .collect::<Vec<_>>();

    let calls = inputs.iter().map(|values| {
        let mut client = client.clone();
        let features = iris(*values);
        async move { client.predict(PredictRequest { features }).await }
    });
    let responses = join_all(calls).await;

    for (values, response) in inputs.iter().zip(responses) {
        let response = response.expect("predict").into_inner();
        let features =
            normalize(iris(*values).into_iter().map(|f| (f.name, f.value))).expect("normalize");
        let expected = engine.predict(&features).expect("sequential predict");
        assert_eq!(response.prediction, expected.label);
        assert_eq!(response.confidence, expected.confidence);
    }

    server.stop().await;
}

#[test_log::test(tokio::test)]
async fn cancelled_server_stops_cleanly() {
    let server = TestServer::start("iris_logistic.json", 10).await;
    let addr = server.addr;
    let mut client = server.client().await;
    client.health(HealthRequest {}).await.expect("health");
    drop(client);

    server.stop().await;

    let reconnect = PredictionServiceClient::connect(format!("http://{}", addr)).await;
    assert!(reconnect.is_err());
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
async fn abandoned_calls_keep_their_worker_slot() {
    let slow = SlowPredict::new(Duration::from_millis(400));
    let server = TestServer::start_with(slow.clone(), 1).await;
    let client = server.client().await;

    let calls = (0..4).map(|i| {
        let mut client = client.clone();
        async move {
            let mut request = tonic::Request::new(PredictRequest {
                features: vec![Feature::new("a", i as f64)],
            });
            request.set_timeout(Duration::from_millis(50));
            client.predict(request).await
        }
    });
    for result in join_all(calls).await {
        assert!(result.is_err());
    }

    // Waits for the slot held by the first abandoned inference.
    let mut client = client.clone();
    client
        .predict(PredictRequest {
            features: vec![Feature::new("a", 9.0)],
        })
        .await
        .expect("predict after deadlines");

    assert_eq!(slow.peak.load(Ordering::SeqCst), 1);

    server.stop().await;
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
async fn shutdown_drains_in_flight_call() {
    let slow = SlowPredict::new(Duration::from_millis(300));
    let server = TestServer::start_with(slow.clone(), 2).await;
    let mut client = server.client().await;

    let in_flight = tokio::spawn(async move {
        client
            .predict(PredictRequest {
                features: vec![Feature::new("a", 1.0)],
            })
            .await
    });
    while slow.running.load(Ordering::SeqCst) == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    server.shutdown.cancel();

    let response = in_flight
        .await
        .expect("join")
        .expect("in-flight call completes")
        .into_inner();
    assert_eq!(response.prediction, "x");
    assert_eq!(response.confidence, 0.9);
    assert_eq!(slow.finished.load(Ordering::SeqCst), 1);

    server.handle.await.expect("join").expect("serve");
}
