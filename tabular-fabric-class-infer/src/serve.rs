use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};
use tracing::{error, info};

use crate::config::Config;
use crate::errors::ServeError;
use crate::infer::InferenceEngine;
use crate::proto::tonic_gen::prediction_service_server::{
    PredictionService as PredictionRpc, PredictionServiceServer,
};
use crate::proto::{HealthRequest, HealthResponse, PredictRequest, PredictResponse};
use crate::service::PredictionService;

pub struct GrpcPredictionService {
    service: Arc<PredictionService>,
    workers: Arc<Semaphore>,
}

impl GrpcPredictionService {
    pub fn new(service: PredictionService, max_workers: usize) -> Self {
        Self {
            service: Arc::new(service),
            workers: Arc::new(Semaphore::new(max_workers)),
        }
    }
}

#[tonic::async_trait]
impl PredictionRpc for GrpcPredictionService {
    async fn health(
        &self,
        _request: Request<HealthRequest>,
    ) -> Result<Response<HealthResponse>, Status> {
        Ok(Response::new(self.service.health().into()))
    }

    async fn predict(
        &self,
        request: Request<PredictRequest>,
    ) -> Result<Response<PredictResponse>, Status> {
        let features = request.into_inner().features;
        let permit = self
            .workers
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| Status::internal(format!("worker pool closed: {}", e)))?;

        let service = self.service.clone();
        // Held by the blocking task, not this future, which a caller may abandon.
        let result = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            service.predict(features)
        })
        .await
        .map_err(|e| {
            error!("prediction worker failed: {}", e);
            Status::internal(format!("prediction worker failed: {}", e))
        })?;

        result.map(Response::new).map_err(Status::from)
    }
}

/// A bound, not yet serving, prediction server.
pub struct PredictionServer {
    listener: TcpListener,
    service: GrpcPredictionService,
}

impl PredictionServer {
    pub async fn bind(
        addr: &str,
        service: PredictionService,
        max_workers: usize,
    ) -> Result<Self, ServeError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServeError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        Ok(Self {
            listener,
            service: GrpcPredictionService::new(service, max_workers),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServeError> {
        self.listener
            .local_addr()
            .map_err(|source| ServeError::Bind {
                addr: "<bound listener>".to_string(),
                source,
            })
    }

    /// Serve until `shutdown` is cancelled, then stop accepting and wait for
    /// in-flight calls to finish.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), ServeError> {
        let addr = self.local_addr()?;
        info!("grpc server listening on {}", addr);

        tonic::transport::Server::builder()
            .add_service(PredictionServiceServer::new(self.service))
            .serve_with_incoming_shutdown(
                TcpListenerStream::new(self.listener),
                async move { shutdown.cancelled().await },
            )
            .await?;

        info!("grpc server on {} drained", addr);
        Ok(())
    }
}

/// Load the model, bind the configured port and serve until `shutdown`.
pub async fn serve(config: &Config, shutdown: CancellationToken) -> Result<(), ServeError> {
    config.validate()?;

    let engine = InferenceEngine::load(&config.model_path)?;
    let service = PredictionService::new(Arc::new(engine), config.model_version.clone());
    info!(
        "prediction service ready, model version {}",
        service.model_version()
    );

    let server = PredictionServer::bind(&config.listen_addr(), service, config.max_workers).await?;
    server.run(shutdown).await
}
