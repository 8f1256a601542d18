use std::path::PathBuf;
use thiserror::Error;

/// Caller-supplied feature defects, rejected before any inference work.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("At least one feature is required")]
    EmptyFeatureSet,

    #[error("Feature names cannot be empty")]
    InvalidFeatureName,

    #[error("Duplicate feature name: {name}")]
    DuplicateFeatureName { name: String },
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("model file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read model file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse model file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid model artifact: {msg}")]
    Invalid { msg: String },
}

#[derive(Error, Debug)]
pub enum InferError {
    #[error("missing feature required by model: {name}")]
    MissingFeature { name: String },

    #[error("feature not known to model: {name}")]
    UnknownFeature { name: String },

    #[error("expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("model produced a non-finite score for class {class}")]
    NonFiniteScore { class: String },

    #[error("generic error: {msg}")]
    GenericError { msg: String },
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Inference(#[from] InferError),
}

impl ServiceError {
    pub fn code(&self) -> tonic::Code {
        match self {
            ServiceError::Validation(_) => tonic::Code::InvalidArgument,
            ServiceError::Inference(_) => tonic::Code::Internal,
        }
    }
}

impl From<ServiceError> for tonic::Status {
    fn from(err: ServiceError) -> Self {
        tonic::Status::new(err.code(), err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("failed to load model: {0}")]
    Load(#[from] LoadError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("transport error: {source}")]
    Transport { source: tonic::transport::Error },

    #[error("invalid config: {msg}")]
    Config { msg: String },
}

impl From<tonic::transport::Error> for ServeError {
    fn from(err: tonic::transport::Error) -> Self {
        ServeError::Transport { source: err }
    }
}
