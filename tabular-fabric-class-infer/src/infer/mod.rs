pub mod engine;

pub use engine::{confidence_from_distribution, InferenceEngine};
