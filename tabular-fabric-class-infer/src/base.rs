use crate::errors::{InferError, ValidationError};
use std::collections::HashSet;

/// Validated features of one request, in submission order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    entries: Vec<(String, f64)>,
}

impl FeatureSet {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(entry_name, _)| entry_name == name)
            .map(|(_, value)| *value)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}

// Empty input is rejected first; blank and duplicate names are checked in
// one pass, so the first offending entry decides.
pub fn normalize<I, S>(raw: I) -> Result<FeatureSet, ValidationError>
where
    I: IntoIterator<Item = (S, f64)>,
    S: Into<String>,
{
    let mut entries = vec![];
    let mut seen_names = HashSet::new();

    for (name, value) in raw {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::InvalidFeatureName);
        }
        if !seen_names.insert(name.clone()) {
            return Err(ValidationError::DuplicateFeatureName { name });
        }
        entries.push((name, value));
    }

    if entries.is_empty() {
        return Err(ValidationError::EmptyFeatureSet);
    }
    Ok(FeatureSet { entries })
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    /// Always within `[0, 1]`.
    pub confidence: f64,
}

#[cfg_attr(test, mockall::automock)]
pub trait Predict: Send + Sync {
    fn predict(&self, features: &FeatureSet) -> Result<Prediction, InferError>;
}
