use serde::{Deserialize, Serialize};

use crate::errors::{InferError, LoadError};
use crate::models::{
    check_row, first_argmax, invalid, validate_matrix, validate_schema, Classifier,
    ProbabilisticClassifier,
};

// A binary model may carry a single coefficient row scored through a sigmoid;
// otherwise there is one row per class and softmax.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogisticRegression {
    pub feature_names: Vec<String>,
    pub classes: Vec<String>,
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
}

impl LogisticRegression {
    pub(crate) fn validate(&self) -> Result<(), LoadError> {
        validate_schema(&self.feature_names, &self.classes)?;
        if self.classes.len() < 2 {
            return Err(invalid("logistic regression needs at least two classes"));
        }
        let rows = if self.is_binary() { 1 } else { self.classes.len() };
        validate_matrix("coefficients", &self.coefficients, rows, self.feature_names.len())?;
        if self.intercepts.len() != rows {
            return Err(invalid(format!(
                "intercepts has {} entries, expected {}",
                self.intercepts.len(),
                rows
            )));
        }
        if self.intercepts.iter().any(|v| !v.is_finite()) {
            return Err(invalid("intercepts are not finite"));
        }
        Ok(())
    }

    fn is_binary(&self) -> bool {
        self.classes.len() == 2 && self.coefficients.len() == 1
    }

    fn decision_function(&self, row: &[f64]) -> Result<Vec<f64>, InferError> {
        check_row(row, self.feature_names.len())?;
        let scores = self
            .coefficients
            .iter()
            .zip(self.intercepts.iter())
            .map(|(coef, intercept)| {
                coef.iter().zip(row.iter()).map(|(c, x)| c * x).sum::<f64>() + intercept
            })
            .collect::<Vec<_>>();

        if let Some(pos) = scores.iter().position(|s| !s.is_finite()) {
            let class = if self.is_binary() {
                self.classes[1].clone()
            } else {
                self.classes[pos].clone()
            };
            return Err(InferError::NonFiniteScore { class });
        }
        Ok(scores)
    }
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps = scores.iter().map(|s| (s - max).exp()).collect::<Vec<_>>();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

fn sigmoid(score: f64) -> f64 {
    1.0 / (1.0 + (-score).exp())
}

impl Classifier for LogisticRegression {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn predict_label(&self, row: &[f64]) -> Result<String, InferError> {
        let scores = self.decision_function(row)?;
        let idx = if self.is_binary() {
            usize::from(scores[0] > 0.0)
        } else {
            first_argmax(&scores).ok_or_else(|| InferError::GenericError {
                msg: "no class could be selected".to_string(),
            })?
        };
        Ok(self.classes[idx].clone())
    }
}

impl ProbabilisticClassifier for LogisticRegression {
    fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>, InferError> {
        let scores = self.decision_function(row)?;
        if self.is_binary() {
            let positive = sigmoid(scores[0]);
            Ok(vec![1.0 - positive, positive])
        } else {
            Ok(softmax(&scores))
        }
    }
}
