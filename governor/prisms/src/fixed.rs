// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Prism that ignores its input and reports a configured score.
//!
//! Stands in for host-specific evaluators during integration and as the
//! minimal example of the evaluator contract.

use governor_core::domain::evaluator::{Evaluator, EvaluatorError, EvaluatorId, EvaluatorResult, InputData, Metrics};
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct FixedScorePrism {
    id: EvaluatorId,
    score: f64,
    metrics: Metrics,
}

impl FixedScorePrism {
    pub fn new(id: &str, score: f64) -> Result<Self, EvaluatorError> {
        if !score.is_finite() {
            return Err(EvaluatorError::Construction(format!(
                "prism '{id}' score must be finite"
            )));
        }
        Ok(Self {
            id: EvaluatorId::new(id)?,
            score,
            metrics: Metrics::new(),
        })
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metrics.insert(name.into(), value.into());
        self
    }
}

impl Evaluator for FixedScorePrism {
    fn id(&self) -> &EvaluatorId {
        &self.id
    }

    fn evaluate(&self, _input: &InputData) -> Result<EvaluatorResult, EvaluatorError> {
        Ok(EvaluatorResult {
            score: self.score,
            metrics: self.metrics.clone(),
        })
    }
}
