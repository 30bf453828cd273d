// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Aggregation Engine
//!
//! Runs every evaluator against its slice of the input and combines the
//! scores with the current weight vector:
//!
//! ```text
//! composite = Σ w[e]·score[e] / Σ w[e]     for e ∈ evaluators ∩ weights
//! ```
//!
//! Input routing: the pipeline input is nested per dimension, and each
//! evaluator receives `input[evaluator_id]` (an empty mapping when that key is
//! absent or not an object).
//!
//! Evaluators run concurrently on the blocking pool and are all joined before
//! the weighted sum. An evaluator that errors or panics is logged and left out
//! of both the results and the sum. Evaluators without a weight keep their
//! results (and metrics) in the outcome but contribute nothing to the score.

use crate::domain::evaluator::{Evaluator, EvaluatorId, EvaluatorResult, InputData};
use crate::domain::weights::WeightVector;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AggregationError {
    #[error("No applicable evaluators: no successful evaluator has a positive weight")]
    NoApplicableEvaluators,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorFailure {
    pub evaluator_id: EvaluatorId,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregationOutcome {
    pub composite_score: f64,
    /// Every successful evaluator, weighted or not.
    pub results: BTreeMap<EvaluatorId, EvaluatorResult>,
    /// Successful evaluators absent from the weight vector.
    pub unweighted: Vec<EvaluatorId>,
    pub failures: Vec<EvaluatorFailure>,
}

/// The mapping routed to one evaluator.
pub fn route_input(input: &InputData, id: &EvaluatorId) -> InputData {
    match input.get(id.as_str()) {
        Some(Value::Object(fields)) => fields.clone(),
        _ => InputData::new(),
    }
}

pub async fn aggregate(
    input: &InputData,
    evaluators: &[Arc<dyn Evaluator>],
    weights: &WeightVector,
) -> Result<AggregationOutcome, AggregationError> {
    let mut handles = Vec::with_capacity(evaluators.len());
    for evaluator in evaluators {
        let evaluator = evaluator.clone();
        let id = evaluator.id().clone();
        let routed = route_input(input, &id);
        handles.push((
            id,
            tokio::task::spawn_blocking(move || evaluator.evaluate(&routed)),
        ));
    }

    let mut results = BTreeMap::new();
    let mut failures = Vec::new();
    for (id, handle) in handles {
        let error = match handle.await {
            Ok(Ok(result)) if !result.score.is_finite() => {
                format!("evaluator returned non-finite score {}", result.score)
            }
            Ok(Ok(result)) => {
                tracing::debug!(evaluator = %id, score = result.score, "Evaluator scored");
                metrics::counter!("governor_evaluations_total", "evaluator" => id.to_string())
                    .increment(1);
                results.insert(id, result);
                continue;
            }
            Ok(Err(e)) => e.to_string(),
            Err(e) => format!("evaluator task failed: {}", e),
        };

        tracing::warn!(evaluator = %id, "Evaluator failed: {}", error);
        metrics::counter!("governor_evaluator_failures_total", "evaluator" => id.to_string())
            .increment(1);
        failures.push(EvaluatorFailure {
            evaluator_id: id,
            error,
        });
    }

    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    let mut unweighted = Vec::new();
    for (id, result) in &results {
        match weights.get(id.as_str()) {
            Some(weight) => {
                weighted_sum += weight * result.score;
                weight_total += weight;
            }
            None => unweighted.push(id.clone()),
        }
    }

    if !unweighted.is_empty() {
        tracing::debug!(?unweighted, "Evaluators without weight excluded from composite score");
    }

    if weight_total <= 0.0 {
        return Err(AggregationError::NoApplicableEvaluators);
    }

    Ok(AggregationOutcome {
        composite_score: weighted_sum / weight_total,
        results,
        unweighted,
        failures,
    })
}
