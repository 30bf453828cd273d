// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Append-only decision history entries.

use crate::domain::evaluator::{EvaluatorId, EvaluatorResult};
use crate::domain::weights::WeightVector;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecisionId(pub Uuid);

impl DecisionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DecisionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DecisionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One completed pipeline run. Never mutated after append; corrections are
/// new records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub id: DecisionId,
    pub timestamp: DateTime<Utc>,
    pub scenario: String,
    pub weights_used: WeightVector,
    pub per_evaluator_results: BTreeMap<EvaluatorId, EvaluatorResult>,
    pub composite_score: f64,
}

impl DecisionRecord {
    pub fn new(
        scenario: impl Into<String>,
        weights_used: WeightVector,
        per_evaluator_results: BTreeMap<EvaluatorId, EvaluatorResult>,
        composite_score: f64,
    ) -> Self {
        Self {
            id: DecisionId::new(),
            timestamp: Utc::now(),
            scenario: scenario.into(),
            weights_used,
            per_evaluator_results,
            composite_score,
        }
    }

    /// Score recorded for `id`, if that evaluator produced a result.
    pub fn score_of(&self, id: &str) -> Option<f64> {
        self.per_evaluator_results.get(id).map(|r| r.score)
    }
}
