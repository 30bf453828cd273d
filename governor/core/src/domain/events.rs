// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain events published on the governor event bus.

use crate::domain::evaluator::EvaluatorId;
use crate::domain::history::DecisionId;
use crate::domain::rules::Adjustment;
use crate::domain::weights::WeightVector;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why the weight vector changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptationKind {
    RuleDeltas,
    Exploration,
    RewardUpdate,
    Replaced,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GovernorEvent {
    EvaluationCompleted {
        decision_id: DecisionId,
        scenario: String,
        final_score: f64,
        completed_at: DateTime<Utc>,
    },
    RuleFired {
        rule: String,
        evaluator_id: EvaluatorId,
        adjustment: Adjustment,
        fired_at: DateTime<Utc>,
    },
    WeightsAdapted {
        kind: AdaptationKind,
        weights: WeightVector,
        adapted_at: DateTime<Utc>,
    },
    EvaluatorSkipped {
        evaluator_id: String,
        reason: String,
        skipped_at: DateTime<Utc>,
    },
    CausalModelInstalled {
        variables: usize,
        installed_at: DateTime<Utc>,
    },
    CpdRejected {
        variable: String,
        reason: String,
        rejected_at: DateTime<Utc>,
    },
    ActionDispatchFailed {
        decision_id: DecisionId,
        error: String,
        failed_at: DateTime<Utc>,
    },
}

impl GovernorEvent {
    /// Stable snake_case name of the variant, matching the serialized `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            GovernorEvent::EvaluationCompleted { .. } => "evaluation_completed",
            GovernorEvent::RuleFired { .. } => "rule_fired",
            GovernorEvent::WeightsAdapted { .. } => "weights_adapted",
            GovernorEvent::EvaluatorSkipped { .. } => "evaluator_skipped",
            GovernorEvent::CausalModelInstalled { .. } => "causal_model_installed",
            GovernorEvent::CpdRejected { .. } => "cpd_rejected",
            GovernorEvent::ActionDispatchFailed { .. } => "action_dispatch_failed",
        }
    }
}
