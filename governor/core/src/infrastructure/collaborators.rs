// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Default collaborator implementations.

use crate::domain::collaborators::{ActionController, ScenarioDetector};
use crate::domain::evaluator::InputData;
use crate::domain::report::EvaluationReport;
use async_trait::async_trait;
use serde_json::Value;

pub const DEFAULT_SCENARIO: &str = "general";

/// Action controller that records each decision in the log and does nothing else.
#[derive(Debug, Clone, Default)]
pub struct LoggingActionController;

#[async_trait]
impl ActionController for LoggingActionController {
    async fn apply_decision(&self, report: &EvaluationReport) -> anyhow::Result<()> {
        tracing::info!(
            scenario = %report.summary.scenario,
            final_score = report.summary.final_score,
            "Decision applied"
        );
        Ok(())
    }
}

/// Reads the scenario label from a top-level string field.
#[derive(Debug, Clone)]
pub struct FieldScenarioDetector {
    field: String,
    fallback: String,
}

impl FieldScenarioDetector {
    pub fn new(field: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            fallback: fallback.into(),
        }
    }
}

impl Default for FieldScenarioDetector {
    fn default() -> Self {
        Self::new("scenario", DEFAULT_SCENARIO)
    }
}

impl ScenarioDetector for FieldScenarioDetector {
    fn detect_scenario(&self, input: &InputData) -> String {
        match input.get(&self.field) {
            Some(Value::String(label)) if !label.trim().is_empty() => label.clone(),
            _ => self.fallback.clone(),
        }
    }
}
