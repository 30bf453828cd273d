// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Host-side collaborators of the pipeline orchestrator.

use crate::domain::evaluator::InputData;
use crate::domain::report::EvaluationReport;
use async_trait::async_trait;

/// Applies a finished decision in the host system.
///
/// Failures are logged by the orchestrator and never affect the returned report.
#[async_trait]
pub trait ActionController: Send + Sync {
    async fn apply_decision(&self, report: &EvaluationReport) -> anyhow::Result<()>;
}

/// Derives a scenario label from the raw pipeline input.
pub trait ScenarioDetector: Send + Sync {
    fn detect_scenario(&self, input: &InputData) -> String;
}
