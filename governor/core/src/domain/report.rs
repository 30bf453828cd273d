// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Evaluation Report
//!
//! The value returned by one pipeline run. Serialized keys are consumed by
//! downstream tooling and must not change:
//!
//! ```json
//! {
//!   "summary":     { "final_score", "scenario", "impact_predictions" },
//!   "full_report": { "prism_results", "weight_adjustments", "causal_analysis" }
//! }
//! ```

use crate::domain::causal::{CausalError, OutcomeDistribution};
use crate::domain::evaluator::{EvaluatorId, EvaluatorResult};
use crate::domain::weights::WeightVector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub summary: ReportSummary,
    pub full_report: FullReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub final_score: f64,
    pub scenario: String,
    /// Outcome state → probability; empty when the causal query was unavailable.
    pub impact_predictions: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullReport {
    pub prism_results: BTreeMap<EvaluatorId, EvaluatorResult>,
    pub weight_adjustments: WeightVector,
    pub causal_analysis: CausalAnalysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CausalStatus {
    Ready,
    ModelNotReady,
    InferenceError,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausalAnalysis {
    pub status: CausalStatus,
    /// Variable → observed state name.
    pub evidence: BTreeMap<String, String>,
    pub distribution: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CausalAnalysis {
    pub fn from_query(
        evidence: BTreeMap<String, String>,
        result: &Result<OutcomeDistribution, CausalError>,
    ) -> Self {
        match result {
            Ok(distribution) => Self {
                status: CausalStatus::Ready,
                evidence,
                distribution: distribution.to_map(),
                error: None,
            },
            Err(CausalError::ModelNotReady) => Self {
                status: CausalStatus::ModelNotReady,
                evidence,
                distribution: BTreeMap::new(),
                error: Some(CausalError::ModelNotReady.to_string()),
            },
            Err(e) => Self {
                status: CausalStatus::InferenceError,
                evidence,
                distribution: BTreeMap::new(),
                error: Some(e.to_string()),
            },
        }
    }
}

impl EvaluationReport {
    pub fn final_score(&self) -> f64 {
        self.summary.final_score
    }

    pub fn scenario(&self) -> &str {
        &self.summary.scenario
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_key_shape_is_stable() {
        let report = EvaluationReport {
            summary: ReportSummary {
                final_score: 0.5,
                scenario: "general".to_string(),
                impact_predictions: BTreeMap::new(),
            },
            full_report: FullReport {
                prism_results: BTreeMap::new(),
                weight_adjustments: WeightVector::new(),
                causal_analysis: CausalAnalysis::from_query(
                    BTreeMap::new(),
                    &Err(CausalError::ModelNotReady),
                ),
            },
        };

        let json = serde_json::to_value(&report).unwrap();
        let keys = |value: &serde_json::Value| {
            let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
            keys.sort();
            keys
        };
        assert_eq!(keys(&json), vec!["full_report", "summary"]);
        assert_eq!(
            keys(&json["summary"]),
            vec!["final_score", "impact_predictions", "scenario"]
        );
        assert_eq!(
            keys(&json["full_report"]),
            vec!["causal_analysis", "prism_results", "weight_adjustments"]
        );

        assert_eq!(json["full_report"]["causal_analysis"]["status"], "model_not_ready");
    }

    #[test]
    fn test_causal_analysis_from_distribution() {
        let dist = OutcomeDistribution {
            variable: "final_score".to_string(),
            states: vec!["low".to_string(), "high".to_string()],
            probabilities: vec![0.25, 0.75],
        };
        let analysis = CausalAnalysis::from_query(BTreeMap::new(), &Ok(dist));
        assert_eq!(analysis.status, CausalStatus::Ready);
        assert_eq!(analysis.distribution.get("high"), Some(&0.75));
        assert!(analysis.error.is_none());
        let json = serde_json::to_value(&analysis).unwrap();
        assert!(json.get("error").is_none());
    }
}
