// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests: the built-in prisms wired through the full governor.
//!
//! Exercises the default configuration end to end: catalog discovery, the
//! built-in contextual rules, weighted aggregation, causal prediction over
//! the five-prism network, history persistence and action dispatch.

use async_trait::async_trait;
use governor_core::application::{Governor, GovernorBuilder};
use governor_core::domain::causal::{ModelState, TabularCpd};
use governor_core::domain::collaborators::ActionController;
use governor_core::domain::evaluator::{EvaluatorId, InputData};
use governor_core::domain::events::GovernorEvent;
use governor_core::domain::report::{CausalStatus, EvaluationReport};
use governor_prisms::catalog::{ECOCENTRIC, EQUITY_FOCUSED, HUMAN_CENTRIC, INNOVATION_FOCUSED, SENTIENT_FIRST};
use governor_prisms::{builtin_catalog, default_config, FixedScorePrism};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

const PRISMS: [&str; 5] = [HUMAN_CENTRIC, EQUITY_FOCUSED, INNOVATION_FOCUSED, ECOCENTRIC, SENTIENT_FIRST];

struct UnreachableHost;

#[async_trait]
impl ActionController for UnreachableHost {
    async fn apply_decision(&self, _report: &EvaluationReport) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("host rejected decision"))
    }
}

#[derive(Default)]
struct RecordingHost {
    reports: Mutex<Vec<EvaluationReport>>,
}

#[async_trait]
impl ActionController for RecordingHost {
    async fn apply_decision(&self, report: &EvaluationReport) -> anyhow::Result<()> {
        self.reports.lock().push(report.clone());
        Ok(())
    }
}

fn proposal() -> Value {
    json!({
        "scenario": "loan_approval",
        "human_centric": {
            "wellbeing": 0.9,
            "human_impact": 0.7,
            "bias_reduction": 0.75,
            "fairness_score": 0.85
        },
        "equity_focused": {"bias_mitigation": 0.8, "equity_score": 0.9},
        "innovation_focused": {"technological_advancement": 0.6, "financial_risk": 0.8},
        "ecocentric": {"carbon_footprint": 0.2, "environmental_impact": 0.3},
        "sentient_first": {
            "sentient_welfare": 0.4,
            "empathy_score": 0.7,
            "autonomy_respect": 0.8,
            "sentient_safety": 0.9,
            "organisational_welfare": 0.6
        }
    })
}

fn input(value: Value) -> InputData {
    value.as_object().cloned().unwrap()
}

fn governor() -> Governor {
    let mut config = default_config();
    config.spec.adaptation.seed = Some(2026);
    GovernorBuilder::new()
        .with_config(config)
        .with_catalog(builtin_catalog())
        .build()
        .unwrap()
}

/// Priors of one half each; `P(final_score = high)` grows with the number of
/// prisms in state `high`.
fn five_prism_cpds() -> Vec<TabularCpd> {
    let mut cpds: Vec<TabularCpd> = PRISMS
        .iter()
        .map(|prism| TabularCpd::prior(*prism, vec![0.5, 0.5]))
        .collect();

    let columns = 1usize << PRISMS.len();
    let mut low = Vec::with_capacity(columns);
    let mut high = Vec::with_capacity(columns);
    for column in 0..columns {
        let highs = column.count_ones() as f64;
        let p_high = (highs + 0.5) / 6.0;
        high.push(p_high);
        low.push(1.0 - p_high);
    }
    cpds.push(TabularCpd::new(
        "final_score",
        PRISMS.iter().map(|p| p.to_string()).collect(),
        vec![low, high],
    ));
    cpds
}

#[tokio::test]
async fn test_builtin_prisms_discovered() {
    let governor = governor();
    let ids: Vec<String> = governor.registry().ids().iter().map(|id| id.to_string()).collect();
    assert_eq!(ids, PRISMS.to_vec());
    assert!(governor.discovery().skipped.is_empty());
}

#[tokio::test]
async fn test_full_proposal_fires_rules_and_scores() {
    let governor = governor();
    let mut rules_fired = governor.event_bus().subscribe_kinds(&["rule_fired"]);

    let report = governor.evaluate(&input(proposal())).await.unwrap();
    assert_eq!(report.summary.scenario, "loan_approval");
    assert_eq!(rules_fired.drain().len(), 5);

    let weights = &report.full_report.weight_adjustments;
    assert!(weights.is_normalized());
    // equity 0.36, human 0.33, eco 0.18, innovation 0.12, sentient 0.09 before normalization
    assert!((weights.get(EQUITY_FOCUSED).unwrap() - 0.36 / 1.08).abs() < 1e-9);
    assert!((weights.get(SENTIENT_FIRST).unwrap() - 0.09 / 1.08).abs() < 1e-9);

    let scores: Vec<f64> = PRISMS
        .iter()
        .map(|p| report.full_report.prism_results[&EvaluatorId::new(*p).unwrap()].score)
        .collect();
    let expected_scores = [0.8, 0.85, 0.4, 0.75, 0.68];
    for (score, expected) in scores.iter().zip(expected_scores) {
        assert!((score - expected).abs() < 1e-9);
    }

    let expected = (0.33 * 0.8 + 0.36 * 0.85 + 0.12 * 0.4 + 0.18 * 0.75 + 0.09 * 0.68) / 1.08;
    assert!((report.summary.final_score - expected).abs() < 1e-9);
}

#[tokio::test]
async fn test_prism_metrics_carry_narratives() {
    let governor = governor();
    let report = governor.evaluate(&input(proposal())).await.unwrap();
    let eco = &report.full_report.prism_results[&EvaluatorId::new(ECOCENTRIC).unwrap()];
    assert_eq!(eco.metrics["carbon_footprint"]["value"], json!(0.2));
    assert!(eco.metrics["carbon_footprint"]["narrative"]
        .as_str()
        .unwrap()
        .starts_with("Carbon footprint is 0.20"));
}

#[tokio::test]
async fn test_incomplete_dimension_is_isolated() {
    let governor = governor();
    let mut proposal = proposal();
    proposal["sentient_first"] = json!({"sentient_welfare": 0.9});

    let report = governor.evaluate(&input(proposal)).await.unwrap();
    assert_eq!(report.full_report.prism_results.len(), 4);
    assert!(!report
        .full_report
        .prism_results
        .contains_key(&EvaluatorId::new(SENTIENT_FIRST).unwrap()));
    assert!(report.summary.final_score > 0.0);
}

#[tokio::test]
async fn test_causal_prediction_over_five_prism_network() {
    let governor = governor();
    let install = governor.install_cpds(five_prism_cpds()).await.unwrap();
    assert!(install.applied(), "{:?}", install);
    assert_eq!(governor.causal_model().state(), ModelState::Ready);

    let report = governor.evaluate(&input(proposal())).await.unwrap();
    let analysis = &report.full_report.causal_analysis;
    assert_eq!(analysis.status, CausalStatus::Ready);
    assert_eq!(analysis.evidence[INNOVATION_FOCUSED], "low");
    assert_eq!(analysis.evidence[HUMAN_CENTRIC], "high");

    // four prisms high → (4 + 0.5) / 6
    let predictions = &report.summary.impact_predictions;
    assert!((predictions["high"] - 0.75).abs() < 1e-9);
    assert!((predictions.values().sum::<f64>() - 1.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_host_failure_is_swallowed() {
    let mut config = default_config();
    config.spec.adaptation.seed = Some(1);
    let governor = GovernorBuilder::new()
        .with_config(config)
        .with_catalog(builtin_catalog())
        .with_action_controller(Arc::new(UnreachableHost))
        .build()
        .unwrap();
    let mut events = governor.subscribe();

    let report = governor.evaluate(&input(proposal())).await.unwrap();
    assert!(report.summary.final_score > 0.0);

    let events = events.drain();
    assert!(events
        .iter()
        .any(|e| matches!(e, GovernorEvent::ActionDispatchFailed { error, .. } if error.contains("host rejected"))));
    assert!(events
        .iter()
        .any(|e| matches!(e, GovernorEvent::EvaluationCompleted { .. })));
}

#[tokio::test]
async fn test_host_receives_report() {
    let host = Arc::new(RecordingHost::default());
    let governor = GovernorBuilder::new()
        .with_config(default_config())
        .with_catalog(builtin_catalog())
        .with_action_controller(host.clone())
        .build()
        .unwrap();

    let report = governor.evaluate(&input(proposal())).await.unwrap();
    let received = host.reports.lock();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0], report);
}

#[tokio::test]
async fn test_custom_prism_alongside_builtins() {
    let mut config = default_config();
    config.spec.weights.initial.insert("custom".to_string(), 0.5);
    let governor = GovernorBuilder::new()
        .with_config(config)
        .with_catalog(builtin_catalog())
        .with_evaluator(Arc::new(
            FixedScorePrism::new("custom", 0.95).unwrap().with_metric("custom_metric", 0.8),
        ))
        .build()
        .unwrap();

    assert_eq!(governor.registry().len(), 6);
    let report = governor.evaluate(&input(json!({}))).await.unwrap();
    // Every built-in prism lacks its required indicators; only the custom one scores.
    assert!((report.summary.final_score - 0.95).abs() < 1e-12);
    assert_eq!(report.full_report.prism_results.len(), 1);
}

#[tokio::test]
async fn test_history_and_model_persist_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let build = || {
        let mut config = default_config();
        config.spec.persistence.history_path = Some(dir.path().join("history").join("decisions.jsonl"));
        config.spec.persistence.causal_model_path = Some(dir.path().join("models").join("causal.json"));
        GovernorBuilder::new()
            .with_config(config)
            .with_catalog(builtin_catalog())
            .build()
            .unwrap()
    };

    let first = build();
    let summary = first.load().await.unwrap();
    assert_eq!(summary.history_records, 0);
    assert_eq!(summary.causal_state, ModelState::Uninitialized);

    for _ in 0..3 {
        first.evaluate(&input(proposal())).await.unwrap();
    }
    first.install_cpds(five_prism_cpds()).await.unwrap();
    let written = first.history().await.unwrap();

    let second = build();
    let summary = second.load().await.unwrap();
    assert_eq!(summary.history_records, 3);
    assert_eq!(summary.causal_state, ModelState::Ready);
    assert_eq!(second.history().await.unwrap(), written);

    let report = second.evaluate(&input(proposal())).await.unwrap();
    assert_eq!(report.full_report.causal_analysis.status, CausalStatus::Ready);
}

#[tokio::test]
async fn test_refine_after_feedback() {
    let governor = governor();
    governor.evaluate(&input(proposal())).await.unwrap();
    let before = governor.weights();

    let after = governor.refine(0.9, 1.0);
    assert!(after.is_normalized());
    assert_ne!(before, after);
    assert_eq!(after.len(), PRISMS.len());
}
