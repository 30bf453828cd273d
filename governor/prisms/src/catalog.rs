// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Built-in prisms and the defaults that go with them.

use crate::indicator::{Indicator, IndicatorPrism};
use governor_core::domain::config::{default_states, CausalConfig, GovernorConfigManifest};
use governor_core::domain::evaluator::{Evaluator, EvaluatorCatalog, EvaluatorError};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const HUMAN_CENTRIC: &str = "human_centric";
pub const EQUITY_FOCUSED: &str = "equity_focused";
pub const INNOVATION_FOCUSED: &str = "innovation_focused";
pub const ECOCENTRIC: &str = "ecocentric";
pub const SENTIENT_FIRST: &str = "sentient_first";

pub const OUTCOME_VARIABLE: &str = "final_score";

pub fn human_centric() -> Result<Arc<dyn Evaluator>, EvaluatorError> {
    Ok(Arc::new(IndicatorPrism::new(
        HUMAN_CENTRIC,
        vec![
            Indicator::required("wellbeing", "Human wellbeing"),
            Indicator::optional("human_impact", "Direct human impact"),
            Indicator::optional("bias_reduction", "Bias reduction"),
            Indicator::optional("fairness_score", "Fairness"),
        ],
    )?))
}

pub fn equity_focused() -> Result<Arc<dyn Evaluator>, EvaluatorError> {
    Ok(Arc::new(IndicatorPrism::new(
        EQUITY_FOCUSED,
        vec![
            Indicator::required("bias_mitigation", "Bias mitigation"),
            Indicator::optional("equity_impact", "Equity impact"),
            Indicator::optional("equity_score", "Equity of outcomes"),
        ],
    )?))
}

pub fn innovation_focused() -> Result<Arc<dyn Evaluator>, EvaluatorError> {
    Ok(Arc::new(IndicatorPrism::new(
        INNOVATION_FOCUSED,
        vec![
            Indicator::required("technological_advancement", "Technological advancement"),
            Indicator::optional("innovation_impact", "Innovation impact"),
            Indicator::optional("financial_risk", "Financial risk").negative(),
        ],
    )?))
}

pub fn ecocentric() -> Result<Arc<dyn Evaluator>, EvaluatorError> {
    Ok(Arc::new(IndicatorPrism::new(
        ECOCENTRIC,
        vec![
            Indicator::required("carbon_footprint", "Carbon footprint").negative(),
            Indicator::optional("environmental_impact", "Environmental harm").negative(),
        ],
    )?))
}

/// Also accepts the AI ethics indicator under the key `AI_ethics_score`.
pub fn sentient_first() -> Result<Arc<dyn Evaluator>, EvaluatorError> {
    Ok(Arc::new(IndicatorPrism::new(
        SENTIENT_FIRST,
        vec![
            Indicator::required("sentient_welfare", "Sentient welfare"),
            Indicator::required("empathy_score", "Empathy toward sentient beings"),
            Indicator::required("autonomy_respect", "Respect for autonomy"),
            Indicator::required("sentient_safety", "Sentient safety measures"),
            Indicator::required("organisational_welfare", "Organisational welfare"),
            Indicator::optional("ai_ethics_score", "AI ethics").with_alias("AI_ethics_score"),
        ],
    )?))
}

/// Every built-in prism, in discovery order.
pub fn builtin_catalog() -> EvaluatorCatalog {
    EvaluatorCatalog::new()
        .with(HUMAN_CENTRIC, human_centric)
        .with(EQUITY_FOCUSED, equity_focused)
        .with(INNOVATION_FOCUSED, innovation_focused)
        .with(ECOCENTRIC, ecocentric)
        .with(SENTIENT_FIRST, sentient_first)
}

pub fn default_weights() -> BTreeMap<String, f64> {
    BTreeMap::from([
        (EQUITY_FOCUSED.to_string(), 0.3),
        (HUMAN_CENTRIC.to_string(), 0.3),
        (INNOVATION_FOCUSED.to_string(), 0.15),
        (ECOCENTRIC.to_string(), 0.15),
        (SENTIENT_FIRST.to_string(), 0.1),
    ])
}

/// Each prism as a binary parent of the outcome variable.
pub fn default_causal_structure() -> CausalConfig {
    let prisms = [HUMAN_CENTRIC, EQUITY_FOCUSED, INNOVATION_FOCUSED, ECOCENTRIC, SENTIENT_FIRST];

    let mut variables: BTreeMap<String, Vec<String>> = prisms
        .iter()
        .map(|prism| (prism.to_string(), default_states()))
        .collect();
    variables.insert(OUTCOME_VARIABLE.to_string(), default_states());

    CausalConfig {
        outcome_variable: OUTCOME_VARIABLE.to_string(),
        variables,
        edges: prisms
            .iter()
            .map(|prism| [prism.to_string(), OUTCOME_VARIABLE.to_string()])
            .collect(),
    }
}

/// Manifest wired to the built-in prisms, default weights and causal structure.
pub fn default_config() -> GovernorConfigManifest {
    let mut manifest = GovernorConfigManifest::default();
    manifest.spec.weights.initial = default_weights();
    manifest.spec.causal = default_causal_structure();
    manifest
}
