// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! A causal graph together with a complete, consistent CPD set.

use super::cpd::{CpdError, TabularCpd};
use super::graph::CausalGraph;
use super::inference::{eliminate, Evidence, OutcomeDistribution};
use super::CausalError;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Queryable model. Construction runs the model-wide consistency check, so
/// holding a `CausalModel` means every variable has a valid, normalized CPD.
#[derive(Debug, Clone)]
pub struct CausalModel {
    graph: Arc<CausalGraph>,
    outcome: String,
    cpds: BTreeMap<String, TabularCpd>,
}

impl CausalModel {
    pub fn assemble(
        graph: Arc<CausalGraph>,
        outcome: impl Into<String>,
        cpds: BTreeMap<String, TabularCpd>,
    ) -> Result<Self, CpdError> {
        if !graph.is_acyclic() {
            return Err(CpdError::Cyclic);
        }
        for variable in graph.variables() {
            let cpd = cpds
                .get(variable)
                .ok_or_else(|| CpdError::MissingCpd(variable.to_string()))?;
            cpd.validate(&graph)?;
            cpd.check_normalized()?;
        }
        if let Some(extra) = cpds.keys().find(|v| !graph.contains(v)) {
            return Err(CpdError::UnknownVariable(extra.clone()));
        }

        Ok(Self {
            graph,
            outcome: outcome.into(),
            cpds,
        })
    }

    pub fn graph(&self) -> &CausalGraph {
        &self.graph
    }

    pub fn outcome(&self) -> &str {
        &self.outcome
    }

    pub fn cpds(&self) -> &BTreeMap<String, TabularCpd> {
        &self.cpds
    }

    pub fn query(&self, evidence: &Evidence) -> Result<OutcomeDistribution, CausalError> {
        let probabilities = eliminate(&self.graph, &self.cpds, &self.outcome, evidence)
            .map_err(|e| CausalError::InferenceError(e.to_string()))?;

        Ok(OutcomeDistribution {
            variable: self.outcome.clone(),
            states: self
                .graph
                .states(&self.outcome)
                .map(<[String]>::to_vec)
                .unwrap_or_default(),
            probabilities,
        })
    }
}
