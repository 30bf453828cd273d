// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Exact inference by variable elimination over discrete factors.

use super::cpd::TabularCpd;
use super::graph::CausalGraph;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Observed state index per variable.
pub type Evidence = BTreeMap<String, usize>;

/// Dense non-negative function over a set of discrete variables.
///
/// `values` is laid out row-major over `scope`, last variable fastest, which
/// is exactly the layout of a [`TabularCpd`] with scope `[variable, evidence..]`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Factor {
    scope: Vec<String>,
    cards: Vec<usize>,
    values: Vec<f64>,
}

impl Factor {
    pub(crate) fn from_cpd(cpd: &TabularCpd, graph: &CausalGraph) -> Self {
        let mut scope = Vec::with_capacity(cpd.evidence.len() + 1);
        scope.push(cpd.variable.clone());
        scope.extend(cpd.evidence.iter().cloned());

        let cards = scope
            .iter()
            .map(|v| graph.cardinality(v).unwrap_or(0))
            .collect();

        Self {
            scope,
            cards,
            values: cpd.values.iter().flatten().copied().collect(),
        }
    }

    fn strides(cards: &[usize]) -> Vec<usize> {
        let mut strides = vec![1; cards.len()];
        for i in (0..cards.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * cards[i + 1];
        }
        strides
    }

    fn position(&self, var: &str) -> Option<usize> {
        self.scope.iter().position(|v| v == var)
    }

    fn contains(&self, var: &str) -> bool {
        self.position(var).is_some()
    }

    /// Fix `var` to `state` and drop it from the scope.
    fn reduce(&self, var: &str, state: usize) -> Self {
        let Some(axis) = self.position(var) else {
            return self.clone();
        };
        let strides = Self::strides(&self.cards);

        let mut scope = self.scope.clone();
        let mut cards = self.cards.clone();
        scope.remove(axis);
        cards.remove(axis);
        let size: usize = cards.iter().product();

        let out_strides = Self::strides(&cards);
        let mut values = Vec::with_capacity(size);
        for out_index in 0..size {
            let mut source = state * strides[axis];
            for (k, (&stride, &card)) in out_strides.iter().zip(&cards).enumerate() {
                let digit = (out_index / stride) % card;
                let src_axis = if k < axis { k } else { k + 1 };
                source += digit * strides[src_axis];
            }
            values.push(self.values[source]);
        }

        Self { scope, cards, values }
    }

    fn product(&self, other: &Factor) -> Self {
        let mut scope = self.scope.clone();
        let mut cards = self.cards.clone();
        for (var, &card) in other.scope.iter().zip(&other.cards) {
            if !scope.contains(var) {
                scope.push(var.clone());
                cards.push(card);
            }
        }

        let self_map: Vec<usize> = self
            .scope
            .iter()
            .filter_map(|v| scope.iter().position(|s| s == v))
            .collect();
        let other_map: Vec<usize> = other
            .scope
            .iter()
            .filter_map(|v| scope.iter().position(|s| s == v))
            .collect();
        let self_strides = Self::strides(&self.cards);
        let other_strides = Self::strides(&other.cards);
        let out_strides = Self::strides(&cards);

        let size: usize = cards.iter().product();
        let mut values = Vec::with_capacity(size);
        for out_index in 0..size {
            let digit = |axis: usize| (out_index / out_strides[axis]) % cards[axis];
            let a: usize = self_map
                .iter()
                .zip(&self_strides)
                .map(|(&axis, &stride)| digit(axis) * stride)
                .sum();
            let b: usize = other_map
                .iter()
                .zip(&other_strides)
                .map(|(&axis, &stride)| digit(axis) * stride)
                .sum();
            values.push(self.values[a] * other.values[b]);
        }

        Self { scope, cards, values }
    }

    /// Sum `var` out of the factor.
    fn marginalize(&self, var: &str) -> Self {
        let Some(axis) = self.position(var) else {
            return self.clone();
        };
        (0..self.cards[axis])
            .map(|state| self.reduce(var, state))
            .reduce(|acc, slice| {
                let values = acc.values.iter().zip(&slice.values).map(|(a, b)| a + b).collect();
                Self { values, ..acc }
            })
            .unwrap_or_else(|| self.clone())
    }

    fn unit() -> Self {
        Self {
            scope: Vec::new(),
            cards: Vec::new(),
            values: vec![1.0],
        }
    }
}

/// Failure modes of a single elimination run.
#[derive(Debug, Clone, Error, PartialEq)]
pub(crate) enum EliminationFailure {
    #[error("evidence references unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("state {state} is outside the domain of '{variable}' (cardinality {cardinality})")]
    StateOutOfRange {
        variable: String,
        state: usize,
        cardinality: usize,
    },

    #[error("evidence may not fix the outcome variable '{0}'")]
    EvidenceOnOutcome(String),

    #[error("evidence has zero probability under the model")]
    ZeroProbabilityEvidence,
}

/// `P(outcome | evidence)` by variable elimination.
///
/// Non-evidence variables are eliminated greedily, always picking the one
/// whose elimination creates the smallest intermediate factor.
pub(crate) fn eliminate(
    graph: &CausalGraph,
    cpds: &BTreeMap<String, TabularCpd>,
    outcome: &str,
    evidence: &Evidence,
) -> Result<Vec<f64>, EliminationFailure> {
    for (variable, &state) in evidence {
        let cardinality = graph
            .cardinality(variable)
            .ok_or_else(|| EliminationFailure::UnknownVariable(variable.clone()))?;
        if variable == outcome {
            return Err(EliminationFailure::EvidenceOnOutcome(variable.clone()));
        }
        if state >= cardinality {
            return Err(EliminationFailure::StateOutOfRange {
                variable: variable.clone(),
                state,
                cardinality,
            });
        }
    }

    let mut factors: Vec<Factor> = cpds
        .values()
        .map(|cpd| {
            evidence
                .iter()
                .fold(Factor::from_cpd(cpd, graph), |f, (var, &state)| f.reduce(var, state))
        })
        .collect();

    let mut hidden: BTreeSet<String> = graph
        .variables()
        .filter(|v| *v != outcome && !evidence.contains_key(*v))
        .map(str::to_string)
        .collect();

    while !hidden.is_empty() {
        let next = hidden
            .iter()
            .min_by_key(|var| {
                factors
                    .iter()
                    .filter(|f| f.contains(var))
                    .flat_map(|f| f.scope.iter().zip(&f.cards))
                    .collect::<BTreeMap<_, _>>()
                    .values()
                    .map(|&&card| card)
                    .product::<usize>()
            })
            .cloned();
        let Some(var) = next else { break };
        hidden.remove(&var);

        let (touching, rest): (Vec<Factor>, Vec<Factor>) =
            factors.into_iter().partition(|f| f.contains(&var));
        factors = rest;
        let combined = touching.iter().fold(Factor::unit(), |acc, f| acc.product(f));
        factors.push(combined.marginalize(&var));
    }

    let joint = factors.iter().fold(Factor::unit(), |acc, f| acc.product(f));
    let cardinality = graph.cardinality(outcome).unwrap_or(0);
    // Scope is [outcome] whenever the outcome has a CPD; an empty scope
    // spreads the remaining mass evenly.
    let unnormalized: Vec<f64> = if joint.scope.is_empty() {
        vec![joint.values[0]; cardinality]
    } else {
        joint.values
    };

    let total: f64 = unnormalized.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return Err(EliminationFailure::ZeroProbabilityEvidence);
    }
    Ok(unnormalized.into_iter().map(|p| p / total).collect())
}

/// Posterior over the states of the outcome variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeDistribution {
    pub variable: String,
    pub states: Vec<String>,
    pub probabilities: Vec<f64>,
}

impl OutcomeDistribution {
    pub fn probability(&self, state: &str) -> Option<f64> {
        self.states
            .iter()
            .position(|s| s == state)
            .and_then(|i| self.probabilities.get(i).copied())
    }

    pub fn total(&self) -> f64 {
        self.probabilities.iter().sum()
    }

    pub fn most_likely(&self) -> Option<&str> {
        self.states
            .iter()
            .zip(&self.probabilities)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(state, _)| state.as_str())
    }

    pub fn to_map(&self) -> BTreeMap<String, f64> {
        self.states
            .iter()
            .cloned()
            .zip(self.probabilities.iter().copied())
            .collect()
    }
}

/// Map a score in `[0, 1]` onto one of `cardinality` equal-width states.
///
/// Out-of-range scores clamp to the end states; non-finite scores map to 0.
pub fn discretize(score: f64, cardinality: usize) -> usize {
    if cardinality == 0 || !score.is_finite() {
        return 0;
    }
    let clamped = score.clamp(0.0, 1.0);
    ((clamped * cardinality as f64).floor() as usize).min(cardinality - 1)
}
