// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Offline CPD fitting from decision history.
//!
//! Maximum-likelihood estimates with additive (Laplace) smoothing. Evaluator
//! variables take the discretized score recorded for that evaluator; the
//! outcome variable takes the discretized composite score. A record that
//! lacks a value for any variable of a CPD does not count toward that CPD.
//! The result is meant to be passed to
//! [`CausalModelService::update_causal_model`](super::causal_model::CausalModelService::update_causal_model);
//! the online pipeline never refits.

use crate::domain::causal::{discretize, CausalGraph, TabularCpd};
use crate::domain::history::DecisionRecord;

fn observed_state(
    graph: &CausalGraph,
    outcome: &str,
    record: &DecisionRecord,
    variable: &str,
) -> Option<usize> {
    let cardinality = graph.cardinality(variable)?;
    let score = if variable == outcome {
        record.composite_score
    } else {
        record.score_of(variable)?
    };
    Some(discretize(score, cardinality))
}

/// Fit one CPD per graph variable. Parent order follows the graph's sorted
/// parent set.
pub fn fit_cpds(
    graph: &CausalGraph,
    outcome: &str,
    records: &[DecisionRecord],
    pseudo_count: f64,
) -> Vec<TabularCpd> {
    let pseudo_count = if pseudo_count.is_finite() && pseudo_count >= 0.0 {
        pseudo_count
    } else {
        tracing::warn!(pseudo_count, "Invalid pseudo count; fitting without smoothing");
        0.0
    };

    let mut cpds = Vec::with_capacity(graph.len());
    for variable in graph.topological_order() {
        let rows = graph.cardinality(&variable).unwrap_or(0);
        let evidence: Vec<String> = graph.parents(&variable).into_iter().collect();
        let cards: Vec<usize> = evidence
            .iter()
            .map(|p| graph.cardinality(p).unwrap_or(0))
            .collect();
        let columns: usize = cards.iter().product();

        let mut counts = vec![vec![pseudo_count; columns]; rows];
        let mut used = 0usize;
        'records: for record in records {
            let Some(state) = observed_state(graph, outcome, record, &variable) else {
                continue;
            };
            let mut column = 0;
            for (parent, card) in evidence.iter().zip(&cards) {
                let Some(parent_state) = observed_state(graph, outcome, record, parent) else {
                    continue 'records;
                };
                column = column * card + parent_state;
            }
            counts[state][column] += 1.0;
            used += 1;
        }

        for column in 0..columns {
            let total: f64 = counts.iter().map(|row| row[column]).sum();
            for row in counts.iter_mut() {
                row[column] = if total > 0.0 {
                    row[column] / total
                } else {
                    1.0 / rows as f64
                };
            }
        }

        tracing::debug!(variable = %variable, records = used, "CPD fitted");
        cpds.push(TabularCpd::new(variable, evidence, counts));
    }

    cpds
}
