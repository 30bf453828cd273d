// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Conditional Probability Tables
//!
//! A [`TabularCpd`] stores `P(variable | evidence)` as a dense table:
//! one row per state of `variable`, one column per joint configuration of
//! `evidence`, enumerated with the **last** evidence variable varying fastest.
//!
//! ```text
//! evidence = [a, b]   card(a) = 2, card(b) = 2
//! columns  = (a0,b0) (a0,b1) (a1,b0) (a1,b1)
//! ```
//!
//! Structural validation ([`TabularCpd::validate`]) is per table and runs on
//! every install attempt. Column normalization is part of the model-wide
//! consistency check.

use super::graph::CausalGraph;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Allowed deviation of a CPD column sum from `1.0`.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CpdError {
    #[error("CPD targets undeclared variable '{0}'")]
    UnknownVariable(String),

    #[error("CPD for '{variable}' declares parents {declared:?}, graph has {expected:?}")]
    ParentMismatch {
        variable: String,
        expected: Vec<String>,
        declared: Vec<String>,
    },

    #[error("CPD for '{variable}' lists evidence '{evidence}' more than once")]
    DuplicateEvidence { variable: String, evidence: String },

    #[error(
        "CPD for '{variable}' has shape {rows}x{columns}, expected {expected_rows}x{expected_columns}"
    )]
    ShapeMismatch {
        variable: String,
        expected_rows: usize,
        expected_columns: usize,
        rows: usize,
        columns: usize,
    },

    #[error("CPD for '{variable}' contains invalid probability {value}")]
    InvalidProbability { variable: String, value: f64 },

    #[error("CPD for '{variable}' column {column} sums to {sum}, expected 1.0")]
    ColumnNotNormalized {
        variable: String,
        column: usize,
        sum: f64,
    },

    #[error("No CPD installed for variable '{0}'")]
    MissingCpd(String),

    #[error("Causal graph contains a cycle")]
    Cyclic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabularCpd {
    pub variable: String,

    /// Ordered parents; the last one varies fastest across columns.
    #[serde(default)]
    pub evidence: Vec<String>,

    /// `values[state][column]`
    pub values: Vec<Vec<f64>>,
}

impl TabularCpd {
    pub fn new(variable: impl Into<String>, evidence: Vec<String>, values: Vec<Vec<f64>>) -> Self {
        Self {
            variable: variable.into(),
            evidence,
            values,
        }
    }

    /// Prior table for a root variable: one column.
    pub fn prior(variable: impl Into<String>, probabilities: Vec<f64>) -> Self {
        Self::new(
            variable,
            Vec::new(),
            probabilities.into_iter().map(|p| vec![p]).collect(),
        )
    }

    pub fn rows(&self) -> usize {
        self.values.len()
    }

    pub fn columns(&self) -> usize {
        self.values.first().map(Vec::len).unwrap_or(0)
    }

    /// Check the table against the graph's declared structure.
    pub fn validate(&self, graph: &CausalGraph) -> Result<(), CpdError> {
        let cardinality = graph
            .cardinality(&self.variable)
            .ok_or_else(|| CpdError::UnknownVariable(self.variable.clone()))?;

        let mut declared = BTreeSet::new();
        for parent in &self.evidence {
            if !declared.insert(parent.clone()) {
                return Err(CpdError::DuplicateEvidence {
                    variable: self.variable.clone(),
                    evidence: parent.clone(),
                });
            }
        }

        let expected = graph.parents(&self.variable);
        if declared != expected {
            return Err(CpdError::ParentMismatch {
                variable: self.variable.clone(),
                expected: expected.into_iter().collect(),
                declared: self.evidence.clone(),
            });
        }

        let expected_columns: usize = self
            .evidence
            .iter()
            .map(|parent| graph.cardinality(parent).unwrap_or(0))
            .product();

        let rows = self.rows();
        let ragged = self.values.iter().any(|row| row.len() != expected_columns);
        if rows != cardinality || ragged {
            return Err(CpdError::ShapeMismatch {
                variable: self.variable.clone(),
                expected_rows: cardinality,
                expected_columns,
                rows,
                columns: self.columns(),
            });
        }

        if let Some(&value) = self
            .values
            .iter()
            .flatten()
            .find(|v| !v.is_finite() || **v < 0.0)
        {
            return Err(CpdError::InvalidProbability {
                variable: self.variable.clone(),
                value,
            });
        }

        Ok(())
    }

    /// Every conditioning context must be a probability distribution.
    pub fn check_normalized(&self) -> Result<(), CpdError> {
        for column in 0..self.columns() {
            let sum: f64 = self.values.iter().map(|row| row[column]).sum();
            if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
                return Err(CpdError::ColumnNotNormalized {
                    variable: self.variable.clone(),
                    column,
                    sum,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> CausalGraph {
        let mut graph = CausalGraph::new();
        graph.add_variable("a", ["low", "high"]).unwrap();
        graph.add_variable("b", ["low", "mid", "high"]).unwrap();
        graph.add_variable("out", ["bad", "good"]).unwrap();
        graph.add_edge("a", "out").unwrap();
        graph.add_edge("b", "out").unwrap();
        graph
    }

    fn outcome_cpd() -> TabularCpd {
        TabularCpd::new(
            "out",
            vec!["a".to_string(), "b".to_string()],
            vec![
                vec![0.9, 0.7, 0.5, 0.6, 0.4, 0.1],
                vec![0.1, 0.3, 0.5, 0.4, 0.6, 0.9],
            ],
        )
    }

    #[test]
    fn test_valid_cpd_passes() {
        let cpd = outcome_cpd();
        assert!(cpd.validate(&graph()).is_ok());
        assert!(cpd.check_normalized().is_ok());
        assert!(TabularCpd::prior("a", vec![0.3, 0.7]).validate(&graph()).is_ok());
    }

    #[test]
    fn test_parent_mismatch_rejected() {
        let cpd = TabularCpd::new("out", vec!["a".to_string()], vec![vec![0.5, 0.5], vec![0.5, 0.5]]);
        assert!(matches!(cpd.validate(&graph()), Err(CpdError::ParentMismatch { .. })));

        let prior_on_child = TabularCpd::prior("out", vec![0.5, 0.5]);
        assert!(matches!(
            prior_on_child.validate(&graph()),
            Err(CpdError::ParentMismatch { .. })
        ));
    }

    #[test]
    fn test_parent_order_is_free() {
        let cpd = TabularCpd::new(
            "out",
            vec!["b".to_string(), "a".to_string()],
            vec![vec![0.5; 6], vec![0.5; 6]],
        );
        assert!(cpd.validate(&graph()).is_ok());
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let mut cpd = outcome_cpd();
        cpd.values[1].pop();
        assert!(matches!(cpd.validate(&graph()), Err(CpdError::ShapeMismatch { .. })));

        let wrong_rows = TabularCpd::prior("b", vec![0.5, 0.5]);
        assert!(matches!(wrong_rows.validate(&graph()), Err(CpdError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_unknown_variable_and_bad_values() {
        let ghost = TabularCpd::prior("ghost", vec![1.0]);
        assert_eq!(
            ghost.validate(&graph()),
            Err(CpdError::UnknownVariable("ghost".to_string()))
        );

        let negative = TabularCpd::prior("a", vec![-0.1, 1.1]);
        assert!(matches!(
            negative.validate(&graph()),
            Err(CpdError::InvalidProbability { .. })
        ));
    }

    #[test]
    fn test_unnormalized_column_detected() {
        let cpd = TabularCpd::prior("a", vec![0.3, 0.3]);
        assert!(cpd.validate(&graph()).is_ok());
        assert!(matches!(
            cpd.check_normalized(),
            Err(CpdError::ColumnNotNormalized { column: 0, .. })
        ));
    }

    #[test]
    fn test_deserializes_without_evidence() {
        let cpd: TabularCpd =
            serde_json::from_str(r#"{"variable": "a", "values": [[0.4], [0.6]]}"#).unwrap();
        assert!(cpd.evidence.is_empty());
        assert_eq!(cpd.rows(), 2);
        assert_eq!(cpd.columns(), 1);
    }
}
