// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Directed acyclic graph of discrete causal variables.

use petgraph::algo::{has_path_connecting, is_cyclic_directed, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GraphError {
    #[error("Variable '{0}' is already declared")]
    DuplicateVariable(String),

    #[error("Variable '{0}' must declare at least one state")]
    NoStates(String),

    #[error("Variable '{0}' is not declared")]
    UnknownVariable(String),

    #[error("Edge {parent} -> {child} would create a cycle")]
    Cycle { parent: String, child: String },
}

/// Variables with named, ordered states connected by parent → child edges.
///
/// Edges that would close a cycle are rejected at insertion, so a built
/// graph is always a DAG.
#[derive(Debug, Clone, Default)]
pub struct CausalGraph {
    graph: DiGraph<String, ()>,
    node_map: BTreeMap<String, NodeIndex>,
    states: BTreeMap<String, Vec<String>>,
}

impl CausalGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_variable<S>(&mut self, name: impl Into<String>, states: S) -> Result<(), GraphError>
    where
        S: IntoIterator,
        S::Item: Into<String>,
    {
        let name = name.into();
        if self.node_map.contains_key(&name) {
            return Err(GraphError::DuplicateVariable(name));
        }
        let states: Vec<String> = states.into_iter().map(Into::into).collect();
        if states.is_empty() {
            return Err(GraphError::NoStates(name));
        }

        let idx = self.graph.add_node(name.clone());
        self.node_map.insert(name.clone(), idx);
        self.states.insert(name, states);
        Ok(())
    }

    pub fn add_edge(&mut self, parent: &str, child: &str) -> Result<(), GraphError> {
        let parent_idx = self.index(parent)?;
        let child_idx = self.index(child)?;

        if parent_idx == child_idx || has_path_connecting(&self.graph, child_idx, parent_idx, None) {
            return Err(GraphError::Cycle {
                parent: parent.to_string(),
                child: child.to_string(),
            });
        }

        if self.graph.find_edge(parent_idx, child_idx).is_none() {
            self.graph.add_edge(parent_idx, child_idx, ());
        }
        Ok(())
    }

    fn index(&self, name: &str) -> Result<NodeIndex, GraphError> {
        self.node_map
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::UnknownVariable(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.node_map.contains_key(name)
    }

    /// Declared variable names, sorted.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.node_map.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.node_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_map.is_empty()
    }

    pub fn states(&self, name: &str) -> Option<&[String]> {
        self.states.get(name).map(Vec::as_slice)
    }

    pub fn cardinality(&self, name: &str) -> Option<usize> {
        self.states.get(name).map(Vec::len)
    }

    pub fn state_index(&self, name: &str, state: &str) -> Option<usize> {
        self.states.get(name)?.iter().position(|s| s == state)
    }

    /// Parent set of `name` (empty for roots and unknown variables).
    pub fn parents(&self, name: &str) -> BTreeSet<String> {
        match self.node_map.get(name) {
            Some(&idx) => self
                .graph
                .neighbors_directed(idx, Direction::Incoming)
                .map(|p| self.graph[p].clone())
                .collect(),
            None => BTreeSet::new(),
        }
    }

    pub fn is_acyclic(&self) -> bool {
        !is_cyclic_directed(&self.graph)
    }

    /// Variables in an order where every parent precedes its children.
    pub fn topological_order(&self) -> Vec<String> {
        match toposort(&self.graph, None) {
            Ok(order) => order.into_iter().map(|idx| self.graph[idx].clone()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary(graph: &mut CausalGraph, name: &str) {
        graph.add_variable(name, ["low", "high"]).unwrap();
    }

    #[test]
    fn test_edges_record_parents() {
        let mut graph = CausalGraph::new();
        binary(&mut graph, "a");
        binary(&mut graph, "b");
        binary(&mut graph, "outcome");
        graph.add_edge("a", "outcome").unwrap();
        graph.add_edge("b", "outcome").unwrap();

        let parents: Vec<_> = graph.parents("outcome").into_iter().collect();
        assert_eq!(parents, vec!["a", "b"]);
        assert!(graph.parents("a").is_empty());
        assert_eq!(graph.topological_order().last().map(String::as_str), Some("outcome"));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut graph = CausalGraph::new();
        binary(&mut graph, "a");
        binary(&mut graph, "b");
        binary(&mut graph, "c");
        graph.add_edge("a", "b").unwrap();
        graph.add_edge("b", "c").unwrap();

        assert!(matches!(graph.add_edge("c", "a"), Err(GraphError::Cycle { .. })));
        assert!(matches!(graph.add_edge("a", "a"), Err(GraphError::Cycle { .. })));
        assert!(graph.is_acyclic());
    }

    #[test]
    fn test_unknown_and_duplicate_variables() {
        let mut graph = CausalGraph::new();
        binary(&mut graph, "a");
        assert_eq!(
            graph.add_variable("a", ["x"]),
            Err(GraphError::DuplicateVariable("a".to_string()))
        );
        assert_eq!(
            graph.add_variable("empty", Vec::<String>::new()),
            Err(GraphError::NoStates("empty".to_string()))
        );
        assert!(matches!(graph.add_edge("a", "ghost"), Err(GraphError::UnknownVariable(_))));
    }

    #[test]
    fn test_state_lookup() {
        let mut graph = CausalGraph::new();
        graph.add_variable("risk", ["low", "medium", "high"]).unwrap();
        assert_eq!(graph.cardinality("risk"), Some(3));
        assert_eq!(graph.state_index("risk", "high"), Some(2));
        assert_eq!(graph.state_index("risk", "extreme"), None);
    }
}
